use std::env;
use std::path::PathBuf;

use library::{album_dir, discover, track_files};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let input_root = env::args()
        .nth(1)
        .or_else(|| env::var("INPUT_ROOT").ok())
        .map(PathBuf::from)
        .ok_or("INPUT_ROOT not set and no path argument")?;

    let units = discover(&input_root)?;
    for unit in &units {
        let tracks = album_dir(&input_root, unit)
            .map(|dir| track_files(&dir).len())
            .unwrap_or(0);
        println!("{}\t{}\t{} files", unit.artist, unit.album, tracks);
    }
    println!("{} albums", units.len());
    Ok(())
}
