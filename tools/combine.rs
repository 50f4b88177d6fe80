use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use common::{Bitrate, NamingMode};
use library::{BatchOptions, BatchScheduler, LogSink};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: combine <input_root> <output_root> [bitrate] [flat|artist_folder] [--no-gap]";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut gap = true;
    let mut positional = Vec::new();
    for arg in env::args().skip(1) {
        if arg == "--no-gap" {
            gap = false;
        } else {
            positional.push(arg);
        }
    }
    let mut args = positional.into_iter();
    let input_root = args.next().map(PathBuf::from).ok_or(USAGE)?;
    let output_root = args.next().map(PathBuf::from).ok_or(USAGE)?;
    let bitrate = match args.next() {
        Some(value) => value.parse::<Bitrate>()?,
        None => Bitrate::default(),
    };
    let naming = match args.next() {
        Some(value) => value.parse::<NamingMode>()?,
        None => NamingMode::default(),
    };

    std::fs::create_dir_all(&output_root)?;
    let scheduler = BatchScheduler::new(Arc::new(LogSink)).with_default_gap(gap);
    scheduler.load_albums(&input_root)?;
    scheduler.start(BatchOptions {
        output_root,
        bitrate,
        naming,
    })?;
    scheduler.join();

    let completed = scheduler.snapshot().completed;
    let mut failed = 0;
    for record in &completed {
        if record.success {
            println!(
                "ok\t{} - {}\t{}\t{:.1} MB",
                record.artist,
                record.album,
                record.duration_label,
                record.size_mb.unwrap_or_default()
            );
        } else {
            failed += 1;
            println!("failed\t{} - {}", record.artist, record.album);
        }
    }
    if failed > 0 {
        return Err(format!("{} of {} albums failed", failed, completed.len()).into());
    }
    Ok(())
}
