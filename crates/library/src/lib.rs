mod audio;
mod discovery;
mod engine;
mod export;
mod progress;
mod scheduler;

use std::path::PathBuf;

pub use audio::{AudioSource, FileAudioSource};
pub use discovery::{album_dir, discover, track_files};
pub use engine::{consolidate, ConsolidateError, GAP_DURATION_MS};
pub use export::{export, output_path, ExportError, ExportResult};
pub use progress::{
    extract_sentences, AlbumDetails, AlbumEnricher, BatchEvent, LogSink, NoEnrichment, ProgressSink,
};
pub use scheduler::{
    BatchError, BatchOptions, BatchScheduler, BatchSnapshot, InFlight, PendingEntry, RunState,
};
pub use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub enum LibraryError {
    InvalidDirectory(PathBuf),
    Io(std::io::Error),
}

impl std::fmt::Display for LibraryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LibraryError::InvalidDirectory(path) => {
                write!(f, "invalid directory: {}", path.display())
            }
            LibraryError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for LibraryError {}

impl From<std::io::Error> for LibraryError {
    fn from(err: std::io::Error) -> Self {
        LibraryError::Io(err)
    }
}
