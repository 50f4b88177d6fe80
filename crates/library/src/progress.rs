use std::collections::HashSet;

use common::{AlbumUnit, CompletedRecord};
use serde::Serialize;
use tracing::{debug, info};

/// Cover art and trivia shown alongside the album being processed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlbumDetails {
    #[serde(skip)]
    pub image: Option<Vec<u8>>,
    pub sentences: Vec<String>,
}

impl AlbumDetails {
    pub fn is_empty(&self) -> bool {
        self.image.is_none() && self.sentences.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BatchEvent {
    AlbumStarted(AlbumUnit),
    TrackProgress { index: usize, total: usize },
    AlbumFinished(CompletedRecord),
    AlbumDetails { unit: AlbumUnit, details: AlbumDetails },
    BatchIdle,
}

/// Receives batch events from the worker thread. Implementations must not
/// block for long; the worker waits on every call.
pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: BatchEvent);
}

/// Sink that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ProgressSink for LogSink {
    fn on_event(&self, event: BatchEvent) {
        match event {
            BatchEvent::AlbumStarted(unit) => info!("Processing {}", unit),
            BatchEvent::TrackProgress { index, total } => debug!("Track {}/{}", index, total),
            BatchEvent::AlbumFinished(record) if record.success => info!(
                "Finished {} - {} ({})",
                record.artist, record.album, record.duration_label
            ),
            BatchEvent::AlbumFinished(record) => {
                info!("Failed {} - {}", record.artist, record.album)
            }
            BatchEvent::AlbumDetails { unit, details } => debug!(
                "Details for {}: {} facts, art={}",
                unit,
                details.sentences.len(),
                details.image.is_some()
            ),
            BatchEvent::BatchIdle => info!("Batch idle"),
        }
    }
}

/// Looks up decorative details for an album. Called off the worker thread;
/// a slow or failing lookup never holds up consolidation.
pub trait AlbumEnricher: Send + Sync {
    fn fetch_art_and_facts(&self, artist: &str, album: &str) -> AlbumDetails;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoEnrichment;

impl AlbumEnricher for NoEnrichment {
    fn fetch_art_and_facts(&self, _artist: &str, _album: &str) -> AlbumDetails {
        AlbumDetails::default()
    }
}

/// Splits an article extract into fact sentences: pieces longer than 30
/// characters, each re-terminated with '.', first occurrence kept.
pub fn extract_sentences(text: &str) -> Vec<String> {
    let flattened = text.replace('\n', " ");
    let mut seen = HashSet::new();
    flattened
        .split('.')
        .map(str::trim)
        .filter(|piece| piece.chars().count() > 30)
        .map(|piece| format!("{}.", piece))
        .filter(|sentence| seen.insert(sentence.clone()))
        .collect()
}
