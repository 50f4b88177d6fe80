use std::path::PathBuf;

use codecs::AudioBuffer;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::audio::AudioSource;

/// Silence appended after every loaded track when the album's gap flag is set.
pub const GAP_DURATION_MS: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsolidateError {
    NoPlayableTracks,
    Cancelled,
}

impl std::fmt::Display for ConsolidateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsolidateError::NoPlayableTracks => write!(f, "no playable tracks"),
            ConsolidateError::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::error::Error for ConsolidateError {}

/// Concatenates an album's tracks in file-name order.
///
/// `cancel` is checked before each track; a cancelled run returns
/// `Cancelled` and the partial buffer is dropped. `progress` receives
/// `(index, total)` after every track whether or not it decoded. The gap
/// follows every loaded track, the last one included.
///
/// Tracks that pass validation but fail to decode are skipped. If none of
/// them decodes the result is `NoPlayableTracks`, so an album is never
/// exported as an empty or gap-only file.
pub fn consolidate(
    source: &dyn AudioSource,
    files: &[PathBuf],
    gap_enabled: bool,
    cancel: &CancellationToken,
    progress: &mut dyn FnMut(usize, usize),
) -> Result<AudioBuffer, ConsolidateError> {
    let mut playable: Vec<&PathBuf> = files
        .iter()
        .filter(|path| path.is_file() && source.is_valid_audio(path))
        .collect();
    if playable.is_empty() {
        return Err(ConsolidateError::NoPlayableTracks);
    }
    playable.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let total = playable.len();
    let mut combined = AudioBuffer::new();
    let mut loaded = 0usize;

    for (index, path) in playable.into_iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(ConsolidateError::Cancelled);
        }
        match source.load_audio(path) {
            Some(audio) => {
                combined.append(&audio);
                if gap_enabled {
                    combined.append_silence(GAP_DURATION_MS);
                }
                loaded += 1;
            }
            None => debug!("Track skipped: {}", path.display()),
        }
        progress(index + 1, total);
    }

    if loaded == 0 {
        return Err(ConsolidateError::NoPlayableTracks);
    }
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;
    use std::path::{Path, PathBuf};

    use codecs::AudioBuffer;
    use parking_lot::Mutex;
    use tokio_util::sync::CancellationToken;

    use super::{consolidate, ConsolidateError};
    use crate::audio::{AudioSource, FileAudioSource};

    /// Track lengths keyed by file name; names missing from the map fail to load.
    struct FixedSource {
        lengths: HashMap<String, u32>,
        loaded: Mutex<Vec<String>>,
    }

    impl FixedSource {
        fn new(lengths: &[(&str, u32)]) -> Self {
            Self {
                lengths: lengths
                    .iter()
                    .map(|(name, ms)| (name.to_string(), *ms))
                    .collect(),
                loaded: Mutex::new(Vec::new()),
            }
        }
    }

    impl AudioSource for FixedSource {
        fn is_valid_audio(&self, path: &Path) -> bool {
            path.extension().map(|ext| ext == "fake").unwrap_or(false)
        }

        fn load_audio(&self, path: &Path) -> Option<AudioBuffer> {
            let name = path.file_name()?.to_string_lossy().to_string();
            self.loaded.lock().push(name.clone());
            self.lengths.get(&name).map(|ms| AudioBuffer::silent(*ms))
        }
    }

    fn touch(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
        names
            .iter()
            .map(|name| {
                let path = dir.join(name);
                fs::write(&path, b"").unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn gap_follows_every_track() {
        let dir = tempfile::tempdir().unwrap();
        let files = touch(dir.path(), &["01.fake", "02.fake"]);
        let source = FixedSource::new(&[("01.fake", 180_000), ("02.fake", 180_000)]);

        let buffer = consolidate(
            &source,
            &files,
            true,
            &CancellationToken::new(),
            &mut |_, _| {},
        )
        .unwrap();
        assert_eq!(buffer.duration_ms(), 362_000);
        assert_eq!(common::duration_label(buffer.duration_ms()), "6:02");
    }

    #[test]
    fn no_gap_is_plain_sum() {
        let dir = tempfile::tempdir().unwrap();
        let files = touch(dir.path(), &["01.fake", "02.fake", "03.fake"]);
        let source =
            FixedSource::new(&[("01.fake", 1000), ("02.fake", 2000), ("03.fake", 500)]);

        let buffer =
            consolidate(&source, &files, false, &CancellationToken::new(), &mut |_, _| {})
                .unwrap();
        assert_eq!(buffer.duration_ms(), 3500);
    }

    #[test]
    fn order_is_by_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let files = touch(dir.path(), &["b.fake", "10.fake", "a.fake", "02.fake"]);
        let source = FixedSource::new(&[]);

        let _ = consolidate(&source, &files, false, &CancellationToken::new(), &mut |_, _| {});
        assert_eq!(
            *source.loaded.lock(),
            vec!["02.fake", "10.fake", "a.fake", "b.fake"]
        );
    }

    #[test]
    fn invalid_and_missing_files_are_filtered() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = touch(dir.path(), &["01.fake", "cover.jpg"]);
        files.push(dir.path().join("ghost.fake"));
        fs::create_dir(dir.path().join("dir.fake")).unwrap();
        files.push(dir.path().join("dir.fake"));
        let source = FixedSource::new(&[("01.fake", 1000)]);

        let mut seen = Vec::new();
        let buffer = consolidate(
            &source,
            &files,
            false,
            &CancellationToken::new(),
            &mut |index, total| seen.push((index, total)),
        )
        .unwrap();
        assert_eq!(buffer.duration_ms(), 1000);
        assert_eq!(seen, vec![(1, 1)]);
    }

    #[test]
    fn no_valid_files_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let files = touch(dir.path(), &["notes.txt", "cover.jpg"]);
        let source = FixedSource::new(&[]);

        let result = consolidate(&source, &files, true, &CancellationToken::new(), &mut |_, _| {});
        assert_eq!(result.unwrap_err(), ConsolidateError::NoPlayableTracks);
    }

    #[test]
    fn undecodable_tracks_are_skipped_but_counted() {
        let dir = tempfile::tempdir().unwrap();
        let files = touch(dir.path(), &["01.fake", "02.fake", "03.fake"]);
        let source = FixedSource::new(&[("01.fake", 1000), ("03.fake", 1000)]);

        let mut seen = Vec::new();
        let buffer = consolidate(
            &source,
            &files,
            true,
            &CancellationToken::new(),
            &mut |index, total| seen.push((index, total)),
        )
        .unwrap();
        assert_eq!(buffer.duration_ms(), 4000);
        assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn all_tracks_failing_is_no_playable_tracks() {
        let dir = tempfile::tempdir().unwrap();
        let files = touch(dir.path(), &["01.fake"]);
        let source = FixedSource::new(&[]);

        let result = consolidate(&source, &files, true, &CancellationToken::new(), &mut |_, _| {});
        assert_eq!(result.unwrap_err(), ConsolidateError::NoPlayableTracks);
    }

    #[test]
    fn cancel_is_seen_at_next_track() {
        let dir = tempfile::tempdir().unwrap();
        let files = touch(dir.path(), &["01.fake", "02.fake", "03.fake"]);
        let source =
            FixedSource::new(&[("01.fake", 1000), ("02.fake", 1000), ("03.fake", 1000)]);
        let cancel = CancellationToken::new();

        let result = consolidate(&source, &files, false, &cancel, &mut |index, _| {
            if index == 1 {
                cancel.cancel();
            }
        });
        assert_eq!(result.unwrap_err(), ConsolidateError::Cancelled);
        assert_eq!(*source.loaded.lock(), vec!["01.fake"]);
    }

    #[test]
    fn cancel_after_last_track_does_not_abort() {
        let dir = tempfile::tempdir().unwrap();
        let files = touch(dir.path(), &["01.fake", "02.fake"]);
        let source = FixedSource::new(&[("01.fake", 1000), ("02.fake", 1000)]);
        let cancel = CancellationToken::new();

        let result = consolidate(&source, &files, false, &cancel, &mut |index, total| {
            if index == total {
                cancel.cancel();
            }
        });
        assert_eq!(result.unwrap().duration_ms(), 2000);
    }

    #[test]
    fn decodes_real_wav_tracks() {
        let dir = tempfile::tempdir().unwrap();
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut files = Vec::new();
        for name in ["01.wav", "02.wav"] {
            let path = dir.path().join(name);
            let mut writer = hound::WavWriter::create(&path, spec).unwrap();
            for _ in 0..44_100 * 2 {
                writer.write_sample(0i16).unwrap();
            }
            writer.finalize().unwrap();
            files.push(path);
        }

        let buffer = consolidate(
            &FileAudioSource,
            &files,
            true,
            &CancellationToken::new(),
            &mut |_, _| {},
        )
        .unwrap();
        assert_eq!(buffer.duration_ms(), 4000);
    }
}
