use std::path::Path;

use codecs::AudioBuffer;
use tracing::{debug, warn};

/// Validation and decoding used by the consolidation loop.
pub trait AudioSource: Send + Sync {
    /// Cheap header check; must never fail, only answer. A file that
    /// passes is one `load_audio` can attempt to decode.
    fn is_valid_audio(&self, path: &Path) -> bool;

    /// Decodes a whole track, or `None` when it cannot be read.
    fn load_audio(&self, path: &Path) -> Option<AudioBuffer>;
}

/// Reads tracks from disk. A track is valid when lofty reads its duration
/// and symphonia has a decoder for its default track.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileAudioSource;

impl AudioSource for FileAudioSource {
    fn is_valid_audio(&self, path: &Path) -> bool {
        metadata::is_valid_audio(path) && codecs::can_decode(path)
    }

    fn load_audio(&self, path: &Path) -> Option<AudioBuffer> {
        if !self.is_valid_audio(path) {
            debug!("Not a playable audio file: {}", path.display());
            return None;
        }
        match codecs::decode_file(path) {
            Ok(buffer) => Some(buffer),
            Err(err) => {
                warn!("Skipping {}: {}", path.display(), err);
                None
            }
        }
    }
}
