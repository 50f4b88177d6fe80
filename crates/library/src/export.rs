use std::fs;
use std::path::{Path, PathBuf};

use codecs::{AudioBuffer, CodecError};
use common::{Bitrate, NamingMode};
use metadata::{AlbumTags, MetadataError};
use tracing::{info, warn};

#[derive(Debug)]
pub enum ExportError {
    Io(std::io::Error),
    Encode(CodecError),
    Tags(MetadataError),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Io(err) => write!(f, "io error: {}", err),
            ExportError::Encode(err) => write!(f, "encode failed: {}", err),
            ExportError::Tags(err) => write!(f, "tagging failed: {}", err),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::Io(err)
    }
}

impl From<CodecError> for ExportError {
    fn from(err: CodecError) -> Self {
        ExportError::Encode(err)
    }
}

#[derive(Debug, Clone)]
pub struct ExportResult {
    pub path: PathBuf,
    pub duration_label: String,
    pub size_mb: f64,
}

pub fn output_path(root: &Path, artist: &str, album: &str, naming: NamingMode) -> PathBuf {
    match naming {
        NamingMode::Flat => root.join(format!("{} - {}.mp3", artist, album)),
        NamingMode::ArtistFolder => root.join(artist).join(format!("{}.mp3", album)),
    }
}

/// Encodes `buffer` as MP3 at `bitrate`, tags it and places it under
/// `output_root`. An existing file at the target is replaced.
///
/// Bytes are written to a hidden sibling first and renamed once tagged, so a
/// failed export never leaves a partial file at the final path.
pub fn export(
    buffer: &AudioBuffer,
    artist: &str,
    album: &str,
    bitrate: Bitrate,
    naming: NamingMode,
    output_root: &Path,
) -> Result<ExportResult, ExportError> {
    let target = output_path(output_root, artist, album, naming);
    let parent = target.parent().unwrap_or(output_root);
    fs::create_dir_all(parent)?;

    let bytes = codecs::encode_mp3(buffer, bitrate.kbps())?;

    let stem = target
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| album.to_string());
    let partial = parent.join(format!(".{}.partial.mp3", stem));
    fs::write(&partial, &bytes)?;

    let title = format!("{} (Full Album)", album);
    let tags = AlbumTags {
        artist,
        album,
        title: &title,
    };
    if let Err(err) = metadata::write_album_tags(&partial, &tags) {
        discard(&partial);
        return Err(ExportError::Tags(err));
    }
    if let Err(err) = fs::rename(&partial, &target) {
        discard(&partial);
        return Err(ExportError::Io(err));
    }

    let size_mb = common::size_mb(fs::metadata(&target)?.len());
    let duration_label = common::duration_label(buffer.duration_ms());
    info!(
        "Exported {} ({}, {:.1} MB, {})",
        target.display(),
        duration_label,
        size_mb,
        bitrate
    );
    Ok(ExportResult {
        path: target,
        duration_label,
        size_mb,
    })
}

fn discard(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        warn!("Failed to remove {}: {}", path.display(), err);
    }
}
