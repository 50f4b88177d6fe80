use std::path::Path;

use lofty::config::WriteOptions;
use lofty::error::LoftyError;
use lofty::prelude::{Accessor, AudioFile, ItemKey, TagExt, TaggedFileExt};
use lofty::tag::{Tag, TagType};

#[derive(Debug, Default, Clone)]
pub struct TagInfo {
    pub artist: Option<String>,
    pub album: Option<String>,
    pub title: Option<String>,
    pub duration_ms: Option<u32>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,
}

/// Fields written back to a consolidated album file.
#[derive(Debug, Clone)]
pub struct AlbumTags<'a> {
    pub artist: &'a str,
    pub album: &'a str,
    pub title: &'a str,
}

#[derive(Debug)]
pub enum MetadataError {
    Io(std::io::Error),
    Lofty(LoftyError),
}

impl std::fmt::Display for MetadataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataError::Io(err) => write!(f, "io error: {}", err),
            MetadataError::Lofty(err) => write!(f, "tag error: {}", err),
        }
    }
}

impl std::error::Error for MetadataError {}

impl From<std::io::Error> for MetadataError {
    fn from(err: std::io::Error) -> Self {
        MetadataError::Io(err)
    }
}

impl From<LoftyError> for MetadataError {
    fn from(err: LoftyError) -> Self {
        MetadataError::Lofty(err)
    }
}

/// Reads the container's stream properties and returns the reported duration.
/// Only headers are parsed; no audio is decoded.
pub fn probe_duration(path: &Path) -> Result<Option<u32>, MetadataError> {
    let tagged_file = lofty::read_from_path(path)?;
    let duration_ms = tagged_file.properties().duration().as_millis();
    if duration_ms == 0 {
        return Ok(None);
    }
    Ok(Some(duration_ms.min(u128::from(u32::MAX)) as u32))
}

/// True when the file is a readable audio container that reports a duration.
/// Never fails; any probing error counts as "not audio".
pub fn is_valid_audio(path: &Path) -> bool {
    matches!(probe_duration(path), Ok(Some(_)))
}

pub fn read_tags(path: &Path) -> Result<TagInfo, MetadataError> {
    let tagged_file = lofty::read_from_path(path)?;
    let properties = tagged_file.properties();

    let mut info = TagInfo::default();

    let duration_ms = properties.duration().as_millis();
    if duration_ms > 0 {
        info.duration_ms = Some(duration_ms.min(u128::from(u32::MAX)) as u32);
    }
    info.sample_rate = properties.sample_rate();
    info.channels = properties.channels();

    let tag = tagged_file
        .tag(TagType::Id3v2)
        .or_else(|| tagged_file.primary_tag())
        .or_else(|| tagged_file.first_tag());
    if let Some(tag) = tag {
        info.title = tag.get_string(&ItemKey::TrackTitle).map(|v| v.to_string());
        info.album = tag.get_string(&ItemKey::AlbumTitle).map(|v| v.to_string());
        let album_artist = tag.get_string(&ItemKey::AlbumArtist).map(|v| v.to_string());
        info.artist = tag
            .get_string(&ItemKey::TrackArtist)
            .map(|v| v.to_string())
            .or(album_artist);
    }

    Ok(info)
}

/// Writes artist/album/title as an ID3v2 tag, replacing any ID3v2 tag already present.
pub fn write_album_tags(path: &Path, tags: &AlbumTags<'_>) -> Result<(), MetadataError> {
    let mut tag = Tag::new(TagType::Id3v2);
    tag.set_artist(tags.artist.to_string());
    tag.set_album(tags.album.to_string());
    tag.set_title(tags.title.to_string());
    tag.save_to_path(path, WriteOptions::default())?;
    Ok(())
}
