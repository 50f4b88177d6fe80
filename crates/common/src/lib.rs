use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// One (artist, album) pair. Pending work, gap preferences and completed
/// records are all keyed by this value.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AlbumUnit {
    pub artist: String,
    pub album: String,
}

impl AlbumUnit {
    pub fn new(artist: impl Into<String>, album: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            album: album.into(),
        }
    }
}

impl fmt::Display for AlbumUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.artist, self.album)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompletedRecord {
    pub artist: String,
    pub album: String,
    pub success: bool,
    /// `M:SS`, empty for failed attempts.
    pub duration_label: String,
    pub size_mb: Option<f64>,
}

impl CompletedRecord {
    pub fn failed(unit: &AlbumUnit) -> Self {
        Self {
            artist: unit.artist.clone(),
            album: unit.album.clone(),
            success: false,
            duration_label: String::new(),
            size_mb: None,
        }
    }

    pub fn succeeded(unit: &AlbumUnit, duration_label: String, size_mb: f64) -> Self {
        Self {
            artist: unit.artist.clone(),
            album: unit.album.clone(),
            success: true,
            duration_label,
            size_mb: Some(size_mb),
        }
    }

    pub fn unit(&self) -> AlbumUnit {
        AlbumUnit::new(self.artist.clone(), self.album.clone())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bitrate {
    #[serde(rename = "128k")]
    Kbps128,
    #[serde(rename = "192k")]
    Kbps192,
    #[serde(rename = "256k")]
    Kbps256,
    #[default]
    #[serde(rename = "320k")]
    Kbps320,
}

impl Bitrate {
    pub const ALL: [Bitrate; 4] = [
        Bitrate::Kbps128,
        Bitrate::Kbps192,
        Bitrate::Kbps256,
        Bitrate::Kbps320,
    ];

    pub fn kbps(self) -> u32 {
        match self {
            Bitrate::Kbps128 => 128,
            Bitrate::Kbps192 => 192,
            Bitrate::Kbps256 => 256,
            Bitrate::Kbps320 => 320,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Bitrate::Kbps128 => "128k",
            Bitrate::Kbps192 => "192k",
            Bitrate::Kbps256 => "256k",
            Bitrate::Kbps320 => "320k",
        }
    }
}

impl fmt::Display for Bitrate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Bitrate {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim().to_ascii_lowercase();
        let digits = trimmed.trim_end_matches('k');
        Bitrate::ALL
            .into_iter()
            .find(|bitrate| bitrate.kbps().to_string() == digits)
            .ok_or_else(|| format!("unsupported bitrate: {}", value))
    }
}

/// Where an album's output file lands under the output root.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingMode {
    /// `output/Artist - Album.mp3`
    #[default]
    Flat,
    /// `output/Artist/Album.mp3`
    ArtistFolder,
}

impl FromStr for NamingMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "flat" => Ok(NamingMode::Flat),
            "artist_folder" | "artist-folder" | "artist" => Ok(NamingMode::ArtistFolder),
            _ => Err(format!("unsupported naming mode: {}", value)),
        }
    }
}

/// Formats a length in milliseconds as `M:SS`; minutes are not wrapped into hours.
pub fn duration_label(duration_ms: u64) -> String {
    let minutes = duration_ms / 60_000;
    let seconds = (duration_ms % 60_000) / 1000;
    format!("{}:{:02}", minutes, seconds)
}

pub fn size_mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

#[cfg(test)]
mod tests {
    use super::{duration_label, size_mb, AlbumUnit, Bitrate, CompletedRecord, NamingMode};

    #[test]
    fn duration_label_pads_seconds() {
        assert_eq!(duration_label(0), "0:00");
        assert_eq!(duration_label(61_999), "1:01");
        assert_eq!(duration_label(362_000), "6:02");
        assert_eq!(duration_label(3_725_000), "62:05");
    }

    #[test]
    fn size_is_reported_in_mebibytes() {
        assert_eq!(size_mb(1024 * 1024), 1.0);
        assert_eq!(size_mb(0), 0.0);
    }

    #[test]
    fn bitrate_parses_with_or_without_suffix() {
        assert_eq!("192k".parse::<Bitrate>().unwrap(), Bitrate::Kbps192);
        assert_eq!("320".parse::<Bitrate>().unwrap(), Bitrate::Kbps320);
        assert!("160k".parse::<Bitrate>().is_err());
        assert_eq!(Bitrate::default(), Bitrate::Kbps320);
    }

    #[test]
    fn bitrate_serializes_as_label() {
        let json = serde_json::to_string(&Bitrate::Kbps256).unwrap();
        assert_eq!(json, "\"256k\"");
        let back: Bitrate = serde_json::from_str("\"128k\"").unwrap();
        assert_eq!(back, Bitrate::Kbps128);
    }

    #[test]
    fn naming_mode_accepts_aliases() {
        assert_eq!("flat".parse::<NamingMode>().unwrap(), NamingMode::Flat);
        assert_eq!(
            "artist-folder".parse::<NamingMode>().unwrap(),
            NamingMode::ArtistFolder
        );
        assert!("nested".parse::<NamingMode>().is_err());
    }

    #[test]
    fn failed_record_has_no_size() {
        let unit = AlbumUnit::new("Beatles", "AbbeyRoad");
        let record = CompletedRecord::failed(&unit);
        assert!(!record.success);
        assert!(record.duration_label.is_empty());
        assert_eq!(record.size_mb, None);
        assert_eq!(record.unit(), unit);
    }
}
