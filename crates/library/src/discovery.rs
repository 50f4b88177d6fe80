use std::fs;
use std::path::{Path, PathBuf};

use common::AlbumUnit;
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use crate::LibraryError;

/// Infers (artist, album) units from the layout under `root`.
///
/// Each visible top-level directory is classified on its own: if it has
/// subdirectories it is an artist and every subdirectory is one of its
/// albums; otherwise `root` is taken to be the artist and the entry is an
/// album. Units come back in file-name order.
pub fn discover(root: &Path) -> Result<Vec<AlbumUnit>, LibraryError> {
    if !root.is_dir() {
        return Err(LibraryError::InvalidDirectory(root.to_path_buf()));
    }
    fs::read_dir(root)?;

    let root_name = dir_name(root);
    let mut units = Vec::new();

    for entry in child_dirs(root) {
        let name = entry_name(&entry);
        let albums: Vec<DirEntry> = child_dirs(entry.path()).collect();
        if albums.is_empty() {
            debug!("{} has no subfolders; treating as album of {}", name, root_name);
            units.push(AlbumUnit::new(root_name.clone(), name));
            continue;
        }
        for album in albums {
            units.push(AlbumUnit::new(name.clone(), entry_name(&album)));
        }
    }

    info!("Discovered {} albums under {}", units.len(), root.display());
    Ok(units)
}

/// Locates the folder holding `unit`'s tracks: `root/artist/album`, or
/// `root/album` when the root itself is the artist folder.
pub fn album_dir(root: &Path, unit: &AlbumUnit) -> Option<PathBuf> {
    let nested = root.join(&unit.artist).join(&unit.album);
    if nested.is_dir() {
        return Some(nested);
    }
    if dir_name(root) == unit.artist {
        let flat = root.join(&unit.album);
        if flat.is_dir() {
            return Some(flat);
        }
    }
    None
}

/// Regular, visible files directly inside `dir`, in file-name order.
pub fn track_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .follow_links(true)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| !is_hidden(entry) && entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

fn child_dirs(dir: &Path) -> impl Iterator<Item = DirEntry> {
    WalkDir::new(dir)
        .follow_links(true)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| !is_hidden(entry) && entry.file_type().is_dir())
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn entry_name(entry: &DirEntry) -> String {
    entry.file_name().to_string_lossy().to_string()
}

fn dir_name(path: &Path) -> String {
    if let Some(name) = path.file_name() {
        return name.to_string_lossy().to_string();
    }
    path.canonicalize()
        .ok()
        .and_then(|full| full.file_name().map(|name| name.to_string_lossy().to_string()))
        .unwrap_or_else(|| "Unknown Artist".to_string())
}
