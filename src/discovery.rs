//! Input expansion: a literal path, a glob, or a folder of videos becomes an
//! ordered list of media items.

use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::pipeline::MediaItem;

pub const SUPPORTED_VIDEO_EXTENSIONS: [&str; 7] = ["mp4", "mkv", "avi", "mov", "flv", "wmv", "webm"];

fn has_glob_syntax(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

fn absolute(path: &Path) -> Result<PathBuf> {
    Ok(std::path::absolute(path)?)
}

/// Expand a path or glob into absolute file paths, sorted and deduplicated.
pub fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>> {
    let literal = Path::new(pattern);
    if literal.is_file() {
        return Ok(vec![absolute(literal)?]);
    }
    if !has_glob_syntax(pattern) {
        return Err(Error::NoFilesMatched(pattern.to_string()));
    }

    let entries = glob::glob(pattern).map_err(|e| Error::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => files.push(absolute(&path)?),
            Ok(path) => debug!("Skipping non-file match {}", path.display()),
            Err(e) => debug!("Skipping unreadable match: {}", e),
        }
    }

    files.sort();
    files.dedup();

    if files.is_empty() {
        return Err(Error::NoFilesMatched(pattern.to_string()));
    }
    Ok(files)
}

pub fn is_supported_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_VIDEO_EXTENSIONS
                .iter()
                .any(|supported| supported.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

/// Supported videos directly inside `dir` (not recursive), sorted.
pub fn scan_directory(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::Usage(format!("Folder not found: {}", dir.display())));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if entry.file_type().is_file() && is_supported_video(entry.path()) {
            files.push(absolute(entry.path())?);
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(Error::NoFilesMatched(format!(
            "no video files in {} (supported: {})",
            dir.display(),
            SUPPORTED_VIDEO_EXTENSIONS.join(", ")
        )));
    }

    info!("Found {} video files in {}", files.len(), dir.display());
    Ok(files)
}

pub fn media_items(paths: Vec<PathBuf>) -> Result<Vec<MediaItem>> {
    paths.into_iter().map(MediaItem::new).collect()
}
