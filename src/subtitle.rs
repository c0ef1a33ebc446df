use std::path::{Path, PathBuf};
use tracing::debug;

/// Places a transcriber may have written `<stem>.srt` to, most likely first.
/// Some whisper-ctranslate2 versions create a per-file subdirectory.
pub fn subtitle_candidates(output_dir: &Path, stem: &str) -> Vec<PathBuf> {
    let file_name = format!("{}.srt", stem);
    vec![
        output_dir.join(&file_name),
        output_dir.join(stem).join(&file_name),
    ]
}

/// First candidate that exists and is non-empty.
pub fn locate_subtitle(output_dir: &Path, stem: &str) -> Option<PathBuf> {
    subtitle_candidates(output_dir, stem)
        .into_iter()
        .find(|path| is_usable_output(path))
}

/// Output files count only when present and non-empty; a crashed tool can
/// leave a zero-byte file behind.
pub fn is_usable_output(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.len() > 0,
        Err(_) => false,
    }
}

/// Number of cues in an SRT document (blocks with a `-->` timing line).
pub fn count_cues(content: &str) -> usize {
    content
        .lines()
        .filter(|line| line.contains("-->"))
        .count()
}

/// Read an SRT file and count its cues. Unreadable files count as zero.
pub async fn subtitle_cue_count(path: &Path) -> usize {
    match tokio::fs::read(path).await {
        Ok(bytes) => count_cues(&String::from_utf8_lossy(&bytes)),
        Err(e) => {
            debug!("Could not read {}: {}", path.display(), e);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_cues() {
        let srt = "1\n00:00:01,000 --> 00:00:02,500\nHello\n\n2\n00:00:03,000 --> 00:00:04,000\nWorld\n";
        assert_eq!(count_cues(srt), 2);
        assert_eq!(count_cues(""), 0);
    }

    #[test]
    fn test_locate_prefers_flat_layout() {
        let dir = tempfile::tempdir().unwrap();
        let nested_dir = dir.path().join("movie");
        std::fs::create_dir_all(&nested_dir).unwrap();
        std::fs::write(nested_dir.join("movie.srt"), "1\n").unwrap();

        assert_eq!(
            locate_subtitle(dir.path(), "movie"),
            Some(nested_dir.join("movie.srt"))
        );

        std::fs::write(dir.path().join("movie.srt"), "1\n").unwrap();
        assert_eq!(
            locate_subtitle(dir.path(), "movie"),
            Some(dir.path().join("movie.srt"))
        );
    }

    #[test]
    fn test_empty_files_are_not_usable() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("movie.srt");
        std::fs::write(&empty, "").unwrap();

        assert!(!is_usable_output(&empty));
        assert!(!is_usable_output(dir.path()));
        assert_eq!(locate_subtitle(dir.path(), "movie"), None);
    }
}
