//! File system utilities.

use crate::models::media::FileRecord;
use crate::Result;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Check if a path exists and is a directory.
pub fn ensure_directory(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(crate::Error::PathNotFound(path.display().to_string()));
    }
    if !path.is_dir() {
        return Err(crate::Error::NotADirectory(path.display().to_string()));
    }
    Ok(())
}

/// Get file extension in lowercase.
pub fn get_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Check if a file is a video file based on extension.
pub fn is_video_file(path: &Path) -> bool {
    const VIDEO_EXTENSIONS: &[&str] = &[
        "mkv", "mp4", "avi", "mov", "wmv", "m4v", "ts", "m2ts", "flv", "webm", "mpg", "mpeg",
    ];

    get_extension(path)
        .map(|ext| VIDEO_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Check if a path contains "sample" (case insensitive).
pub fn is_sample(path: &Path) -> bool {
    path.to_string_lossy().to_lowercase().contains("sample")
}

/// Recursively collect video files under a directory, skipping samples.
/// Size and modification time are filled in where available.
pub fn scan_videos(dir: &Path) -> Result<Vec<FileRecord>> {
    let mut records = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| crate::Error::other(e.to_string()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_video_file(path) || is_sample(path) {
            continue;
        }
        let mut record = FileRecord::new(path);
        if let Ok(metadata) = entry.metadata() {
            record.size = Some(metadata.len());
            record.modified = metadata.modified().ok().map(Into::into);
        }
        records.push(record);
    }
    debug!(count = records.len(), dir = %dir.display(), "scanned video files");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_is_video_file() {
        assert!(is_video_file(&PathBuf::from("episode.mkv")));
        assert!(is_video_file(&PathBuf::from("episode.MP4")));
        assert!(!is_video_file(&PathBuf::from("episode.nfo")));
        assert!(!is_video_file(&PathBuf::from("episode.srt")));
    }

    #[test]
    fn test_is_sample() {
        assert!(is_sample(&PathBuf::from("/path/Sample/video.mkv")));
        assert!(!is_sample(&PathBuf::from("/path/video.mkv")));
    }

    #[test]
    fn test_scan_videos() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Show.S01E01.mkv"), b"x").unwrap();
        std::fs::write(dir.path().join("Show.S01E01.nfo"), b"x").unwrap();
        std::fs::write(dir.path().join("sample.mkv"), b"x").unwrap();

        let records = scan_videos(dir.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name(), "Show.S01E01");
        assert_eq!(records[0].size, Some(1));
    }

    #[test]
    fn test_scan_videos_missing_dir() {
        assert!(ensure_directory(&PathBuf::from("/no/such/dir")).is_err());
    }
}
