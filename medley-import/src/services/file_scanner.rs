//! Audio file scanner
//!
//! Recursive audio file discovery for folder imports. Two phases:
//! - Phase 1: Sequential directory traversal with symlink loop detection
//! - Phase 2: Parallel candidate filtering (extension, optionally magic bytes)
//!
//! A root that cannot be scanned at all is a [`ScanError`]; everything found
//! below it becomes one import item.

use rayon::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Audio file scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Cannot access file
    #[error("File access error {0}: {1}")]
    FileAccessError(PathBuf, String),
}

/// Audio file scanner
#[derive(Debug, Clone)]
pub struct FileScanner {
    ignore_patterns: Vec<String>,
    max_depth: Option<usize>,
    verify_content: bool,
}

impl FileScanner {
    /// Create new file scanner with default ignore patterns
    ///
    /// Ignores system files like .DS_Store, Thumbs.db, .git, etc.
    pub fn new() -> Self {
        Self {
            ignore_patterns: vec![
                ".DS_Store".to_string(),
                "Thumbs.db".to_string(),
                ".git".to_string(),
                ".svn".to_string(),
            ],
            max_depth: None,
            verify_content: false,
        }
    }

    /// Limit traversal depth (1 = root folder only)
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Also require a recognized magic number, not just an audio extension
    ///
    /// Off by default: files that only look like audio are left for the
    /// parser to classify as unsupported or corrupt.
    pub fn with_content_verification(mut self, verify: bool) -> Self {
        self.verify_content = verify;
        self
    }

    /// Scan directory for audio files
    ///
    /// Results are sorted so repeated scans yield the same item order.
    pub fn scan(&self, root_path: &Path) -> Result<Vec<PathBuf>, ScanError> {
        if !root_path.exists() {
            return Err(ScanError::PathNotFound(root_path.to_path_buf()));
        }

        if !root_path.is_dir() {
            return Err(ScanError::NotADirectory(root_path.to_path_buf()));
        }

        std::fs::read_dir(root_path)
            .map_err(|e| ScanError::FileAccessError(root_path.to_path_buf(), e.to_string()))?;

        // Phase 1: Sequential directory traversal + symlink detection
        let mut candidate_files = Vec::new();
        let mut symlink_visited = HashSet::new();

        let walker = WalkDir::new(root_path)
            .follow_links(false)
            .max_depth(self.max_depth.unwrap_or(usize::MAX))
            .into_iter()
            .filter_entry(|e| self.should_process_entry(e, &mut symlink_visited));

        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() {
                        candidate_files.push(entry.path().to_path_buf());
                    }
                }
                Err(e) => {
                    tracing::warn!("Error accessing entry: {}", e);
                }
            }
        }

        tracing::debug!(
            "Phase 1 complete: {} candidate files discovered",
            candidate_files.len()
        );

        // Phase 2: Parallel filtering
        let mut audio_files: Vec<PathBuf> = candidate_files
            .par_iter()
            .filter_map(|path| match self.is_audio_file(path) {
                Ok(true) => Some(path.clone()),
                Ok(false) => None,
                Err(e) => {
                    tracing::warn!("Error verifying {}: {}", path.display(), e);
                    None
                }
            })
            .collect();
        audio_files.sort();

        tracing::debug!(
            "Phase 2 complete: {} audio files from {} candidates",
            audio_files.len(),
            candidate_files.len()
        );

        Ok(audio_files)
    }

    fn should_process_entry(&self, entry: &DirEntry, symlink_visited: &mut HashSet<PathBuf>) -> bool {
        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy();

        for pattern in &self.ignore_patterns {
            if file_name.contains(pattern.as_str()) {
                return false;
            }
        }

        if entry.file_type().is_symlink() {
            if let Ok(canonical) = path.canonicalize() {
                if !symlink_visited.insert(canonical) {
                    tracing::warn!("Symlink loop detected: {}", path.display());
                    return false;
                }
            }
        }

        true
    }

    fn is_audio_file(&self, path: &Path) -> Result<bool, ScanError> {
        let Some(ext) = path.extension() else {
            return Ok(false);
        };
        if !is_audio_extension(&ext.to_string_lossy().to_lowercase()) {
            return Ok(false);
        }
        if self.verify_content {
            return verify_magic_bytes(path);
        }
        Ok(true)
    }
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if extension is audio
pub fn is_audio_extension(ext: &str) -> bool {
    matches!(
        ext,
        "mp3" | "flac" | "ogg" | "oga" | "m4a" | "aac" | "mp4" | "wav" | "opus" | "aiff" | "wv"
    )
}

/// Verify file type using magic bytes
fn verify_magic_bytes(path: &Path) -> Result<bool, ScanError> {
    let mut file =
        File::open(path).map_err(|e| ScanError::FileAccessError(path.to_path_buf(), e.to_string()))?;

    let mut buffer = [0u8; 12];
    let bytes_read = file
        .read(&mut buffer)
        .map_err(|e| ScanError::FileAccessError(path.to_path_buf(), e.to_string()))?;

    if bytes_read < 4 {
        return Ok(false);
    }

    let is_audio = match &buffer[..bytes_read] {
        // MP3
        [0xFF, 0xFB, ..] | [0xFF, 0xF3, ..] | [0xFF, 0xF2, ..] => true,
        [b'I', b'D', b'3', ..] => true,

        // FLAC
        [b'f', b'L', b'a', b'C', ..] => true,

        // OGG (Vorbis/Opus)
        [b'O', b'g', b'g', b'S', ..] => true,

        // M4A/AAC (MP4 container)
        [_, _, _, _, b'f', b't', b'y', b'p', ..] => true,

        // WAV
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E'] => true,

        // AIFF
        [b'F', b'O', b'R', b'M', ..] => true,

        // WavPack
        [b'w', b'v', b'p', b'k', ..] => true,

        _ => false,
    };

    Ok(is_audio)
}
