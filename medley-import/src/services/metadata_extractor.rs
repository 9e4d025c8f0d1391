//! Audio metadata extraction service
//!
//! Extract metadata from audio files using lofty
//!
//! Extracts:
//! - Artist, title, album
//! - Duration, bitrate
//! - Disc and track number
//! - File format
//!
//! The pipeline only sees the [`TagReader`] contract: given a file, return
//! structured metadata or fail.

use lofty::error::{ErrorKind, LoftyError};
use lofty::file::{FileType, TaggedFileExt};
use lofty::prelude::*;
use lofty::probe::Probe;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Metadata extraction errors
#[derive(Debug, Error)]
pub enum MetadataError {
    /// File could not be parsed (truncated, corrupt tags, bad headers)
    #[error("Failed to read file: {0}")]
    ReadError(String),

    /// Unsupported audio format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// I/O error (file read)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Extracted audio metadata
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioMetadata {
    /// Artist name(s)
    pub artist: Option<String>,

    /// Track title
    pub title: Option<String>,

    /// Album title
    pub album: Option<String>,

    /// Disc number
    pub disc_number: Option<u32>,

    /// Track number
    pub track_number: Option<u32>,

    /// Duration
    pub duration: Option<Duration>,

    /// Audio format (MP3, FLAC, etc.)
    pub format: String,

    /// Bitrate (kbps)
    pub bitrate: Option<u32>,
}

/// Black-box tag reader
pub trait TagReader: Send + Sync {
    fn read_tags(&self, path: &Path) -> Result<AudioMetadata, MetadataError>;
}

/// Metadata extractor service
#[derive(Debug, Default, Clone, Copy)]
pub struct MetadataExtractor {}

impl MetadataExtractor {
    /// Create new metadata extractor
    pub fn new() -> Self {
        Self {}
    }

    /// Extract metadata from audio file
    pub fn extract(&self, file_path: &Path) -> Result<AudioMetadata, MetadataError> {
        // Probe the file to determine format
        let probe = Probe::open(file_path)
            .map_err(classify)?
            .guess_file_type()
            .map_err(MetadataError::IoError)?;

        if probe.file_type().is_none() {
            return Err(MetadataError::UnsupportedFormat(format!(
                "unrecognized container: {}",
                file_path.display()
            )));
        }

        let tagged_file = probe.read().map_err(classify)?;

        // Get audio properties
        let properties = tagged_file.properties();
        let duration = properties.duration();
        let bitrate = properties.audio_bitrate();

        // Determine format
        let format = match tagged_file.file_type() {
            FileType::Mpeg => "MP3",
            FileType::Flac => "FLAC",
            FileType::Opus => "Opus",
            FileType::Vorbis => "OGG Vorbis",
            FileType::Aac => "AAC",
            FileType::Mp4 => "MP4",
            FileType::Aiff => "AIFF",
            FileType::Wav => "WAV",
            FileType::WavPack => "WavPack",
            _ => "Unknown",
        }
        .to_string();

        // Try to get primary tag
        let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());

        let mut metadata = AudioMetadata {
            duration: (!duration.is_zero()).then_some(duration),
            format,
            bitrate,
            ..AudioMetadata::default()
        };

        if let Some(tag) = tag {
            metadata.artist = tag.artist().map(|s| s.to_string());
            metadata.title = tag.title().map(|s| s.to_string());
            metadata.album = tag.album().map(|s| s.to_string());
            metadata.disc_number = tag.disk();
            metadata.track_number = tag.track();
        }

        tracing::debug!(
            file = %file_path.display(),
            artist = ?metadata.artist,
            title = ?metadata.title,
            format = %metadata.format,
            "Extracted metadata"
        );

        Ok(metadata)
    }
}

fn classify(error: LoftyError) -> MetadataError {
    match error.kind() {
        ErrorKind::UnknownFormat => MetadataError::UnsupportedFormat(error.to_string()),
        ErrorKind::Io(io) => MetadataError::IoError(std::io::Error::new(io.kind(), io.to_string())),
        _ => MetadataError::ReadError(error.to_string()),
    }
}

impl TagReader for MetadataExtractor {
    fn read_tags(&self, path: &Path) -> Result<AudioMetadata, MetadataError> {
        self.extract(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_nonexistent_file() {
        let extractor = MetadataExtractor::new();
        let result = extractor.extract(Path::new("/nonexistent/file.mp3"));
        assert!(matches!(result, Err(MetadataError::IoError(_))));
    }

    #[test]
    fn test_extract_text_file_is_unsupported() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.txt");
        std::fs::write(&path, b"plain text, not audio").unwrap();

        let result = MetadataExtractor::new().extract(&path);
        assert!(matches!(result, Err(MetadataError::UnsupportedFormat(_))));
    }
}
