//! Per-item parsers
//!
//! One parser per source kind. A parser turns one raw item into one record
//! or a classified [`FailureReason`]; it never touches shared state, so the
//! partition action can call it from any worker thread.
//!
//! # Example
//! ```rust,ignore
//! struct PathOnly;
//!
//! impl ItemParser for PathOnly {
//!     type Item = PathBuf;
//!     type Output = TrackCatalogue;
//!
//!     fn kind(&self) -> SourceKind { SourceKind::AudioFiles }
//!     fn source_id(&self, item: &PathBuf) -> String { item.display().to_string() }
//!     fn parse(&self, item: &PathBuf, _: &ImportPolicy) -> Result<Track, FailureReason> {
//!         Ok(Track::at(item, FieldSource::FileTags))
//!     }
//! }
//! ```

mod audio_file;
mod library_playlist;
mod library_track;

pub use audio_file::AudioFileParser;
pub use library_playlist::LibraryPlaylistParser;
pub use library_track::LibraryTrackParser;

use crate::models::{CatalogueResult, FailureReason, FieldSource, ImportPolicy, Track};
use crate::services::metadata_extractor::{AudioMetadata, MetadataError};
use medley_common::events::SourceKind;
use std::io;
use std::path::Path;

/// Record type produced by a parser
pub type RecordOf<P> = <<P as ItemParser>::Output as CatalogueResult>::Record;

/// Strategy converting one source item into one record
pub trait ItemParser: Send + Sync {
    /// Raw source item
    type Item: Send + Sync;

    /// Keyed result collection the records are merged into
    type Output: CatalogueResult;

    /// Source kind handled (selects partition tuning and worker pool)
    fn kind(&self) -> SourceKind;

    /// Identifier of an item for failure reports
    fn source_id(&self, item: &Self::Item) -> String;

    /// Parse one item under the request's policy
    ///
    /// # Errors
    /// Returns the classified reason the item produced no record.
    fn parse(&self, item: &Self::Item, policy: &ImportPolicy) -> Result<RecordOf<Self>, FailureReason>;
}

/// Map a tag-reader failure onto the failure taxonomy
pub(crate) fn classify_metadata_error(path: &Path, error: MetadataError) -> FailureReason {
    match error {
        MetadataError::UnsupportedFormat(detail) => FailureReason::UnsupportedFormat(detail),
        MetadataError::ReadError(detail) => FailureReason::UnreadableOrCorruptMetadata(detail),
        // Removed between the existence check and the read
        MetadataError::IoError(e) if e.kind() == io::ErrorKind::NotFound => {
            FailureReason::BackingFileMissing(path.display().to_string())
        }
        MetadataError::IoError(e) => FailureReason::UnreadableOrCorruptMetadata(e.to_string()),
    }
}

/// Build a track from embedded tags
pub(crate) fn track_from_tags(path: &Path, metadata: AudioMetadata) -> Track {
    Track {
        title: metadata.title,
        artist: metadata.artist,
        album: metadata.album,
        duration: metadata.duration,
        bit_rate: metadata.bitrate,
        disc_number: metadata.disc_number,
        track_number: metadata.track_number,
        ..Track::at(path, FieldSource::FileTags)
    }
}

/// Fail with `BackingFileMissing` unless `path` exists
pub(crate) fn require_backing_file(path: &Path) -> Result<(), FailureReason> {
    if path.exists() {
        Ok(())
    } else {
        Err(FailureReason::BackingFileMissing(path.display().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FailureKind;

    #[test]
    fn test_classify_metadata_error() {
        let path = Path::new("/m/a.mp3");
        let cases = [
            (
                MetadataError::UnsupportedFormat("xyz".to_string()),
                FailureKind::UnsupportedFormat,
            ),
            (
                MetadataError::ReadError("bad header".to_string()),
                FailureKind::UnreadableOrCorruptMetadata,
            ),
            (
                MetadataError::IoError(io::Error::from(io::ErrorKind::NotFound)),
                FailureKind::BackingFileMissing,
            ),
            (
                MetadataError::IoError(io::Error::from(io::ErrorKind::PermissionDenied)),
                FailureKind::UnreadableOrCorruptMetadata,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(classify_metadata_error(path, error).kind(), expected);
        }
    }

    #[test]
    fn test_track_from_tags_copies_fields() {
        let metadata = AudioMetadata {
            title: Some("Song".to_string()),
            artist: Some("Artist".to_string()),
            bitrate: Some(320),
            track_number: Some(7),
            ..AudioMetadata::default()
        };

        let track = track_from_tags(Path::new("/m/song.flac"), metadata);
        assert_eq!(track.title.as_deref(), Some("Song"));
        assert_eq!(track.bit_rate, Some(320));
        assert_eq!(track.track_number, Some(7));
        assert_eq!(track.play_count, 0);
        assert_eq!(track.field_source, FieldSource::FileTags);
    }
}
