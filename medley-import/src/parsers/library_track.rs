//! Library export track parser
//!
//! The export declares a backing file for every track. The entry is only
//! accepted if that file is still on disk; after that the policy decides
//! whether the file's tags or the export's own fields describe the track.

use super::{classify_metadata_error, require_backing_file, track_from_tags, ItemParser, RecordOf};
use crate::models::{FailureReason, FieldSource, ImportPolicy, Track, TrackCatalogue};
use crate::services::library_export::LibraryTrackEntry;
use crate::services::metadata_extractor::{MetadataExtractor, TagReader};
use medley_common::events::SourceKind;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Parses track entries of a library export
#[derive(Clone)]
pub struct LibraryTrackParser {
    reader: Arc<dyn TagReader>,
}

impl LibraryTrackParser {
    pub fn new(reader: Arc<dyn TagReader>) -> Self {
        Self { reader }
    }
}

impl Default for LibraryTrackParser {
    fn default() -> Self {
        Self::new(Arc::new(MetadataExtractor::new()))
    }
}

/// Play count as stored in the catalogue; negative counts become 0
fn clamp_play_count(count: i64) -> u32 {
    u32::try_from(count.max(0)).unwrap_or(u32::MAX)
}

fn track_from_entry(path: &Path, entry: &LibraryTrackEntry) -> Track {
    Track {
        title: entry.title.clone(),
        artist: entry.artist.clone(),
        album: entry.album.clone(),
        duration: entry.total_time_ms.map(Duration::from_millis),
        bit_rate: entry.bit_rate,
        disc_number: entry.disc_number,
        track_number: entry.track_number,
        ..Track::at(path, FieldSource::LibraryExport)
    }
}

impl ItemParser for LibraryTrackParser {
    type Item = LibraryTrackEntry;
    type Output = TrackCatalogue;

    fn kind(&self) -> SourceKind {
        SourceKind::LibraryTracks
    }

    fn source_id(&self, item: &LibraryTrackEntry) -> String {
        item.source_id()
    }

    fn parse(
        &self,
        item: &LibraryTrackEntry,
        policy: &ImportPolicy,
    ) -> Result<RecordOf<Self>, FailureReason> {
        let path = item.file_path().ok_or_else(|| {
            FailureReason::UnsupportedFormat(match &item.location {
                Some(location) => format!("location is not a local file: {}", location),
                None => "entry has no location".to_string(),
            })
        })?;
        require_backing_file(&path)?;

        let mut track = match policy.field_source {
            FieldSource::FileTags => {
                let metadata = self
                    .reader
                    .read_tags(&path)
                    .map_err(|e| classify_metadata_error(&path, e))?;
                track_from_tags(&path, metadata)
            }
            FieldSource::LibraryExport => track_from_entry(&path, item),
        };

        if policy.preserve_play_count {
            track.play_count = clamp_play_count(item.play_count);
        }

        Ok(track)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FailureKind;
    use crate::services::metadata_extractor::{AudioMetadata, MetadataError};
    use tempfile::TempDir;
    use url::Url;

    struct FixedReader;

    impl TagReader for FixedReader {
        fn read_tags(&self, _path: &Path) -> Result<AudioMetadata, MetadataError> {
            Ok(AudioMetadata {
                title: Some("From Tags".to_string()),
                ..AudioMetadata::default()
            })
        }
    }

    fn entry_for(path: &Path, play_count: i64) -> LibraryTrackEntry {
        LibraryTrackEntry {
            track_id: 7,
            title: Some("From Export".to_string()),
            total_time_ms: Some(1_500),
            play_count,
            location: Some(Url::from_file_path(path).unwrap().to_string()),
            ..LibraryTrackEntry::default()
        }
    }

    fn parser() -> LibraryTrackParser {
        LibraryTrackParser::new(Arc::new(FixedReader))
    }

    #[test]
    fn test_policy_selects_field_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.mp3");
        std::fs::write(&path, b"").unwrap();
        let entry = entry_for(&path, 4);

        let tags = parser()
            .parse(&entry, &ImportPolicy::new(FieldSource::FileTags, false))
            .unwrap();
        assert_eq!(tags.title.as_deref(), Some("From Tags"));
        assert_eq!(tags.play_count, 0);

        let export = parser()
            .parse(&entry, &ImportPolicy::new(FieldSource::LibraryExport, false))
            .unwrap();
        assert_eq!(export.title.as_deref(), Some("From Export"));
        assert_eq!(export.duration, Some(Duration::from_millis(1_500)));
        assert_eq!(export.play_count, 0);
    }

    #[test]
    fn test_play_count_preserved_independently_of_field_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.mp3");
        std::fs::write(&path, b"").unwrap();

        let track = parser()
            .parse(&entry_for(&path, 12), &ImportPolicy::new(FieldSource::FileTags, true))
            .unwrap();
        assert_eq!(track.title.as_deref(), Some("From Tags"));
        assert_eq!(track.play_count, 12);
    }

    #[test]
    fn test_negative_play_count_clamped_to_zero() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.mp3");
        std::fs::write(&path, b"").unwrap();

        let track = parser()
            .parse(
                &entry_for(&path, -5),
                &ImportPolicy::new(FieldSource::LibraryExport, true),
            )
            .unwrap();
        assert_eq!(track.play_count, 0);
        assert_eq!(clamp_play_count(i64::MAX), u32::MAX);
    }

    #[test]
    fn test_missing_or_remote_backing_file() {
        let dir = TempDir::new().unwrap();
        let policy = ImportPolicy::new(FieldSource::LibraryExport, false);

        let missing = entry_for(&dir.path().join("gone.mp3"), 0);
        assert_eq!(
            parser().parse(&missing, &policy).unwrap_err().kind(),
            FailureKind::BackingFileMissing
        );

        let remote = LibraryTrackEntry {
            location: Some("http://radio.example/stream".to_string()),
            ..LibraryTrackEntry::default()
        };
        assert_eq!(
            parser().parse(&remote, &policy).unwrap_err().kind(),
            FailureKind::UnsupportedFormat
        );
    }
}
