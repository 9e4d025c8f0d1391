//! Library export playlist parser
//!
//! Member references are export track ids; they are resolved to catalogue
//! keys through the export's own track table, keeping declared order.

use super::{ItemParser, RecordOf};
use crate::models::{FailureReason, ImportPolicy, Playlist, PlaylistCatalogue, PlaylistKind, TrackKey};
use crate::services::library_export::LibraryPlaylistEntry;
use medley_common::events::SourceKind;
use std::collections::HashMap;
use std::sync::Arc;

/// Parses playlist entries of a library export
#[derive(Debug, Clone, Default)]
pub struct LibraryPlaylistParser {
    track_keys: Arc<HashMap<i64, TrackKey>>,
}

impl LibraryPlaylistParser {
    /// `track_keys` maps export track ids to catalogue keys
    pub fn new(track_keys: HashMap<i64, TrackKey>) -> Self {
        Self {
            track_keys: Arc::new(track_keys),
        }
    }
}

impl ItemParser for LibraryPlaylistParser {
    type Item = LibraryPlaylistEntry;
    type Output = PlaylistCatalogue;

    fn kind(&self) -> SourceKind {
        SourceKind::LibraryPlaylists
    }

    fn source_id(&self, item: &LibraryPlaylistEntry) -> String {
        item.source_id()
    }

    fn parse(
        &self,
        item: &LibraryPlaylistEntry,
        _policy: &ImportPolicy,
    ) -> Result<RecordOf<Self>, FailureReason> {
        let persistent_id = item.persistent_id.clone().ok_or_else(|| {
            FailureReason::UnreadableOrCorruptMetadata("playlist has no persistent id".to_string())
        })?;
        let name = item.name.clone().ok_or_else(|| {
            FailureReason::UnreadableOrCorruptMetadata("playlist has no name".to_string())
        })?;

        // Folders list their descendants' tracks; only leaves own members
        let (kind, members) = if item.folder {
            (PlaylistKind::Folder, Vec::new())
        } else {
            let members = item
                .track_ids
                .iter()
                .filter_map(|id| {
                    let key = self.track_keys.get(id).cloned();
                    if key.is_none() {
                        tracing::debug!(playlist = %persistent_id, track_id = id, "Dangling member reference");
                    }
                    key
                })
                .collect();
            (PlaylistKind::Leaf, members)
        };

        Ok(Playlist {
            persistent_id,
            parent_id: item.parent_persistent_id.clone(),
            name,
            kind,
            members,
            position: item.position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FailureKind, FieldSource};
    use std::path::Path;

    fn parser() -> LibraryPlaylistParser {
        LibraryPlaylistParser::new(HashMap::from([
            (1, TrackKey::for_location(Path::new("/m/one.mp3"))),
            (2, TrackKey::for_location(Path::new("/m/two.mp3"))),
            (3, TrackKey::for_location(Path::new("/m/three.mp3"))),
        ]))
    }

    fn policy() -> ImportPolicy {
        ImportPolicy::new(FieldSource::LibraryExport, false)
    }

    #[test]
    fn test_members_keep_declared_order() {
        let entry = LibraryPlaylistEntry {
            persistent_id: Some("P1".to_string()),
            parent_persistent_id: Some("F1".to_string()),
            name: Some("Road Trip".to_string()),
            track_ids: vec![3, 99, 1, 2],
            position: 4,
            ..LibraryPlaylistEntry::default()
        };

        let playlist = parser().parse(&entry, &policy()).unwrap();
        let members: Vec<&str> = playlist.members.iter().map(TrackKey::as_str).collect();
        assert_eq!(members, vec!["/m/three.mp3", "/m/one.mp3", "/m/two.mp3"]);
        assert_eq!(playlist.kind, PlaylistKind::Leaf);
        assert_eq!(playlist.parent_id.as_deref(), Some("F1"));
        assert_eq!(playlist.position, 4);
    }

    #[test]
    fn test_folder_has_no_members() {
        let entry = LibraryPlaylistEntry {
            persistent_id: Some("F1".to_string()),
            name: Some("Trips".to_string()),
            folder: true,
            track_ids: vec![1, 2],
            ..LibraryPlaylistEntry::default()
        };

        let playlist = parser().parse(&entry, &policy()).unwrap();
        assert_eq!(playlist.kind, PlaylistKind::Folder);
        assert!(playlist.members.is_empty());
    }

    #[test]
    fn test_missing_identity_is_unreadable() {
        let entry = LibraryPlaylistEntry {
            name: Some("Nameless id".to_string()),
            ..LibraryPlaylistEntry::default()
        };
        assert_eq!(
            parser().parse(&entry, &policy()).unwrap_err().kind(),
            FailureKind::UnreadableOrCorruptMetadata
        );
    }
}
