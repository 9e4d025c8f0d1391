//! Import request and policy
//!
//! A request is immutable once handed to the orchestrator.

use medley_common::events::SourceKind;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Which field source is authoritative for a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    /// Read tags embedded in the backing file
    #[default]
    FileTags,
    /// Accept the fields supplied by the library export
    LibraryExport,
}

/// Import policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImportPolicy {
    /// Authoritative field source
    pub field_source: FieldSource,

    /// Keep the export's play count regardless of `field_source`
    pub preserve_play_count: bool,
}

impl ImportPolicy {
    pub fn new(field_source: FieldSource, preserve_play_count: bool) -> Self {
        Self {
            field_source,
            preserve_play_count,
        }
    }

    /// Check that this policy makes sense for a source kind
    ///
    /// Local audio files have no export fields to prefer or counter to keep,
    /// and playlist entries have no backing file to read tags from.
    pub fn validate_for(&self, kind: SourceKind) -> Result<(), String> {
        match kind {
            SourceKind::AudioFiles => {
                if self.field_source == FieldSource::LibraryExport {
                    return Err("audio file imports can only read file tags".to_string());
                }
                if self.preserve_play_count {
                    return Err("audio file imports have no play count to preserve".to_string());
                }
            }
            SourceKind::LibraryTracks => {}
            SourceKind::LibraryPlaylists => {
                if self.field_source == FieldSource::FileTags {
                    return Err("playlist entries have no file tags to read".to_string());
                }
            }
        }
        Ok(())
    }
}

/// An ordered batch of source items plus the policy to import them with
#[derive(Debug, Clone)]
pub struct ImportRequest<T> {
    id: Uuid,
    kind: SourceKind,
    items: Arc<[T]>,
    policy: ImportPolicy,
    priority: bool,
}

impl<T> ImportRequest<T> {
    /// Create a new request with a fresh id
    pub fn new(kind: SourceKind, items: Vec<T>, policy: ImportPolicy) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            items: items.into(),
            policy,
            priority: false,
        }
    }

    /// Insert results at the catalogue's priority position
    pub fn with_priority(mut self, priority: bool) -> Self {
        self.priority = priority;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub(crate) fn shared_items(&self) -> Arc<[T]> {
        Arc::clone(&self.items)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn policy(&self) -> ImportPolicy {
        self.policy
    }

    pub fn priority(&self) -> bool {
        self.priority
    }
}
