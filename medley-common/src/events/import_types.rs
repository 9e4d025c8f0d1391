//! Import event type definitions
//!
//! Supporting types for import progress tracking.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of source an import request reads from
///
/// Each kind carries its own partition tuning and its own worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Local audio files with embedded tags
    AudioFiles,
    /// Track entries of a media-library export
    LibraryTracks,
    /// Playlist entries of a media-library export
    LibraryPlaylists,
}

impl SourceKind {
    /// All source kinds, in configuration order
    pub const ALL: [SourceKind; 3] = [
        SourceKind::AudioFiles,
        SourceKind::LibraryTracks,
        SourceKind::LibraryPlaylists,
    ];

    /// Configuration table name for this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::AudioFiles => "audio_files",
            SourceKind::LibraryTracks => "library_tracks",
            SourceKind::LibraryPlaylists => "library_playlists",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal status of an import run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImportStatus {
    /// Every item was processed
    Completed,
    /// Cancellation was observed; the result holds only processed items
    Cancelled,
}

impl ImportStatus {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ImportStatus::Cancelled)
    }
}
