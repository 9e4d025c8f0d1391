//! Per-item failure classification
//!
//! Failures are data, not faults: a parser returns a [`FailureReason`], the
//! partition leaf attaches the source identifier and records the result.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure class, used to group failures in the final report
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    BackingFileMissing,
    UnreadableOrCorruptMetadata,
    UnsupportedFormat,
}

impl FailureKind {
    /// Stable error code for reports
    pub fn code(&self) -> &'static str {
        match self {
            FailureKind::BackingFileMissing => "FILE_MISSING",
            FailureKind::UnreadableOrCorruptMetadata => "METADATA_UNREADABLE",
            FailureKind::UnsupportedFormat => "UNSUPPORTED_FORMAT",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Why a single item could not be turned into a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    /// The declared backing file does not exist on disk
    #[error("backing file missing: {0}")]
    BackingFileMissing(String),

    /// The file exists but its metadata could not be read
    #[error("unreadable or corrupt metadata: {0}")]
    UnreadableOrCorruptMetadata(String),

    /// The file is not in a format the tag reader understands
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl FailureReason {
    pub fn kind(&self) -> FailureKind {
        match self {
            FailureReason::BackingFileMissing(_) => FailureKind::BackingFileMissing,
            FailureReason::UnreadableOrCorruptMetadata(_) => {
                FailureKind::UnreadableOrCorruptMetadata
            }
            FailureReason::UnsupportedFormat(_) => FailureKind::UnsupportedFormat,
        }
    }
}

/// A classified failure bound to the item it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    /// Source identifier (file path, export track id, playlist id)
    pub source_id: String,

    /// Failure class
    pub kind: FailureKind,

    /// Human-readable reason
    pub message: String,
}

impl ItemFailure {
    pub fn new(source_id: impl Into<String>, reason: &FailureReason) -> Self {
        Self {
            source_id: source_id.into(),
            kind: reason.kind(),
            message: reason.to_string(),
        }
    }
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.source_id, self.message)
    }
}
