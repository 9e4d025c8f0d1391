//! Error types for medley-import
//!
//! Only failures that stop an import from starting (or from finishing at
//! all) are errors. Per-item problems are data: see
//! [`crate::models::ItemFailure`].

use crate::services::file_scanner::ScanError;
use crate::services::library_export::ExportError;
use medley_common::events::SourceKind;
use thiserror::Error;

/// Import error type
#[derive(Debug, Error)]
pub enum ImportError {
    /// Policy does not apply to the request's source kind
    #[error("Invalid import policy for {kind}: {reason}")]
    InvalidPolicy { kind: SourceKind, reason: String },

    /// Source root cannot be opened at all
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// Source document is not in the expected format
    #[error("Malformed source: {0}")]
    MalformedSource(String),

    /// Worker pool could not be built
    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    /// The blocking worker task died
    #[error("Worker task failed: {0}")]
    Worker(String),

    /// medley-common error (configuration)
    #[error("Common error: {0}")]
    Common(#[from] medley_common::Error),
}

impl From<ScanError> for ImportError {
    fn from(err: ScanError) -> Self {
        ImportError::SourceUnavailable(err.to_string())
    }
}

impl From<ExportError> for ImportError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::Io(e) => ImportError::SourceUnavailable(e.to_string()),
            other => ImportError::MalformedSource(other.to_string()),
        }
    }
}

/// Convenience result type
pub type ImportResult<T> = Result<T, ImportError>;
