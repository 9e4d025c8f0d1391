//! Final report of one import run

use super::outcome::{CatalogueResult, ParseOutcome};
use chrono::{DateTime, Utc};
use medley_common::events::{ImportStatus, SourceKind};
use std::time::Duration;
use uuid::Uuid;

/// What the orchestrator returns when an import run ends
#[derive(Debug, Clone)]
pub struct ImportReport<R> {
    /// Request identifier
    pub import_id: Uuid,

    /// Source kind imported
    pub kind: SourceKind,

    /// Completed or cancelled
    pub status: ImportStatus,

    /// Items in the request
    pub total: usize,

    /// Merged result, partial when cancelled
    pub outcome: ParseOutcome<R>,

    /// Dispatch time
    pub started_at: DateTime<Utc>,

    /// Completion time
    pub ended_at: DateTime<Utc>,

    /// Wall-clock time between dispatch and completion
    pub elapsed: Duration,

    /// The "finished" message published to the progress observer
    pub elapsed_text: String,
}

impl<R: CatalogueResult> ImportReport<R> {
    pub fn is_cancelled(&self) -> bool {
        self.status.is_cancelled()
    }

    /// Items never reached because of cancellation
    pub fn skipped(&self) -> usize {
        self.total.saturating_sub(self.outcome.processed())
    }

    /// One-line summary for logs and the CLI
    pub fn summary(&self) -> String {
        format!(
            "{}: {} records, {} errors, {} not found, {} duplicates ({} of {} items processed). {}",
            self.kind,
            self.outcome.records(),
            self.outcome.errors.len(),
            self.outcome.not_found.len(),
            self.outcome.duplicates,
            self.outcome.processed(),
            self.total,
            self.elapsed_text
        )
    }
}
