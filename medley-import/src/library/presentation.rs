//! Error presentation
//!
//! Per-item failures are shown once, in full, when a run ends. Fatal startup
//! failures take a separate, immediate path.

use chrono::Utc;
use medley_common::events::{EventBus, ImportEvent, SourceKind};
use uuid::Uuid;

/// Receives failure reports for display
pub trait ErrorPresentation: Send + Sync {
    /// The complete per-item failure list of one run
    fn present_errors(&self, import_id: Uuid, errors: &[String]);

    /// An import that could not start at all
    fn present_fatal(&self, kind: SourceKind, message: &str);
}

/// Publishes failure reports on the EventBus
#[derive(Debug, Clone)]
pub struct EventPresentation {
    event_bus: EventBus,
}

impl EventPresentation {
    pub fn new(event_bus: EventBus) -> Self {
        Self { event_bus }
    }
}

impl ErrorPresentation for EventPresentation {
    fn present_errors(&self, import_id: Uuid, errors: &[String]) {
        self.event_bus.emit_lossy(ImportEvent::ImportErrors {
            import_id,
            errors: errors.to_vec(),
            timestamp: Utc::now(),
        });
    }

    fn present_fatal(&self, kind: SourceKind, message: &str) {
        self.event_bus.emit_lossy(ImportEvent::ImportStartFailed {
            kind,
            message: message.to_string(),
            timestamp: Utc::now(),
        });
    }
}

/// Writes failure reports to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogPresentation;

impl ErrorPresentation for LogPresentation {
    fn present_errors(&self, import_id: Uuid, errors: &[String]) {
        if errors.is_empty() {
            return;
        }
        tracing::warn!(%import_id, count = errors.len(), "{} errors occurred", errors.len());
        for error in errors {
            tracing::warn!(%import_id, "  {}", error);
        }
    }

    fn present_fatal(&self, kind: SourceKind, message: &str) {
        tracing::error!(%kind, "Import could not start: {}", message);
    }
}
