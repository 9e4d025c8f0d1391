//! Event types for the medley import event system
//!
//! Provides the import event definitions and the EventBus that carries them
//! from worker threads to a single progress observer.

mod import_types;

pub use import_types::{ImportStatus, SourceKind};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Import event types
///
/// Events are broadcast via EventBus and can be serialized for transmission
/// to a UI process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ImportEvent {
    /// Import request accepted and dispatched to its worker pool
    ImportStarted {
        /// Request identifier
        import_id: Uuid,
        /// Source kind being imported
        kind: SourceKind,
        /// Number of items in the request
        total: usize,
        /// When dispatch happened
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Progress update
    ///
    /// `fraction` is `None` when the total is zero or unknown (indeterminate).
    ImportProgress {
        /// Request identifier
        import_id: Uuid,
        /// Completed fraction in `0.0..=1.0`, or indeterminate
        fraction: Option<f64>,
        /// Items completed so far
        completed: usize,
        /// Items in the request
        total: usize,
        /// Optional status text
        message: Option<String>,
        /// When the update was published
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Import reached a terminal state
    ///
    /// Always published with an indeterminate fraction, after the last
    /// progress update.
    ImportFinished {
        /// Request identifier
        import_id: Uuid,
        /// Completed or cancelled
        status: ImportStatus,
        /// Wall-clock time since dispatch, in milliseconds
        elapsed_ms: u64,
        /// Human-readable elapsed time message
        elapsed_text: String,
        /// When the import finished
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Per-item failures accumulated over the whole run, flushed once
    ImportErrors {
        /// Request identifier
        import_id: Uuid,
        /// Formatted failure descriptions
        errors: Vec<String>,
        /// When the flush happened
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Import could not start at all
    ImportStartFailed {
        /// Source kind of the rejected request
        kind: SourceKind,
        /// Fatal failure description
        message: String,
        /// When the failure was detected
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl ImportEvent {
    /// Event type name (matches the serde tag)
    pub fn event_type(&self) -> &str {
        match self {
            ImportEvent::ImportStarted { .. } => "ImportStarted",
            ImportEvent::ImportProgress { .. } => "ImportProgress",
            ImportEvent::ImportFinished { .. } => "ImportFinished",
            ImportEvent::ImportErrors { .. } => "ImportErrors",
            ImportEvent::ImportStartFailed { .. } => "ImportStartFailed",
        }
    }
}

/// Central event distribution bus
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block worker threads)
/// - Internally synchronized, safe to emit from many threads at once
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use medley_common::events::{EventBus, ImportEvent, SourceKind};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(ImportEvent::ImportStartFailed {
///     kind: SourceKind::AudioFiles,
///     message: "root folder missing".to_string(),
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(rx.try_recv().is_ok());
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ImportEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ImportEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ImportEvent,
    ) -> Result<usize, broadcast::error::SendError<ImportEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: ImportEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_is_err() {
        let bus = EventBus::new(10);
        let result = bus.emit(ImportEvent::ImportStartFailed {
            kind: SourceKind::LibraryTracks,
            message: "bad".to_string(),
            timestamp: chrono::Utc::now(),
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_subscriber_receives_in_order() {
        let bus = EventBus::new(10);
        let mut rx = bus.subscribe();
        let import_id = Uuid::new_v4();

        for completed in 1..=3 {
            bus.emit_lossy(ImportEvent::ImportProgress {
                import_id,
                fraction: Some(completed as f64 / 3.0),
                completed,
                total: 3,
                message: None,
                timestamp: chrono::Utc::now(),
            });
        }

        let mut seen = Vec::new();
        while let Ok(ImportEvent::ImportProgress { completed, .. }) = rx.try_recv() {
            seen.push(completed);
        }
        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_event_serialization_tag() {
        let event = ImportEvent::ImportFinished {
            import_id: Uuid::nil(),
            status: ImportStatus::Cancelled,
            elapsed_ms: 1500,
            elapsed_text: "Import cancelled after 1.50s".to_string(),
            timestamp: chrono::Utc::now(),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ImportFinished");
        assert_eq!(json["status"], "CANCELLED");
        assert_eq!(event.event_type(), "ImportFinished");
    }

    #[test]
    fn test_source_kind_names() {
        assert_eq!(SourceKind::AudioFiles.as_str(), "audio_files");
        assert_eq!(SourceKind::LibraryPlaylists.to_string(), "library_playlists");
        let json = serde_json::to_string(&SourceKind::LibraryTracks).unwrap();
        assert_eq!(json, "\"library_tracks\"");
    }
}
