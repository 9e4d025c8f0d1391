//! Append-only, thread-safe error list
//!
//! Workers append as they go; the orchestrator drains the list once when the
//! run ends and hands it to the error presentation in one batch.

use std::sync::Mutex;

/// Thread-safe collector of per-item failure descriptions
#[derive(Debug, Default)]
pub struct ErrorCollector {
    messages: Mutex<Vec<String>>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one failure description
    pub fn record(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("Item failed: {}", message);
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(message);
    }

    pub fn len(&self) -> usize {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take every recorded message, leaving the collector empty
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(
            &mut *self
                .messages
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }
}
