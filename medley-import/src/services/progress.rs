//! Progress reporting
//!
//! Leaves bump a shared atomic counter once per item. [`ProgressTracker`]
//! decides which of those bumps reach the observer: at most
//! `max_events_per_second` of them, never out of order, and always the one
//! that completes the batch.

use chrono::Utc;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use medley_common::events::{EventBus, ImportEvent};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Progress observer contract
///
/// Implementations see calls from one thread at a time.
pub trait ProgressReporter: Send + Sync {
    /// Items completed out of total
    fn report(&self, completed: usize, total: usize);

    /// Status text with an indeterminate fraction
    fn report_message(&self, message: &str);
}

/// Publishes progress as [`ImportEvent::ImportProgress`] on the EventBus
#[derive(Debug)]
pub struct EventProgressReporter {
    event_bus: EventBus,
    import_id: Uuid,
    total: usize,
    last_completed: AtomicUsize,
}

impl EventProgressReporter {
    pub fn new(event_bus: EventBus, import_id: Uuid, total: usize) -> Self {
        Self {
            event_bus,
            import_id,
            total,
            last_completed: AtomicUsize::new(0),
        }
    }
}

/// Completed fraction, `None` when there is nothing to divide by
pub fn fraction(completed: usize, total: usize) -> Option<f64> {
    (total > 0).then(|| completed as f64 / total as f64)
}

impl ProgressReporter for EventProgressReporter {
    fn report(&self, completed: usize, total: usize) {
        self.last_completed.fetch_max(completed, Ordering::Relaxed);
        self.event_bus.emit_lossy(ImportEvent::ImportProgress {
            import_id: self.import_id,
            fraction: fraction(completed, total),
            completed,
            total,
            message: None,
            timestamp: Utc::now(),
        });
    }

    fn report_message(&self, message: &str) {
        self.event_bus.emit_lossy(ImportEvent::ImportProgress {
            import_id: self.import_id,
            fraction: None,
            completed: self.last_completed.load(Ordering::Relaxed),
            total: self.total,
            message: Some(message.to_string()),
            timestamp: Utc::now(),
        });
    }
}

/// Shared progress of one run
///
/// `completed` only ever grows; `total` and `started` are fixed at creation.
#[derive(Debug)]
pub struct ProgressState {
    completed: AtomicUsize,
    total: usize,
    started: Instant,
}

impl ProgressState {
    pub fn new(total: usize) -> Self {
        Self {
            completed: AtomicUsize::new(0),
            total,
            started: Instant::now(),
        }
    }

    /// Count one more item; returns the new completed count
    pub fn increment(&self) -> usize {
        self.completed.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Acquire)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Counter plus throttled publication to a [`ProgressReporter`]
pub struct ProgressTracker {
    state: ProgressState,
    reporter: Arc<dyn ProgressReporter>,
    limiter: DefaultDirectRateLimiter,
    last_reported: Mutex<usize>,
}

impl ProgressTracker {
    pub fn new(
        total: usize,
        reporter: Arc<dyn ProgressReporter>,
        max_events_per_second: NonZeroU32,
    ) -> Self {
        Self {
            state: ProgressState::new(total),
            reporter,
            limiter: RateLimiter::direct(Quota::per_second(max_events_per_second)),
            last_reported: Mutex::new(0),
        }
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    /// Record one finished item (success or failure)
    pub fn item_done(&self) {
        let completed = self.state.increment();
        let total = self.state.total();
        if completed < total && self.limiter.check().is_err() {
            return;
        }
        self.publish(completed, total);
    }

    /// Publish a status message to the observer
    pub fn message(&self, text: &str) {
        let _guard = self.lock_last_reported();
        self.reporter.report_message(text);
    }

    fn publish(&self, completed: usize, total: usize) {
        let mut last = self.lock_last_reported();
        // A later count may already have been published by another worker
        if completed <= *last {
            return;
        }
        *last = completed;
        self.reporter.report(completed, total);
    }

    fn lock_last_reported(&self) -> std::sync::MutexGuard<'_, usize> {
        self.last_reported
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for ProgressTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressTracker")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rayon::prelude::*;

    #[derive(Default)]
    struct Recorder {
        reports: Mutex<Vec<(usize, usize)>>,
        messages: Mutex<Vec<String>>,
    }

    impl ProgressReporter for Recorder {
        fn report(&self, completed: usize, total: usize) {
            self.reports.lock().unwrap().push((completed, total));
        }

        fn report_message(&self, message: &str) {
            self.messages.lock().unwrap().push(message.to_string());
        }
    }

    #[test]
    fn test_fraction_is_indeterminate_for_empty_total() {
        assert_eq!(fraction(0, 0), None);
        assert_eq!(fraction(5, 10), Some(0.5));
    }

    #[test]
    fn test_final_report_is_never_throttled() {
        let recorder = Arc::new(Recorder::default());
        let tracker = ProgressTracker::new(50, recorder.clone(), NonZeroU32::new(1).unwrap());

        for _ in 0..50 {
            tracker.item_done();
        }

        let reports = recorder.reports.lock().unwrap();
        assert!(reports.len() < 50);
        assert_eq!(reports.last(), Some(&(50, 50)));
    }

    #[test]
    fn test_concurrent_reports_are_monotonic() {
        let recorder = Arc::new(Recorder::default());
        let tracker = ProgressTracker::new(
            10_000,
            recorder.clone(),
            NonZeroU32::new(1_000_000).unwrap(),
        );

        (0..10_000).into_par_iter().for_each(|_| tracker.item_done());

        assert_eq!(tracker.state().completed(), 10_000);
        let reports = recorder.reports.lock().unwrap();
        assert!(reports.windows(2).all(|w| w[0].0 < w[1].0));
        assert_eq!(reports.iter().filter(|(c, _)| *c == 10_000).count(), 1);
    }

    #[tokio::test]
    async fn test_event_reporter_message_is_indeterminate() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let import_id = Uuid::new_v4();
        let reporter = EventProgressReporter::new(bus, import_id, 4);

        reporter.report(4, 4);
        reporter.report_message("Import finished in 0.10s");

        match rx.recv().await.unwrap() {
            ImportEvent::ImportProgress { fraction, completed, .. } => {
                assert_eq!(fraction, Some(1.0));
                assert_eq!(completed, 4);
            }
            other => panic!("unexpected event {:?}", other),
        }
        match rx.recv().await.unwrap() {
            ImportEvent::ImportProgress {
                fraction, message, completed, ..
            } => {
                assert_eq!(fraction, None);
                assert_eq!(completed, 4);
                assert_eq!(message.as_deref(), Some("Import finished in 0.10s"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
