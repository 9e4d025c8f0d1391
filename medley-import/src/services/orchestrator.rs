//! Import task orchestrator
//!
//! Entry point for one import request:
//! 1. Validate configuration and policy (fatal, reported once, nothing dispatched)
//! 2. Publish `ImportStarted`, start the clock
//! 3. Run the root partition action inside the kind's rayon pool, off the
//!    async runtime via `spawn_blocking`
//! 4. Publish the elapsed-time "finished" message and `ImportFinished`
//! 5. Hand the merged result to the library sink (completed runs only)
//! 6. Flush the collected per-item errors to the error presentation, once

use crate::error::{ImportError, ImportResult};
use crate::library::{ErrorPresentation, LibrarySink};
use crate::models::{CatalogueResult, ImportReport, ImportRequest};
use crate::parsers::ItemParser;
use crate::services::error_collector::ErrorCollector;
use crate::services::partition::{ImportContext, PartitionAction, PartitionHook, PartitionNode};
use crate::services::progress::{EventProgressReporter, ProgressTracker};
use crate::services::worker_pools::WorkerPools;
use chrono::Utc;
use medley_common::config::ImportConfig;
use medley_common::events::{EventBus, ImportEvent, SourceKind};
use medley_common::human_time::finished_message;
use std::num::NonZeroU32;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Collaborators shared by every orchestrator of a process
#[derive(Clone)]
pub struct ImportServices {
    pub config: Arc<ImportConfig>,
    pub pools: Arc<WorkerPools>,
    pub event_bus: EventBus,
    pub presentation: Arc<dyn ErrorPresentation>,
    pub sink: Arc<dyn LibrarySink>,
}

impl ImportServices {
    pub fn new(
        config: ImportConfig,
        event_bus: EventBus,
        presentation: Arc<dyn ErrorPresentation>,
        sink: Arc<dyn LibrarySink>,
    ) -> Self {
        let pools = Arc::new(WorkerPools::new(config.pool.workers));
        Self {
            config: Arc::new(config),
            pools,
            event_bus,
            presentation,
            sink,
        }
    }

    /// Report a failure that prevents an import from starting
    ///
    /// Returns the error so callers can `return Err(services.fatal(..))`.
    pub fn fatal(&self, kind: SourceKind, error: ImportError) -> ImportError {
        tracing::error!(%kind, "Import failed to start: {}", error);
        self.presentation.present_fatal(kind, &error.to_string());
        error
    }
}

/// Runs import requests of one parser kind
pub struct ImportOrchestrator<P: ItemParser> {
    parser: Arc<P>,
    services: ImportServices,
    hook: Option<Arc<dyn PartitionHook>>,
}

impl<P> ImportOrchestrator<P>
where
    P: ItemParser + 'static,
    P::Item: 'static,
    P::Output: 'static,
{
    pub fn new(parser: P, services: ImportServices) -> Self {
        Self {
            parser: Arc::new(parser),
            services,
            hook: None,
        }
    }

    /// Observe partition decisions
    pub fn with_hook(mut self, hook: Arc<dyn PartitionHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn parser(&self) -> &P {
        &self.parser
    }

    /// Everything that must hold before any work is dispatched
    fn check(&self, request: &ImportRequest<P::Item>) -> ImportResult<()> {
        self.services.config.validate()?;

        if request.kind() != self.parser.kind() {
            return Err(ImportError::InvalidPolicy {
                kind: request.kind(),
                reason: format!("request cannot be handled by a {} parser", self.parser.kind()),
            });
        }

        request
            .policy()
            .validate_for(request.kind())
            .map_err(|reason| ImportError::InvalidPolicy {
                kind: request.kind(),
                reason,
            })
    }

    /// Run one import request to completion or cancellation
    ///
    /// # Errors
    /// Only startup failures (reported once through
    /// [`ErrorPresentation::present_fatal`]) and a crashed worker task.
    /// Per-item failures and cancellation are part of the returned report.
    pub async fn run(
        &self,
        request: ImportRequest<P::Item>,
        cancel: CancellationToken,
    ) -> ImportResult<ImportReport<P::Output>> {
        let kind = request.kind();
        let import_id = request.id();
        let total = request.len();

        if let Err(e) = self.check(&request) {
            return Err(self.services.fatal(kind, e));
        }
        let pool = self
            .services
            .pools
            .pool_for(kind)
            .map_err(|e| self.services.fatal(kind, e))?;

        let config = &self.services.config;
        let tuning = config.partition.for_kind(kind);
        let rate = NonZeroU32::new(config.progress.max_events_per_second).unwrap_or(NonZeroU32::MIN);

        let reporter = Arc::new(EventProgressReporter::new(
            self.services.event_bus.clone(),
            import_id,
            total,
        ));
        let progress = Arc::new(ProgressTracker::new(total, reporter, rate));
        let errors = Arc::new(ErrorCollector::new());
        let started_at = Utc::now();

        tracing::info!(
            %import_id,
            %kind,
            total,
            threshold = tuning.threshold,
            partitions = tuning.partitions,
            workers = pool.current_num_threads(),
            "Starting import"
        );
        self.services.event_bus.emit_lossy(ImportEvent::ImportStarted {
            import_id,
            kind,
            total,
            timestamp: started_at,
        });

        let outcome = {
            let parser = Arc::clone(&self.parser);
            let hook = self.hook.clone();
            let items = request.shared_items();
            let policy = request.policy();
            let progress = Arc::clone(&progress);
            let errors = Arc::clone(&errors);
            let cancel = cancel.clone();

            tokio::task::spawn_blocking(move || {
                pool.install(|| {
                    let ctx = ImportContext {
                        progress: &progress,
                        errors: &errors,
                        cancel: &cancel,
                        hook: hook.as_deref(),
                    };
                    PartitionAction::new(parser.as_ref(), &policy, tuning, ctx)
                        .compute(PartitionNode::root(&items[..]))
                })
            })
            .await
            .map_err(|e| {
                tracing::error!(%import_id, "Import worker task failed: {}", e);
                ImportError::Worker(e.to_string())
            })?
        };

        let elapsed = progress.state().elapsed();
        let ended_at = Utc::now();
        let status = outcome.status;
        let elapsed_text = finished_message(elapsed, status.is_cancelled());

        if status.is_cancelled() {
            tracing::info!(
                %import_id,
                processed = outcome.processed(),
                total,
                "Import cancelled, partial result not delivered"
            );
        } else {
            outcome
                .result
                .deliver(self.services.sink.as_ref(), request.priority());
        }

        progress.message(&elapsed_text);
        self.services.event_bus.emit_lossy(ImportEvent::ImportFinished {
            import_id,
            status,
            elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            elapsed_text: elapsed_text.clone(),
            timestamp: ended_at,
        });

        let error_messages = errors.drain();
        self.services
            .presentation
            .present_errors(import_id, &error_messages);

        let report = ImportReport {
            import_id,
            kind,
            status,
            total,
            outcome,
            started_at,
            ended_at,
            elapsed,
            elapsed_text,
        };
        tracing::info!(%import_id, "{}", report.summary());

        Ok(report)
    }
}
