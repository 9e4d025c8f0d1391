//! Recursive partition action
//!
//! A batch larger than its kind's threshold is cut into `partitions`
//! contiguous slices that are computed in parallel on the current rayon
//! pool and merged back in slice order. Smaller batches are parsed in place,
//! one item after another.
//!
//! Per-item failures become data at the leaf and only ever travel upward
//! through [`ParseOutcome::merge`]. Cancellation is polled before every
//! partition step and every item.

use crate::models::{CatalogueResult, FailureReason, ImportPolicy, ItemFailure, ParseOutcome};
use crate::parsers::ItemParser;
use crate::services::error_collector::ErrorCollector;
use crate::services::progress::ProgressTracker;
use medley_common::config::PartitionTuning;
use medley_common::events::ImportStatus;
use rayon::prelude::*;
use std::panic::{self, AssertUnwindSafe};
use tokio_util::sync::CancellationToken;

/// Observer of partition decisions
///
/// Called from worker threads. Used to make fork behaviour visible in tests
/// and trace logs; the action never depends on it.
pub trait PartitionHook: Send + Sync {
    /// A node was split into `parts` children
    fn on_fork(&self, _node: NodeInfo, _parts: usize) {}

    /// A node was parsed in place
    fn on_leaf(&self, _node: NodeInfo) {}
}

/// Position of a node within the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeInfo {
    /// Recursion depth, 0 at the root
    pub depth: usize,
    /// Index of the node's first item in the request
    pub offset: usize,
    /// Items covered by the node
    pub len: usize,
}

/// One recursive step: a contiguous sub-range of the request's items
#[derive(Debug)]
pub struct PartitionNode<'a, T> {
    items: &'a [T],
    offset: usize,
    depth: usize,
}

impl<T> Clone for PartitionNode<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PartitionNode<'_, T> {}

impl<'a, T> PartitionNode<'a, T> {
    /// Node covering a whole request
    pub fn root(items: &'a [T]) -> Self {
        Self {
            items,
            offset: 0,
            depth: 0,
        }
    }

    pub fn items(&self) -> &'a [T] {
        self.items
    }

    pub fn info(&self) -> NodeInfo {
        NodeInfo {
            depth: self.depth,
            offset: self.offset,
            len: self.items.len(),
        }
    }

    /// Cut into `parts` contiguous children whose sizes differ by at most one
    ///
    /// Never produces empty children: fewer than `parts` children are
    /// returned when the node has fewer items than that.
    pub fn split(&self, parts: usize) -> Vec<PartitionNode<'a, T>> {
        let len = self.items.len();
        let parts = parts.clamp(1, len.max(1));
        let base = len / parts;
        let remainder = len % parts;

        let mut children = Vec::with_capacity(parts);
        let mut start = 0;
        for i in 0..parts {
            let size = base + usize::from(i < remainder);
            children.push(PartitionNode {
                items: &self.items[start..start + size],
                offset: self.offset + start,
                depth: self.depth + 1,
            });
            start += size;
        }
        children
    }
}

/// State shared by every node of one run
#[derive(Clone, Copy)]
pub struct ImportContext<'a> {
    pub progress: &'a ProgressTracker,
    pub errors: &'a ErrorCollector,
    pub cancel: &'a CancellationToken,
    pub hook: Option<&'a dyn PartitionHook>,
}

/// Fork/parse/merge over a request's items
pub struct PartitionAction<'a, P: ItemParser> {
    parser: &'a P,
    policy: &'a ImportPolicy,
    tuning: PartitionTuning,
    ctx: ImportContext<'a>,
}

impl<'a, P: ItemParser> PartitionAction<'a, P> {
    pub fn new(
        parser: &'a P,
        policy: &'a ImportPolicy,
        tuning: PartitionTuning,
        ctx: ImportContext<'a>,
    ) -> Self {
        Self {
            parser,
            policy,
            tuning,
            ctx,
        }
    }

    /// Compute the merged outcome of a node
    ///
    /// Must run inside the target rayon pool (`ThreadPool::install`).
    pub fn compute(&self, node: PartitionNode<'_, P::Item>) -> ParseOutcome<P::Output> {
        if self.ctx.cancel.is_cancelled() {
            return cancelled();
        }

        if node.items().len() <= self.tuning.threshold {
            return self.compute_leaf(node);
        }

        let children = node.split(self.tuning.partitions);
        tracing::trace!(
            depth = node.depth,
            offset = node.offset,
            len = node.items().len(),
            parts = children.len(),
            "Forking partition"
        );
        if let Some(hook) = self.ctx.hook {
            hook.on_fork(node.info(), children.len());
        }

        children
            .into_par_iter()
            .map(|child| self.compute(child))
            .reduce(ParseOutcome::<P::Output>::default, |mut left, right| {
                left.merge(right);
                left
            })
    }

    fn compute_leaf(&self, node: PartitionNode<'_, P::Item>) -> ParseOutcome<P::Output> {
        if let Some(hook) = self.ctx.hook {
            hook.on_leaf(node.info());
        }

        let mut outcome = ParseOutcome::<P::Output>::default();

        for item in node.items() {
            if self.ctx.cancel.is_cancelled() {
                outcome.status = ImportStatus::Cancelled;
                break;
            }

            match self.parse_isolated(item) {
                Ok(record) => {
                    outcome.succeeded += 1;
                    if !outcome.result.insert(record) {
                        outcome.duplicates += 1;
                    }
                }
                Err(FailureReason::BackingFileMissing(_)) => {
                    outcome.not_found.push(self.parser.source_id(item));
                }
                Err(reason) => {
                    let failure = ItemFailure::new(self.parser.source_id(item), &reason);
                    self.ctx.errors.record(failure.to_string());
                    outcome.errors.push(failure);
                }
            }

            self.ctx.progress.item_done();
        }

        outcome
    }

    /// Parse one item; a panicking parser fails only that item
    fn parse_isolated(
        &self,
        item: &P::Item,
    ) -> Result<crate::parsers::RecordOf<P>, FailureReason> {
        panic::catch_unwind(AssertUnwindSafe(|| self.parser.parse(item, self.policy)))
            .unwrap_or_else(|payload| {
                let detail = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(FailureReason::UnreadableOrCorruptMetadata(format!(
                    "parser panicked: {}",
                    detail
                )))
            })
    }
}

fn cancelled<R: Default>() -> ParseOutcome<R> {
    ParseOutcome {
        status: ImportStatus::Cancelled,
        ..ParseOutcome::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldSource, Track, TrackCatalogue};
    use crate::services::progress::ProgressReporter;
    use medley_common::events::SourceKind;
    use std::num::NonZeroU32;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Item `n` becomes track `/m/{n % modulo}.mp3`; multiples of 7 panic
    struct NumberParser {
        modulo: usize,
    }

    impl ItemParser for NumberParser {
        type Item = usize;
        type Output = TrackCatalogue;

        fn kind(&self) -> SourceKind {
            SourceKind::AudioFiles
        }

        fn source_id(&self, item: &usize) -> String {
            format!("item {}", item)
        }

        fn parse(&self, item: &usize, _: &ImportPolicy) -> Result<Track, FailureReason> {
            if item % 7 == 0 {
                panic!("bad item {}", item);
            }
            Ok(Track::at(
                format!("/m/{}.mp3", item % self.modulo),
                FieldSource::FileTags,
            ))
        }
    }

    struct Silent;

    impl ProgressReporter for Silent {
        fn report(&self, _: usize, _: usize) {}
        fn report_message(&self, _: &str) {}
    }

    #[derive(Default)]
    struct Counting {
        forks: AtomicUsize,
        leaves: Mutex<Vec<NodeInfo>>,
    }

    impl PartitionHook for Counting {
        fn on_fork(&self, _node: NodeInfo, _parts: usize) {
            self.forks.fetch_add(1, Ordering::SeqCst);
        }

        fn on_leaf(&self, node: NodeInfo) {
            self.leaves.lock().unwrap().push(node);
        }
    }

    fn run(items: &[usize], tuning: PartitionTuning, hook: &Counting) -> ParseOutcome<TrackCatalogue> {
        let progress = ProgressTracker::new(items.len(), Arc::new(Silent), NonZeroU32::new(100).unwrap());
        let errors = ErrorCollector::new();
        let cancel = CancellationToken::new();
        let ctx = ImportContext {
            progress: &progress,
            errors: &errors,
            cancel: &cancel,
            hook: Some(hook),
        };
        let parser = NumberParser { modulo: 1_000_000 };
        let policy = ImportPolicy::default();
        let outcome = PartitionAction::new(&parser, &policy, tuning, ctx).compute(PartitionNode::root(items));
        assert_eq!(progress.state().completed(), outcome.processed());
        assert_eq!(errors.len(), outcome.errors.len());
        outcome
    }

    #[test]
    fn test_split_sizes_differ_by_at_most_one() {
        let items: Vec<usize> = (0..10).collect();
        let children = PartitionNode::root(&items).split(4);

        let sizes: Vec<usize> = children.iter().map(|c| c.items().len()).collect();
        assert_eq!(sizes, vec![3, 3, 2, 2]);
        let offsets: Vec<usize> = children.iter().map(|c| c.info().offset).collect();
        assert_eq!(offsets, vec![0, 3, 6, 8]);
        assert!(children.iter().all(|c| c.info().depth == 1));

        let tiny = PartitionNode::root(&items[..2]).split(4);
        assert_eq!(tiny.len(), 2);
    }

    #[test]
    fn test_fork_trigger_at_threshold() {
        let tuning = PartitionTuning {
            threshold: 8,
            partitions: 2,
        };

        let at = Counting::default();
        run(&(1..=8).collect::<Vec<_>>(), tuning, &at);
        assert_eq!(at.forks.load(Ordering::SeqCst), 0);

        let above = Counting::default();
        run(&(1..=9).collect::<Vec<_>>(), tuning, &above);
        assert!(above.forks.load(Ordering::SeqCst) >= 1);
        assert!(above.leaves.lock().unwrap().iter().all(|n| n.len <= 8));
    }

    #[test]
    fn test_panicking_item_is_isolated() {
        let hook = Counting::default();
        let items: Vec<usize> = (1..=20).collect();
        let outcome = run(
            &items,
            PartitionTuning {
                threshold: 3,
                partitions: 4,
            },
            &hook,
        );

        assert_eq!(outcome.processed(), 20);
        assert_eq!(outcome.errors.len(), 2);
        assert!(outcome.errors.iter().all(|e| e.message.contains("parser panicked")));
        assert_eq!(outcome.records(), 18);
    }

    #[test]
    fn test_precancelled_run_processes_nothing() {
        let progress = ProgressTracker::new(5, Arc::new(Silent), NonZeroU32::new(10).unwrap());
        let errors = ErrorCollector::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let ctx = ImportContext {
            progress: &progress,
            errors: &errors,
            cancel: &cancel,
            hook: None,
        };
        let items = [1usize, 2, 3, 4, 5];
        let parser = NumberParser { modulo: 10 };
        let policy = ImportPolicy::default();

        let outcome = PartitionAction::new(
            &parser,
            &policy,
            PartitionTuning {
                threshold: 2,
                partitions: 2,
            },
            ctx,
        )
        .compute(PartitionNode::root(&items));

        assert!(outcome.status.is_cancelled());
        assert_eq!(outcome.processed(), 0);
    }
}
