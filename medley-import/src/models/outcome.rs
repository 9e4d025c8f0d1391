//! Partial and final parse outcomes
//!
//! A [`ParseOutcome`] is owned by the partition branch that produced it until
//! it is merged into its parent. Merging is associative; keyed collections
//! are order-independent and keep the first record seen for a key.

use super::item_failure::{FailureKind, ItemFailure};
use crate::library::LibrarySink;
use medley_common::events::ImportStatus;
use std::collections::BTreeMap;

/// Keyed result collection produced by one parser kind
pub trait CatalogueResult: Default + Send {
    /// Record type inserted by leaf parsing
    type Record: Send;

    /// Insert one record; returns `false` when its key is already present
    /// and the record was skipped.
    fn insert(&mut self, record: Self::Record) -> bool;

    /// Merge another partial result into this one; returns the number of
    /// incoming records skipped as duplicates.
    fn merge(&mut self, other: Self) -> usize;

    /// Number of distinct records
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hand the fully merged result to the catalogue
    ///
    /// The result stays with the caller and is reported back afterwards.
    fn deliver(&self, sink: &dyn LibrarySink, priority: bool);
}

/// Merged records plus per-item failures and not-found items
#[derive(Debug, Clone)]
pub struct ParseOutcome<R> {
    /// Keyed records
    pub result: R,

    /// Per-item failures (everything except missing backing files)
    pub errors: Vec<ItemFailure>,

    /// Source ids whose declared backing file no longer exists
    pub not_found: Vec<String>,

    /// Items parsed successfully, duplicates included
    pub succeeded: usize,

    /// Successfully parsed items skipped because their key already existed
    pub duplicates: usize,

    /// `Cancelled` if any branch observed cancellation
    pub status: ImportStatus,
}

impl<R: Default> Default for ParseOutcome<R> {
    fn default() -> Self {
        Self {
            result: R::default(),
            errors: Vec::new(),
            not_found: Vec::new(),
            succeeded: 0,
            duplicates: 0,
            status: ImportStatus::Completed,
        }
    }
}

impl<R: CatalogueResult> ParseOutcome<R> {
    /// Merge a sibling outcome into this one
    pub fn merge(&mut self, other: Self) {
        self.duplicates += other.duplicates + self.result.merge(other.result);
        self.succeeded += other.succeeded;
        self.errors.extend(other.errors);
        self.not_found.extend(other.not_found);
        if other.status.is_cancelled() {
            self.status = ImportStatus::Cancelled;
        }
    }

    /// Items accounted for: `succeeded + errors + not_found`
    pub fn processed(&self) -> usize {
        self.succeeded + self.errors.len() + self.not_found.len()
    }

    /// Number of distinct records produced
    pub fn records(&self) -> usize {
        self.result.len()
    }

    /// Formatted failure descriptions
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// Failure counts grouped by class
    pub fn failures_by_kind(&self) -> BTreeMap<FailureKind, usize> {
        let mut counts = BTreeMap::new();
        for failure in &self.errors {
            *counts.entry(failure.kind).or_insert(0) += 1;
        }
        if !self.not_found.is_empty() {
            counts.insert(FailureKind::BackingFileMissing, self.not_found.len());
        }
        counts
    }
}
