//! Per-kind worker pools
//!
//! Every source kind gets its own fixed-size rayon pool, built on first use
//! and shared by all requests of that kind. Pool size never depends on
//! request size.

use crate::error::{ImportError, ImportResult};
use medley_common::events::SourceKind;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Lazily built rayon pools, one per [`SourceKind`]
#[derive(Debug)]
pub struct WorkerPools {
    workers: usize,
    pools: Mutex<HashMap<SourceKind, Arc<rayon::ThreadPool>>>,
}

impl WorkerPools {
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            pools: Mutex::new(HashMap::new()),
        }
    }

    /// Threads per pool
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Pool for `kind`, building it if this is the first request of that kind
    pub fn pool_for(&self, kind: SourceKind) -> ImportResult<Arc<rayon::ThreadPool>> {
        let mut pools = self
            .pools
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(pool) = pools.get(&kind) {
            return Ok(Arc::clone(pool));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(move |idx| format!("import-{}-{}", kind, idx))
            .build()
            .map_err(|e| ImportError::WorkerPool(e.to_string()))?;
        let pool = Arc::new(pool);

        tracing::debug!(%kind, workers = self.workers, "Built worker pool");
        pools.insert(kind, Arc::clone(&pool));
        Ok(pool)
    }
}
