//! In-memory batch records.
//!
//! Batches live only as long as the process. The store is bounded: once it
//! holds more than `max_batches` records, the oldest finished batches are
//! evicted. Active batches are never evicted.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use storyreel_core::batch::{Batch, BatchListResponse, BatchStatus};
use storyreel_core::types::BatchId;

/// Default upper bound on stored batches.
pub const DEFAULT_MAX_BATCHES: usize = 20;

/// Default page size for [`BatchStore::list`].
pub const DEFAULT_LIST_LIMIT: usize = 20;

pub struct BatchStore {
    batches: RwLock<HashMap<BatchId, Batch>>,
    max_batches: usize,
}

impl Default for BatchStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BATCHES)
    }
}

impl BatchStore {
    pub fn new(max_batches: usize) -> Self {
        Self {
            batches: RwLock::new(HashMap::new()),
            max_batches,
        }
    }

    /// Store a new batch, evicting old finished batches if over capacity.
    pub fn insert(&self, batch: Batch) {
        let mut batches = self.batches.write().unwrap_or_else(PoisonError::into_inner);
        batches.insert(batch.id.clone(), batch);
        evict_finished(&mut batches, self.max_batches);
    }

    pub fn get(&self, batch_id: &str) -> Option<Batch> {
        self.batches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(batch_id)
            .cloned()
    }

    /// Apply `f` to a stored batch and return the updated copy.
    pub fn update<F>(&self, batch_id: &str, f: F) -> Option<Batch>
    where
        F: FnOnce(&mut Batch),
    {
        let mut batches = self.batches.write().unwrap_or_else(PoisonError::into_inner);
        let batch = batches.get_mut(batch_id)?;
        f(batch);
        Some(batch.clone())
    }

    pub fn remove(&self, batch_id: &str) -> Option<Batch> {
        self.batches
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(batch_id)
    }

    pub fn len(&self) -> usize {
        self.batches.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Summaries of stored batches, newest first, optionally filtered by
    /// status. `total` is the number of stored batches.
    pub fn list(&self, status: Option<BatchStatus>, limit: usize) -> BatchListResponse {
        let batches = self.batches.read().unwrap_or_else(PoisonError::into_inner);

        let mut matching: Vec<&Batch> = batches
            .values()
            .filter(|b| status.map_or(true, |s| b.status == s))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        BatchListResponse {
            batches: matching.into_iter().take(limit).map(Batch::summary).collect(),
            total: batches.len(),
        }
    }
}

fn evict_finished(batches: &mut HashMap<BatchId, Batch>, max_batches: usize) {
    if batches.len() <= max_batches {
        return;
    }

    let mut finished: Vec<(chrono::DateTime<chrono::Utc>, BatchId)> = batches
        .values()
        .filter(|b| b.status.is_terminal())
        .map(|b| (b.created_at, b.id.clone()))
        .collect();
    finished.sort();

    let excess = batches.len() - max_batches;
    for (_, id) in finished.into_iter().take(excess) {
        tracing::debug!(batch_id = %id, "Evicting finished batch");
        batches.remove(&id);
    }
}
