//! Fixed-interval refresh of a batch detail view.
//!
//! Unlike the job poller there is no backoff and no error budget: a stale
//! dashboard is acceptable, so failed fetches are logged and retried on the
//! next tick.

use std::sync::Arc;
use std::time::Duration;

use storyreel_core::batch::Batch;
use tokio_util::sync::CancellationToken;

use crate::engine::BatchSource;

/// Why a watch stopped.
#[derive(Debug, Clone)]
pub enum WatchOutcome {
    /// The batch reached a terminal status.
    Finished(Batch),
    /// The batch no longer exists.
    Gone,
    /// The view went away.
    Stopped,
}

pub struct BatchWatcher {
    source: Arc<dyn BatchSource>,
    interval: Duration,
}

impl BatchWatcher {
    pub fn new(source: Arc<dyn BatchSource>, interval: Duration) -> Self {
        Self { source, interval }
    }

    /// Refetch `batch_id` every interval while it is active, passing each
    /// fetched record to `on_update`.
    pub async fn run<F>(&self, batch_id: &str, cancel: &CancellationToken, mut on_update: F) -> WatchOutcome
    where
        F: FnMut(&Batch) + Send,
    {
        loop {
            if cancel.is_cancelled() {
                return WatchOutcome::Stopped;
            }

            match self.source.get_batch(batch_id).await {
                Ok(batch) => {
                    on_update(&batch);
                    if batch.status.is_terminal() {
                        tracing::debug!(batch_id, status = %batch.status, "Batch finished");
                        return WatchOutcome::Finished(batch);
                    }
                }
                Err(e) if e.is_not_found() => {
                    tracing::info!(batch_id, "Batch no longer exists");
                    return WatchOutcome::Gone;
                }
                Err(e) => {
                    tracing::warn!(batch_id, error = %e, "Batch refresh failed");
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => return WatchOutcome::Stopped,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}
