//! Batch service: creates batches and owns one orchestrator task per
//! running batch.
//!
//! Mirrors a connection manager: running batches are indexed by id, each
//! with its own task handle and control handle, and [`BatchService::shutdown`]
//! stops them all.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use storyreel_core::batch::{
    estimated_total_duration, prepare_items, Batch, BatchListResponse, BatchStatus,
    CreateBatchRequest, CreateBatchResponse,
};
use storyreel_core::error::CoreError;
use storyreel_core::estimation::{analyze_batch, BatchAnalysis};
use storyreel_core::types::BatchId;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::control::BatchControl;
use crate::orchestrator::BatchOrchestrator;
use crate::runner::ItemRunner;
use crate::store::BatchStore;

/// How long to wait for an orchestrator task to exit after cancelling it.
const TASK_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Bookkeeping for one running batch.
struct ManagedBatch {
    control: Arc<BatchControl>,
    /// Fired when the task exits.
    done: CancellationToken,
    task_handle: tokio::task::JoinHandle<()>,
}

type RunningBatches = Arc<RwLock<HashMap<BatchId, ManagedBatch>>>;

pub struct BatchService {
    store: Arc<BatchStore>,
    orchestrator: Arc<BatchOrchestrator>,
    running: RunningBatches,
}

impl BatchService {
    pub fn new(store: Arc<BatchStore>, runner: Arc<dyn ItemRunner>) -> Self {
        let orchestrator = Arc::new(BatchOrchestrator::new(Arc::clone(&store), runner));
        Self {
            store,
            orchestrator,
            running: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn store(&self) -> &Arc<BatchStore> {
        &self.store
    }

    /// Estimate a batch without creating it.
    pub fn analyze(&self, request: &CreateBatchRequest) -> Result<BatchAnalysis, CoreError> {
        analyze_batch(&request.items)
    }

    /// Validate, store and start processing a new batch.
    pub async fn create(&self, request: CreateBatchRequest) -> Result<CreateBatchResponse, CoreError> {
        let batch_id = uuid::Uuid::new_v4().to_string();
        let items = prepare_items(&batch_id, &request.items)?;
        let estimated = estimated_total_duration(&items);
        let total_items = items.len();

        let mut batch = Batch::new(batch_id.clone(), request.name, items, Utc::now());
        batch.channel_id = request.channel_id;
        batch.config_override = request.config_override;
        self.store.insert(batch);

        tracing::info!(batch_id = %batch_id, total_items, "Batch created");
        self.spawn(batch_id.clone()).await;

        Ok(CreateBatchResponse {
            batch_id,
            status: BatchStatus::Pending,
            total_items,
            estimated_total_duration_seconds: estimated,
            message: format!("Batch created with {total_items} scripts"),
        })
    }

    pub fn get(&self, batch_id: &str) -> Result<Batch, CoreError> {
        self.store.get(batch_id).ok_or_else(|| not_found(batch_id))
    }

    pub fn list(&self, status: Option<BatchStatus>, limit: usize) -> BatchListResponse {
        self.store.list(status, limit)
    }

    /// Request a pause. The running item finishes first; the batch shows
    /// `paused` once it has.
    pub async fn pause(&self, batch_id: &str) -> Result<Batch, CoreError> {
        let batch = self.get(batch_id)?;
        if !matches!(batch.status, BatchStatus::Pending | BatchStatus::Processing) {
            return Err(CoreError::Conflict(format!(
                "Cannot pause a batch that is {}",
                batch.status
            )));
        }

        self.control(batch_id).await?.pause();
        tracing::info!(batch_id, "Batch pause requested");
        Ok(batch)
    }

    /// Resume a paused batch, or withdraw a pause request that has not
    /// taken effect yet.
    pub async fn resume(&self, batch_id: &str) -> Result<Batch, CoreError> {
        let batch = self.get(batch_id)?;
        let control = self.control(batch_id).await.ok();
        let pause_pending = control.as_ref().is_some_and(|c| c.is_paused());

        if batch.status != BatchStatus::Paused && !pause_pending {
            return Err(CoreError::Conflict(format!(
                "Cannot resume a batch that is {}",
                batch.status
            )));
        }

        let control = control.ok_or_else(|| not_running(batch_id))?;
        control.resume();
        tracing::info!(batch_id, "Batch resume requested");
        Ok(batch)
    }

    /// Cancel a batch. Pending items are skipped and the running item is
    /// abandoned.
    pub async fn cancel(&self, batch_id: &str) -> Result<Batch, CoreError> {
        let batch = self.get(batch_id)?;
        if batch.status.is_terminal() {
            return Err(CoreError::Conflict(format!(
                "Cannot cancel a batch that is {}",
                batch.status
            )));
        }

        self.control(batch_id).await?.cancel();
        tracing::info!(batch_id, "Batch cancel requested");
        Ok(batch)
    }

    /// Stop a running batch if needed, then remove it.
    pub async fn delete(&self, batch_id: &str) -> Result<(), CoreError> {
        if self.store.get(batch_id).is_none() {
            return Err(not_found(batch_id));
        }

        let managed = self.running.write().await.remove(batch_id);
        if let Some(managed) = managed {
            managed.control.cancel();
            let _ = tokio::time::timeout(TASK_STOP_TIMEOUT, managed.task_handle).await;
        }

        self.store.remove(batch_id);
        tracing::info!(batch_id, "Batch deleted");
        Ok(())
    }

    /// Wait for a batch's orchestrator task to exit.
    pub async fn wait(&self, batch_id: &str) {
        let done = self
            .running
            .read()
            .await
            .get(batch_id)
            .map(|m| m.done.clone());

        if let Some(done) = done {
            done.cancelled().await;
        }
    }

    /// Cancel every running batch and wait for the tasks to exit.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down batch service");

        let drained: Vec<_> = self.running.write().await.drain().collect();
        for (id, managed) in drained {
            tracing::info!(batch_id = %id, "Stopping batch task");
            managed.control.cancel();
            let _ = tokio::time::timeout(TASK_STOP_TIMEOUT, managed.task_handle).await;
        }

        tracing::info!("Batch service shut down complete");
    }

    // ---- private helpers ----

    async fn control(&self, batch_id: &str) -> Result<Arc<BatchControl>, CoreError> {
        self.running
            .read()
            .await
            .get(batch_id)
            .map(|m| Arc::clone(&m.control))
            .ok_or_else(|| not_running(batch_id))
    }

    /// Spawn the orchestrator task for `batch_id`.
    async fn spawn(&self, batch_id: BatchId) {
        let control = Arc::new(BatchControl::new());
        let orchestrator = Arc::clone(&self.orchestrator);
        let running = Arc::clone(&self.running);
        let task_control = Arc::clone(&control);
        let task_id = batch_id.clone();
        let done = CancellationToken::new();
        let task_done = done.clone();

        // Held until the entry is inserted so the task cannot remove itself
        // first.
        let mut guard = self.running.write().await;

        let task_handle = tokio::spawn(async move {
            match orchestrator.run(&task_id, &task_control).await {
                Ok(status) => {
                    tracing::info!(batch_id = %task_id, status = %status, "Batch task exited");
                }
                Err(e) => {
                    tracing::error!(batch_id = %task_id, error = %e, "Batch task failed");
                }
            }
            running.write().await.remove(&task_id);
            task_done.cancel();
        });

        guard.insert(
            batch_id,
            ManagedBatch {
                control,
                done,
                task_handle,
            },
        );
    }
}

fn not_found(batch_id: &str) -> CoreError {
    CoreError::NotFound {
        entity: "batch",
        id: batch_id.to_string(),
    }
}

fn not_running(batch_id: &str) -> CoreError {
    CoreError::Conflict(format!("Batch {batch_id} is not running"))
}
