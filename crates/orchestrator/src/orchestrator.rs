//! Sequential batch processing.
//!
//! [`BatchOrchestrator::run`] walks a batch's items in order, one at a time.
//! It is the only writer of batch and item status while the batch runs.
//! Pause and cancel requests are read from [`BatchControl`] between items;
//! a pause lets the running item finish, a cancel also interrupts it.

use std::sync::Arc;

use chrono::Utc;
use storyreel_core::batch::{Batch, BatchItemStatus, BatchStatus};
use storyreel_core::error::CoreError;

use crate::control::BatchControl;
use crate::runner::{ItemContext, ItemError, ItemOutput, ItemReporter, ItemRunner};
use crate::store::BatchStore;

/// Item errors are truncated to this many characters.
const MAX_ITEM_ERROR_CHARS: usize = 500;

const STEP_STARTING: &str = "Starting";
const STEP_COMPLETED: &str = "Completed";
const STEP_FAILED: &str = "Error";
const STEP_SKIPPED: &str = "Skipped";

pub struct BatchOrchestrator {
    store: Arc<BatchStore>,
    runner: Arc<dyn ItemRunner>,
}

impl BatchOrchestrator {
    pub fn new(store: Arc<BatchStore>, runner: Arc<dyn ItemRunner>) -> Self {
        Self { store, runner }
    }

    /// Process `batch_id` from its `current_item_index` until the queue is
    /// exhausted, the batch is cancelled, or the engine becomes unusable.
    ///
    /// Returns the final batch status.
    pub async fn run(&self, batch_id: &str, control: &BatchControl) -> Result<BatchStatus, CoreError> {
        let batch = self.write(batch_id, |b| {
            b.status = BatchStatus::Processing;
            b.started_at.get_or_insert_with(Utc::now);
        })?;

        tracing::info!(
            batch_id,
            total_items = batch.total_items(),
            "Batch processing started",
        );

        let context = ItemContext {
            channel_id: batch.channel_id.clone(),
            config_override: batch.config_override.clone(),
        };
        let total = batch.total_items();
        let mut index = batch.current_item_index;

        loop {
            if control.is_cancelled() {
                return self.finish_cancelled(batch_id);
            }

            if index >= total {
                break;
            }

            if control.is_paused() {
                self.write(batch_id, |b| b.status = BatchStatus::Paused)?;
                tracing::info!(batch_id, next_item = index, "Batch paused");

                if !control.wait_until_resumed().await {
                    return self.finish_cancelled(batch_id);
                }

                self.write(batch_id, |b| b.status = BatchStatus::Processing)?;
                tracing::info!(batch_id, next_item = index, "Batch resumed");
            }

            let item = self
                .write(batch_id, |b| {
                    b.current_item_index = index;
                    let item = &mut b.items[index];
                    item.status = BatchItemStatus::Processing;
                    item.started_at = Some(Utc::now());
                    item.current_step = STEP_STARTING.to_string();
                })?
                .items[index]
                .clone();

            tracing::info!(
                batch_id,
                item_id = %item.id,
                position = index + 1,
                total,
                "Processing batch item",
            );

            let reporter = StoreReporter {
                store: &self.store,
                batch_id,
                index,
            };
            let outcome = self
                .runner
                .run_item(&item, &context, &reporter, control.cancel_token())
                .await;

            match outcome {
                Ok(output) => self.record_success(batch_id, index, output)?,
                Err(ItemError::Item(message)) => self.record_failure(batch_id, index, &message)?,
                Err(ItemError::Cancelled) => {
                    self.write(batch_id, |b| {
                        let item = &mut b.items[index];
                        item.status = BatchItemStatus::Skipped;
                        item.current_step = STEP_SKIPPED.to_string();
                        item.error = Some("Cancelled while processing".to_string());
                        item.completed_at = Some(Utc::now());
                    })?;
                    return self.finish_cancelled(batch_id);
                }
                Err(ItemError::Infrastructure(message)) => {
                    self.record_failure(batch_id, index, &message)?;
                    return self.finish_failed(batch_id, &message);
                }
            }

            index += 1;
            self.write(batch_id, |b| {
                b.current_item_index = index;
                b.refresh_progress();
            })?;
        }

        let batch = self.write(batch_id, |b| {
            b.status = BatchStatus::Completed;
            b.current_item_index = b.total_items();
            b.completed_at = Some(Utc::now());
            b.refresh_progress();
        })?;

        tracing::info!(
            batch_id,
            completed = batch.completed_items,
            failed = batch.failed_items,
            "Batch finished",
        );
        Ok(BatchStatus::Completed)
    }

    // ---- private helpers ----

    fn write<F>(&self, batch_id: &str, f: F) -> Result<Batch, CoreError>
    where
        F: FnOnce(&mut Batch),
    {
        self.store.update(batch_id, f).ok_or_else(|| CoreError::NotFound {
            entity: "batch",
            id: batch_id.to_string(),
        })
    }

    fn record_success(&self, batch_id: &str, index: usize, output: ItemOutput) -> Result<(), CoreError> {
        let batch = self.write(batch_id, |b| {
            let now = Utc::now();
            let item = &mut b.items[index];
            item.status = BatchItemStatus::Completed;
            item.progress = 1.0;
            item.current_step = STEP_COMPLETED.to_string();
            item.completed_at = Some(now);
            item.duration_seconds = item
                .started_at
                .map(|started| (now - started).num_milliseconds() as f64 / 1000.0);
            if output.job_id.is_some() {
                item.job_id = output.job_id;
            }
            item.video_path = output.video_path;
            b.completed_items += 1;
        })?;

        tracing::info!(
            batch_id,
            item_id = %batch.items[index].id,
            video_path = ?batch.items[index].video_path,
            "Batch item completed",
        );
        Ok(())
    }

    fn record_failure(&self, batch_id: &str, index: usize, message: &str) -> Result<(), CoreError> {
        let error: String = message.chars().take(MAX_ITEM_ERROR_CHARS).collect();
        let batch = self.write(batch_id, |b| {
            let now = Utc::now();
            let item = &mut b.items[index];
            item.status = BatchItemStatus::Failed;
            item.current_step = STEP_FAILED.to_string();
            item.completed_at = Some(now);
            item.duration_seconds = item
                .started_at
                .map(|started| (now - started).num_milliseconds() as f64 / 1000.0);
            item.error = Some(error);
            b.failed_items += 1;
        })?;

        tracing::warn!(
            batch_id,
            item_id = %batch.items[index].id,
            error = message,
            "Batch item failed",
        );
        Ok(())
    }

    fn finish_cancelled(&self, batch_id: &str) -> Result<BatchStatus, CoreError> {
        let batch = self.write(batch_id, |b| {
            skip_pending(b);
            b.status = BatchStatus::Cancelled;
            b.completed_at = Some(Utc::now());
            b.refresh_progress();
        })?;

        tracing::info!(
            batch_id,
            completed = batch.completed_items,
            skipped = batch.skipped_items(),
            "Batch cancelled",
        );
        Ok(BatchStatus::Cancelled)
    }

    fn finish_failed(&self, batch_id: &str, message: &str) -> Result<BatchStatus, CoreError> {
        self.write(batch_id, |b| {
            skip_pending(b);
            b.status = BatchStatus::Failed;
            b.error = Some(message.to_string());
            b.completed_at = Some(Utc::now());
            b.refresh_progress();
        })?;

        tracing::error!(batch_id, error = message, "Batch failed");
        Ok(BatchStatus::Failed)
    }
}

fn skip_pending(batch: &mut Batch) {
    for item in &mut batch.items {
        if item.status == BatchItemStatus::Pending {
            item.status = BatchItemStatus::Skipped;
            item.current_step = STEP_SKIPPED.to_string();
        }
    }
}

/// Writes running-item updates straight into the store.
struct StoreReporter<'a> {
    store: &'a BatchStore,
    batch_id: &'a str,
    index: usize,
}

impl ItemReporter for StoreReporter<'_> {
    fn job_started(&self, job_id: &str) {
        self.store.update(self.batch_id, |b| {
            b.items[self.index].job_id = Some(job_id.to_string());
        });
    }

    fn progress(&self, progress: f64, current_step: &str) {
        self.store.update(self.batch_id, |b| {
            let item = &mut b.items[self.index];
            item.progress = progress;
            if !current_step.is_empty() {
                item.current_step = current_step.to_string();
            }
        });
    }
}
