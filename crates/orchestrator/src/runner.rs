//! Execution of a single batch item.
//!
//! The orchestrator only sequences items; running one is delegated to an
//! [`ItemRunner`]. [`EngineItemRunner`] runs an item as a job on the
//! execution engine and follows it with the job poller.

use std::sync::Arc;

use async_trait::async_trait;
use storyreel_client::engine::JobEngine;
use storyreel_client::events::PollEvent;
use storyreel_client::poller::{JobPoller, PollOutcome};
use storyreel_core::batch::BatchItem;
use storyreel_core::job::CreateJobRequest;
use storyreel_core::types::JobId;
use tokio_util::sync::CancellationToken;

/// Why an item did not complete.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ItemError {
    /// The item itself failed. Recorded on the item; the batch continues.
    #[error("{0}")]
    Item(String),

    /// The batch was cancelled while the item was running.
    #[error("item cancelled")]
    Cancelled,

    /// The execution engine is unusable. Fails the whole batch.
    #[error("{0}")]
    Infrastructure(String),
}

/// What a completed item produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemOutput {
    pub job_id: Option<JobId>,
    pub video_path: Option<String>,
}

/// Batch-level settings passed to every item.
#[derive(Debug, Clone, Default)]
pub struct ItemContext {
    pub channel_id: Option<String>,
    pub config_override: Option<serde_json::Value>,
}

/// Receives updates about the running item.
pub trait ItemReporter: Send + Sync {
    /// The engine accepted the item as job `job_id`.
    fn job_started(&self, job_id: &str);

    /// The job advanced.
    fn progress(&self, progress: f64, current_step: &str);
}

#[async_trait]
pub trait ItemRunner: Send + Sync {
    /// Run `item` to a terminal outcome. Must return promptly with
    /// [`ItemError::Cancelled`] once `cancel` fires.
    async fn run_item(
        &self,
        item: &BatchItem,
        context: &ItemContext,
        reporter: &dyn ItemReporter,
        cancel: &CancellationToken,
    ) -> Result<ItemOutput, ItemError>;
}

// ---------------------------------------------------------------------------
// Engine-backed runner
// ---------------------------------------------------------------------------

pub struct EngineItemRunner {
    engine: Arc<dyn JobEngine>,
    poller: JobPoller,
}

impl EngineItemRunner {
    pub fn new(engine: Arc<dyn JobEngine>, poller: JobPoller) -> Self {
        Self { engine, poller }
    }
}

#[async_trait]
impl ItemRunner for EngineItemRunner {
    async fn run_item(
        &self,
        item: &BatchItem,
        context: &ItemContext,
        reporter: &dyn ItemReporter,
        cancel: &CancellationToken,
    ) -> Result<ItemOutput, ItemError> {
        if item.text.trim().is_empty() {
            return Err(ItemError::Item("empty text".into()));
        }

        let request = CreateJobRequest {
            text: item.text.clone(),
            title: Some(item.title.clone()),
            channel_id: context.channel_id.clone(),
            config_override: context.config_override.clone(),
        };

        let created = self.engine.create_job(&request).await.map_err(|e| {
            if e.is_unreachable() {
                ItemError::Infrastructure(e.to_string())
            } else {
                ItemError::Item(e.to_string())
            }
        })?;

        let job_id = created.job_id;
        reporter.job_started(&job_id);
        tracing::info!(item_id = %item.id, job_id = %job_id, "Item job created");

        let outcome = self
            .poller
            .run(&job_id, cancel, |event| {
                if let PollEvent::Observed(job) = event {
                    reporter.progress(job.progress, &job.current_step);
                }
            })
            .await;

        match outcome {
            PollOutcome::Completed { result, .. } => Ok(ItemOutput {
                job_id: Some(job_id),
                video_path: result.video_path,
            }),
            PollOutcome::Failed { job } => Err(ItemError::Item(
                job.error.unwrap_or_else(|| "Job failed".to_string()),
            )),
            PollOutcome::Cancelled { .. } => Err(ItemError::Item("Job cancelled by engine".into())),
            PollOutcome::ContractViolation(message) => Err(ItemError::Item(message)),
            PollOutcome::GaveUp {
                error,
                unreachable: true,
                ..
            } => Err(ItemError::Infrastructure(format!(
                "Lost contact with execution engine: {error}"
            ))),
            PollOutcome::GaveUp { error, .. } => Err(ItemError::Item(format!(
                "Gave up polling job {job_id}: {error}"
            ))),
            PollOutcome::Aborted => {
                if let Err(e) = self.engine.cancel_job(&job_id).await {
                    tracing::warn!(job_id = %job_id, error = %e, "Engine cancel request failed");
                }
                Err(ItemError::Cancelled)
            }
        }
    }
}
