//! Job status poller.
//!
//! [`JobPoller::run`] fetches a job until it reaches a terminal status, the
//! error budget runs out, or the cancellation token fires. Fetches are
//! strictly sequential: the next one is scheduled only after the previous
//! one resolved. Cancellation is checked before each fetch and during each
//! sleep; an in-flight request is never aborted.

use std::sync::Arc;

use storyreel_core::job::{Job, JobObserver, JobResult, JobStatus};
use storyreel_core::retry::{ErrorBudget, ErrorClass, RetryDecision, RetryPolicy};
use tokio_util::sync::CancellationToken;

use crate::api::EngineApiError;
use crate::engine::JobEngine;
use crate::events::PollEvent;

/// How a polling session ended.
#[derive(Debug, Clone)]
pub enum PollOutcome {
    /// The job completed and its result was fetched.
    Completed { job: Job, result: JobResult },
    /// The engine reported the job failed; `job.error` carries the reason.
    Failed { job: Job },
    /// The engine reported the job cancelled.
    Cancelled { job: Job },
    /// The client stopped polling after exhausting its error budget. The
    /// job may still finish on the server.
    GaveUp {
        error: String,
        consecutive: u32,
        total: u32,
        /// The last error meant the engine itself could not be reached.
        unreachable: bool,
    },
    /// The engine reported an observation that breaks the job contract
    /// (status regression, progress out of range or going backward).
    ContractViolation(String),
    /// The cancellation token fired.
    Aborted,
}

/// A failed fetch together with its retry class.
#[derive(Debug, thiserror::Error)]
#[error("{source}")]
pub struct ClassifiedError {
    pub class: ErrorClass,
    #[source]
    pub source: EngineApiError,
}

impl From<EngineApiError> for ClassifiedError {
    fn from(source: EngineApiError) -> Self {
        Self {
            class: source.class(),
            source,
        }
    }
}

/// Polls one job at a time. Budgets and ordering checks live inside each
/// [`run`](Self::run) call, so a poller can be reused for successive jobs.
#[derive(Clone)]
pub struct JobPoller {
    engine: Arc<dyn JobEngine>,
    policy: RetryPolicy,
}

impl JobPoller {
    pub fn new(engine: Arc<dyn JobEngine>, policy: RetryPolicy) -> Self {
        Self { engine, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetch the job once.
    pub async fn poll_once(&self, job_id: &str) -> Result<Job, ClassifiedError> {
        Ok(self.engine.get_job(job_id).await?)
    }

    /// Poll `job_id` until it is terminal, the budget is spent or `cancel`
    /// fires. `on_event` sees every accepted observation and every retry.
    pub async fn run<F>(&self, job_id: &str, cancel: &CancellationToken, mut on_event: F) -> PollOutcome
    where
        F: FnMut(PollEvent) + Send,
    {
        let mut budget = ErrorBudget::new();
        let mut observer = JobObserver::new();

        tracing::info!(job_id, "Polling job");

        loop {
            if cancel.is_cancelled() {
                tracing::info!(job_id, "Polling cancelled");
                return PollOutcome::Aborted;
            }

            let failure = match self.poll_once(job_id).await {
                Ok(job) => {
                    budget.record_success();

                    if let Err(e) = observer.observe(&job) {
                        tracing::error!(job_id, error = %e, "Job contract violated");
                        return PollOutcome::ContractViolation(e.to_string());
                    }

                    tracing::debug!(
                        job_id,
                        status = %job.status,
                        progress = job.progress,
                        "Job observed",
                    );
                    on_event(PollEvent::Observed(job.clone()));

                    match job.status {
                        JobStatus::Completed => match self.engine.get_result(job_id).await {
                            Ok(result) => {
                                tracing::info!(job_id, "Job completed");
                                return PollOutcome::Completed { job, result };
                            }
                            Err(e) => Some(ClassifiedError::from(e)),
                        },
                        JobStatus::Failed => {
                            tracing::info!(job_id, error = ?job.error, "Job failed");
                            return PollOutcome::Failed { job };
                        }
                        JobStatus::Cancelled => {
                            tracing::info!(job_id, "Job cancelled");
                            return PollOutcome::Cancelled { job };
                        }
                        _ => None,
                    }
                }
                Err(e) => Some(e),
            };

            let delay = match failure {
                None => self.policy.base_interval,
                Some(err) => match budget.record_failure(err.class, &self.policy) {
                    RetryDecision::Retry(delay) => {
                        tracing::warn!(
                            job_id,
                            error = %err,
                            class = ?err.class,
                            consecutive = budget.consecutive(),
                            total = budget.total(),
                            delay_ms = delay.as_millis() as u64,
                            "Job fetch failed, retrying",
                        );
                        on_event(PollEvent::Retrying {
                            class: err.class,
                            consecutive: budget.consecutive(),
                            total: budget.total(),
                            delay,
                            error: err.to_string(),
                        });
                        delay
                    }
                    RetryDecision::GiveUp => {
                        tracing::error!(
                            job_id,
                            error = %err,
                            consecutive = budget.consecutive(),
                            total = budget.total(),
                            "Error budget exhausted, giving up",
                        );
                        return PollOutcome::GaveUp {
                            error: err.to_string(),
                            consecutive: budget.consecutive(),
                            total: budget.total(),
                            unreachable: err.source.is_unreachable(),
                        };
                    }
                },
            };

            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!(job_id, "Polling cancelled");
                    return PollOutcome::Aborted;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
