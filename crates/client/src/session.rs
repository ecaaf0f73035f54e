//! Single-owner generation session.
//!
//! [`GenerationSession`] drives at most one poller task. Starting a new
//! generation first stops the previous poller, and every state write is
//! tagged with the run it belongs to, so a late write from a stopped
//! poller never lands on the new run's state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use storyreel_core::job::CreateJobRequest;
use storyreel_core::session::GenerationState;
use storyreel_core::types::JobId;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::EngineApiError;
use crate::engine::JobEngine;
use crate::events::PollEvent;
use crate::poller::{JobPoller, PollOutcome};

struct SharedState {
    tx: watch::Sender<GenerationState>,
    /// Incremented on every start and reset.
    run: AtomicU64,
}

impl SharedState {
    /// Apply `f` only if `run` is still the current run.
    fn update(&self, run: u64, f: impl FnOnce(&mut GenerationState)) {
        self.tx.send_if_modified(|state| {
            if self.run.load(Ordering::SeqCst) != run {
                return false;
            }
            f(state);
            true
        });
    }

    fn next_run(&self) -> u64 {
        self.run.fetch_add(1, Ordering::SeqCst) + 1
    }
}

struct ActivePoll {
    job_id: JobId,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct GenerationSession {
    engine: Arc<dyn JobEngine>,
    poller: JobPoller,
    shared: Arc<SharedState>,
    active: Mutex<Option<ActivePoll>>,
}

impl GenerationSession {
    pub fn new(poller: JobPoller, engine: Arc<dyn JobEngine>) -> Self {
        let (tx, _) = watch::channel(GenerationState::default());
        Self {
            engine,
            poller,
            shared: Arc::new(SharedState {
                tx,
                run: AtomicU64::new(0),
            }),
            active: Mutex::new(None),
        }
    }

    /// Receive every state change.
    pub fn subscribe(&self) -> watch::Receiver<GenerationState> {
        self.shared.tx.subscribe()
    }

    /// Current state snapshot.
    pub fn state(&self) -> GenerationState {
        self.shared.tx.borrow().clone()
    }

    /// Stop any previous generation, create a job and start polling it.
    pub async fn start(&self, request: CreateJobRequest) -> Result<JobId, EngineApiError> {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            tracing::info!(job_id = %previous.job_id, "Replacing previous generation");
            previous.cancel.cancel();
        }

        let run = self.shared.next_run();
        self.shared.update(run, GenerationState::starting);

        let created = match self.engine.create_job(&request).await {
            Ok(created) => created,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create job");
                let message = e.to_string();
                self.shared.update(run, move |s| s.fail(message));
                return Err(e);
            }
        };

        let job_id = created.job_id;
        tracing::info!(job_id = %job_id, "Job created");
        self.shared.update(run, |s| s.begin(job_id.clone()));

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(drive(
            self.poller.clone(),
            Arc::clone(&self.shared),
            run,
            job_id.clone(),
            cancel.clone(),
        ));

        *active = Some(ActivePoll {
            job_id: job_id.clone(),
            cancel,
            handle,
        });
        Ok(job_id)
    }

    /// Stop polling and ask the engine to cancel the job.
    ///
    /// The engine request is best effort; a failure is only logged.
    pub async fn cancel(&self) {
        let Some(previous) = self.active.lock().await.take() else {
            return;
        };
        previous.cancel.cancel();

        let run = self.shared.run.load(Ordering::SeqCst);
        self.shared.update(run, |s| {
            if !s.phase.is_finished() {
                s.cancelled();
            }
        });

        if let Err(e) = self.engine.cancel_job(&previous.job_id).await {
            tracing::warn!(job_id = %previous.job_id, error = %e, "Engine cancel request failed");
        }
    }

    /// Stop polling and return to the initial state.
    pub async fn reset(&self) {
        if let Some(previous) = self.active.lock().await.take() {
            previous.cancel.cancel();
        }
        let run = self.shared.next_run();
        self.shared.update(run, GenerationState::reset);
    }

    /// Wait for the current run's poller task to exit.
    pub async fn join(&self) {
        let handle = self.active.lock().await.take().map(|a| a.handle);
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Poller task panicked");
            }
        }
    }
}

impl Drop for GenerationSession {
    fn drop(&mut self) {
        if let Some(active) = self.active.get_mut().take() {
            active.cancel.cancel();
        }
    }
}

/// Poller task body: feed observations into the state and record the
/// outcome.
async fn drive(
    poller: JobPoller,
    shared: Arc<SharedState>,
    run: u64,
    job_id: JobId,
    cancel: CancellationToken,
) {
    let outcome = poller
        .run(&job_id, &cancel, |event| {
            if let PollEvent::Observed(job) = event {
                shared.update(run, |s| s.apply_job(&job));
            }
        })
        .await;

    shared.update(run, |s| match outcome {
        PollOutcome::Completed { result, .. } => s.complete(result),
        PollOutcome::Failed { job } => {
            s.apply_job(&job);
            let error = job.error.unwrap_or_else(|| "Job failed".to_string());
            s.fail(error);
        }
        PollOutcome::Cancelled { job } => {
            s.apply_job(&job);
            s.cancelled();
        }
        PollOutcome::GaveUp { error, .. } => s.fail(error),
        PollOutcome::ContractViolation(message) => s.fail(message),
        PollOutcome::Aborted => {}
    });
}
