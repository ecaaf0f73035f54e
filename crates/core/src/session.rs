//! Client-visible state of a single video generation.
//!
//! This is what a UI renders. It is owned by exactly one poller at a time;
//! the poller feeds it observations and terminal outcomes, observers only
//! read snapshots.

use serde::Serialize;

use crate::job::{Job, JobResult, JobStatus};
use crate::logs::LogLine;
use crate::progress::{step_views, StepDetails, StepView};
use crate::step::Step;
use crate::types::JobId;

/// Where the client believes the generation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Nothing started, or reset.
    Idle,
    /// Create-job request in flight.
    Starting,
    /// Job accepted, poller running.
    Running,
    Completed,
    /// The job failed on the server, or the client gave up polling.
    Failed,
    Cancelled,
}

impl SessionPhase {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationState {
    pub job_id: Option<JobId>,
    pub phase: SessionPhase,
    /// Last status reported by the engine.
    pub status: Option<JobStatus>,
    pub progress: f64,
    pub current_step: String,
    pub details: StepDetails,
    pub logs: Vec<LogLine>,
    pub error: Option<String>,
    pub result: Option<JobResult>,
    /// Last pipeline step observed, kept after the job leaves the pipeline.
    pub last_step: Option<Step>,
}

impl Default for GenerationState {
    fn default() -> Self {
        Self {
            job_id: None,
            phase: SessionPhase::Idle,
            status: None,
            progress: 0.0,
            current_step: String::new(),
            details: StepDetails::new(),
            logs: Vec::new(),
            error: None,
            result: None,
            last_step: None,
        }
    }
}

impl GenerationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to the initial state, whatever happened before.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// A create-job request is about to be sent.
    pub fn starting(&mut self) {
        self.reset();
        self.phase = SessionPhase::Starting;
    }

    /// The engine accepted the job.
    pub fn begin(&mut self, job_id: impl Into<JobId>) {
        self.job_id = Some(job_id.into());
        self.phase = SessionPhase::Running;
        self.status = Some(JobStatus::Pending);
    }

    /// Take in an accepted observation of the job.
    pub fn apply_job(&mut self, job: &Job) {
        self.status = Some(job.status);
        self.progress = job.progress;
        self.current_step = job.current_step.clone();
        self.details = job.details.clone();
        self.logs = job.logs.clone();
        if let Some(step) = job.status.step() {
            self.last_step = Some(step);
        }
        if job.status == JobStatus::Failed {
            self.error = job.error.clone();
        }
    }

    pub fn complete(&mut self, result: JobResult) {
        self.phase = SessionPhase::Completed;
        self.status = Some(JobStatus::Completed);
        self.progress = 1.0;
        self.result = Some(result);
    }

    /// Generation is over from the client's point of view. The server-side
    /// status is left as last observed.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.phase = SessionPhase::Failed;
        self.error = Some(error.into());
    }

    pub fn cancelled(&mut self) {
        self.phase = SessionPhase::Cancelled;
    }

    /// Display state of every pipeline step.
    pub fn step_views(&self) -> Vec<StepView> {
        let status = self.status.unwrap_or(JobStatus::Pending);
        step_views(status, &self.details, self.last_step)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::progress::StepState;

    fn observed(status: JobStatus, progress: f64) -> Job {
        Job {
            status,
            progress,
            logs: vec!["Split text into 2 chunks".into()],
            ..Job::pending("job-1", Utc::now())
        }
    }

    #[test]
    fn reset_restores_initial_state_from_any_phase() {
        let mut state = GenerationState::new();
        state.begin("job-1");
        state.apply_job(&observed(JobStatus::MergingAudio, 0.4));
        state.fail("gave up");

        state.reset();
        assert_eq!(state, GenerationState::default());
        assert_eq!(state.job_id, None);
        assert_eq!(state.progress, 0.0);
        assert!(state.logs.is_empty());
        assert!(state.error.is_none());

        state.reset();
        assert_eq!(state, GenerationState::default());
    }

    #[test]
    fn starting_clears_the_previous_run() {
        let mut state = GenerationState::new();
        state.begin("old");
        state.complete(JobResult {
            job_id: "old".into(),
            status: JobStatus::Completed,
            video_path: None,
            video_url: None,
            duration_seconds: None,
            scenes_count: None,
            file_size: None,
            processing_time_seconds: None,
        });

        state.starting();
        assert_eq!(state.phase, SessionPhase::Starting);
        assert!(state.result.is_none());
        assert!(state.job_id.is_none());
    }

    #[test]
    fn failed_job_error_is_exposed() {
        let mut state = GenerationState::new();
        state.begin("job-1");
        state.apply_job(&observed(JobStatus::GeneratingImages, 0.7));

        let mut failed = observed(JobStatus::Failed, 0.7);
        failed.error = Some("provider quota exceeded".into());
        state.apply_job(&failed);

        assert_eq!(state.error.as_deref(), Some("provider quota exceeded"));
        assert_eq!(state.last_step, Some(Step::GeneratingImages));

        let views = state.step_views();
        assert_eq!(views[6].state, StepState::Failed);
        assert_eq!(views[7].state, StepState::Pending);
    }

    #[test]
    fn client_failure_keeps_server_status() {
        let mut state = GenerationState::new();
        state.begin("job-1");
        state.apply_job(&observed(JobStatus::Transcribing, 0.35));
        state.fail("polling gave up");

        assert_eq!(state.phase, SessionPhase::Failed);
        assert_eq!(state.status, Some(JobStatus::Transcribing));
        assert_eq!(state.logs.len(), 1);
    }
}
