//! Job records, the job status state machine, and observation checks.
//!
//! A job moves forward through the [`Step`] catalogue and may drop to
//! `failed` or `cancelled` from any non-terminal status. `completed`,
//! `failed` and `cancelled` are absorbing.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::logs::LogLine;
use crate::step::{Step, STEP_COUNT};
use crate::types::{JobId, Timestamp};

/// Tolerance used when comparing successive progress values.
const PROGRESS_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Job status
// ---------------------------------------------------------------------------

/// Lifecycle status of a job as reported by the execution engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    ProcessingText,
    GeneratingAudio,
    MergingAudio,
    Transcribing,
    AnalyzingScenes,
    SelectingMusic,
    GeneratingImages,
    MixingAudio,
    ComposingVideo,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// The pipeline step this status denotes, if it is a step status.
    pub fn step(self) -> Option<Step> {
        match self {
            Self::ProcessingText => Some(Step::ProcessingText),
            Self::GeneratingAudio => Some(Step::GeneratingAudio),
            Self::MergingAudio => Some(Step::MergingAudio),
            Self::Transcribing => Some(Step::Transcribing),
            Self::AnalyzingScenes => Some(Step::AnalyzingScenes),
            Self::SelectingMusic => Some(Step::SelectingMusic),
            Self::GeneratingImages => Some(Step::GeneratingImages),
            Self::MixingAudio => Some(Step::MixingAudio),
            Self::ComposingVideo => Some(Step::ComposingVideo),
            Self::Pending | Self::Completed | Self::Failed | Self::Cancelled => None,
        }
    }

    /// Catalogue ordinal of the status, or `None` for `pending`,
    /// `completed`, `failed` and `cancelled`.
    pub fn step_index(self) -> Option<usize> {
        self.step().map(Step::ordinal)
    }

    /// `completed`, `failed` and `cancelled` never transition further.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Position on the forward path `pending -> steps -> completed`.
    /// `failed` and `cancelled` are off the path.
    fn forward_rank(self) -> Option<usize> {
        match self {
            Self::Pending => Some(0),
            Self::Completed => Some(STEP_COUNT + 1),
            Self::Failed | Self::Cancelled => None,
            other => other.step_index().map(|i| i + 1),
        }
    }

    /// Whether an observer that last saw `self` may legally see `next`.
    ///
    /// Re-observing the same status is always allowed.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        if self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        match (self.forward_rank(), next.forward_rank()) {
            (_, None) => true,
            (Some(from), Some(to)) => to >= from,
            (None, Some(_)) => false,
        }
    }

    /// Wire representation, e.g. `"generating_audio"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            other => other.step().map(Step::key).unwrap_or("unknown"),
        }
    }
}

impl From<Step> for JobStatus {
    fn from(step: Step) -> Self {
        match step {
            Step::ProcessingText => Self::ProcessingText,
            Step::GeneratingAudio => Self::GeneratingAudio,
            Step::MergingAudio => Self::MergingAudio,
            Step::Transcribing => Self::Transcribing,
            Step::AnalyzingScenes => Self::AnalyzingScenes,
            Step::SelectingMusic => Self::SelectingMusic,
            Step::GeneratingImages => Self::GeneratingImages,
            Step::MixingAudio => Self::MixingAudio,
            Step::ComposingVideo => Self::ComposingVideo,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Job record
// ---------------------------------------------------------------------------

/// One generation request as reported by the execution engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "job_id", alias = "id")]
    pub id: JobId,
    pub status: JobStatus,
    /// Fraction complete in `[0, 1]`.
    #[serde(default)]
    pub progress: f64,
    /// Engine-supplied description of what is running right now.
    #[serde(default)]
    pub current_step: String,
    /// Step-specific counters, e.g. `chunks_completed` / `chunks_total`.
    #[serde(default)]
    pub details: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub logs: Vec<LogLine>,
    pub created_at: Timestamp,
    #[serde(default)]
    pub started_at: Option<Timestamp>,
    #[serde(default)]
    pub completed_at: Option<Timestamp>,
    /// Only set when `status == failed`.
    #[serde(default)]
    pub error: Option<String>,
}

impl Job {
    /// A freshly created job that has not started yet.
    pub fn pending(id: impl Into<JobId>, created_at: Timestamp) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Pending,
            progress: 0.0,
            current_step: String::new(),
            details: serde_json::Map::new(),
            logs: Vec::new(),
            created_at,
            started_at: None,
            completed_at: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Reject progress values outside `[0, 1]` (including NaN).
    pub fn check_progress(&self) -> Result<(), CoreError> {
        if (0.0..=1.0).contains(&self.progress) {
            Ok(())
        } else {
            Err(CoreError::ContractViolation(format!(
                "Job {} reported progress {} outside [0, 1]",
                self.id, self.progress
            )))
        }
    }
}

/// Final output of a completed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(default)]
    pub video_path: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub scenes_count: Option<u32>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub processing_time_seconds: Option<f64>,
}

/// Payload for the engine's create-job operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateJobRequest {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_override: Option<serde_json::Value>,
}

/// The engine's answer to create-job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateJobResponse {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub estimated_duration_seconds: Option<f64>,
}

// ---------------------------------------------------------------------------
// Observation checks
// ---------------------------------------------------------------------------

/// Tracks successive observations of one job and rejects any that break
/// the status ordering or progress rules.
#[derive(Debug, Clone, Default)]
pub struct JobObserver {
    last_status: Option<JobStatus>,
    last_progress: f64,
    last_step: Option<Step>,
}

impl JobObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status seen on the previous accepted observation.
    pub fn last_status(&self) -> Option<JobStatus> {
        self.last_status
    }

    /// Most recent pipeline step observed, kept after the job leaves it.
    pub fn last_step(&self) -> Option<Step> {
        self.last_step
    }

    /// Accept `job` as the next observation or explain why it is invalid.
    ///
    /// On error the observer state is left unchanged.
    pub fn observe(&mut self, job: &Job) -> Result<(), CoreError> {
        job.check_progress()?;

        if let Some(last) = self.last_status {
            if !last.can_transition_to(job.status) {
                return Err(CoreError::InvalidTransition {
                    from: last.to_string(),
                    to: job.status.to_string(),
                });
            }
            if !last.is_terminal()
                && !job.is_terminal()
                && job.progress + PROGRESS_EPSILON < self.last_progress
            {
                return Err(CoreError::ContractViolation(format!(
                    "Job {} progress regressed from {} to {}",
                    job.id, self.last_progress, job.progress
                )));
            }
        }

        self.last_status = Some(job.status);
        self.last_progress = job.progress;
        if let Some(step) = job.status.step() {
            self.last_step = Some(step);
        }
        Ok(())
    }
}
