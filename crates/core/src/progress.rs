//! Per-step display state derived from a job's status.

use serde::{Deserialize, Serialize};

use crate::job::{Job, JobStatus};
use crate::step::Step;

/// Open map of step counters as reported by the engine.
pub type StepDetails = serde_json::Map<String, serde_json::Value>;

/// Display state of one pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Pending,
    Active,
    Completed,
    Failed,
}

/// State of `step` for a job in `status`.
///
/// A failed job's status carries no step, so `last_step` (the last step the
/// observer saw before the failure) decides which steps show as failed.
/// Without it every step shows as pending.
pub fn step_state(step: Step, status: JobStatus, last_step: Option<Step>) -> StepState {
    match status {
        JobStatus::Completed => StepState::Completed,
        JobStatus::Failed => match last_step {
            Some(reached) if step <= reached => StepState::Failed,
            _ => StepState::Pending,
        },
        other => match other.step() {
            Some(current) if step < current => StepState::Completed,
            Some(current) if step == current => StepState::Active,
            _ => StepState::Pending,
        },
    }
}

/// A step ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepView {
    pub step: Step,
    pub label: &'static str,
    pub state: StepState,
    /// `"completed/total"` for the active step when the job reports it.
    pub detail: Option<String>,
}

/// Display state of every step of `job`, in pipeline order.
pub fn derive_step_views(job: &Job, last_step: Option<Step>) -> Vec<StepView> {
    step_views(job.status, &job.details, last_step)
}

/// Display state of every step, in pipeline order.
pub fn step_views(status: JobStatus, details: &StepDetails, last_step: Option<Step>) -> Vec<StepView> {
    Step::ALL
        .into_iter()
        .map(|step| {
            let state = step_state(step, status, last_step);
            let label = if state == StepState::Active {
                step.active_label()
            } else {
                step.label()
            };
            StepView {
                step,
                label,
                state,
                detail: step_detail(status, details, step),
            }
        })
        .collect()
}

/// `"completed/total"` counter text for `step`, only while it is active and
/// only if both counters are present.
pub fn step_detail(status: JobStatus, details: &StepDetails, step: Step) -> Option<String> {
    if status.step() != Some(step) {
        return None;
    }
    let (done_key, total_key) = step.detail_counters()?;
    let done = details.get(done_key)?.as_u64()?;
    let total = details.get(total_key)?.as_u64()?;
    Some(format!("{done}/{total}"))
}
