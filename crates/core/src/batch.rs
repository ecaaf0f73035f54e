//! Batch and batch item records.
//!
//! A batch is an ordered list of generation requests processed strictly one
//! at a time. Item order is fixed at creation; item failures are recorded
//! per item and never fail the batch.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::estimation::{char_count, estimate_duration_secs, MAX_TEXT_CHARS};
use crate::types::{BatchId, JobId, Timestamp};

/// Status text shown for an item that has not started.
pub const WAITING_STEP: &str = "Waiting";

// ---------------------------------------------------------------------------
// Statuses
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Processing,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl BatchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Statuses for which a detail view keeps refreshing.
    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "paused" => Ok(Self::Paused),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(CoreError::Validation(format!(
                "Unknown batch status: '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchItemStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Skipped,
}

impl BatchItemStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One generation request inside a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    pub id: String,
    pub title: String,
    pub text: String,
    pub status: BatchItemStatus,
    #[serde(default)]
    pub job_id: Option<JobId>,
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub current_step: String,
    #[serde(default)]
    pub video_path: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub started_at: Option<Timestamp>,
    #[serde(default)]
    pub completed_at: Option<Timestamp>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
}

impl BatchItem {
    /// A pending item at position `index` of batch `batch_id`.
    pub fn new(batch_id: &str, index: usize, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: format!("{batch_id}_{index}"),
            title: title.into(),
            text: text.into(),
            status: BatchItemStatus::Pending,
            job_id: None,
            progress: 0.0,
            current_step: WAITING_STEP.to_string(),
            video_path: None,
            error: None,
            started_at: None,
            completed_at: None,
            duration_seconds: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// An ordered collection of items plus orchestration state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    #[serde(rename = "batch_id", alias = "id")]
    pub id: BatchId,
    pub name: String,
    pub status: BatchStatus,
    pub items: Vec<BatchItem>,
    /// Index of the item being processed, `items.len()` when none is left.
    pub current_item_index: usize,
    pub completed_items: usize,
    pub failed_items: usize,
    /// `completed_items / total_items`.
    pub progress: f64,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_override: Option<serde_json::Value>,
    pub created_at: Timestamp,
    #[serde(default)]
    pub started_at: Option<Timestamp>,
    #[serde(default)]
    pub completed_at: Option<Timestamp>,
    /// Batch-level fatal condition only; item errors live on the items.
    #[serde(default)]
    pub error: Option<String>,
}

impl Batch {
    pub fn new(
        id: impl Into<BatchId>,
        name: impl Into<String>,
        items: Vec<BatchItem>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: BatchStatus::Pending,
            items,
            current_item_index: 0,
            completed_items: 0,
            failed_items: 0,
            progress: 0.0,
            channel_id: None,
            config_override: None,
            created_at,
            started_at: None,
            completed_at: None,
            error: None,
        }
    }

    pub fn total_items(&self) -> usize {
        self.items.len()
    }

    pub fn skipped_items(&self) -> usize {
        self.count_with(BatchItemStatus::Skipped)
    }

    pub fn processing_count(&self) -> usize {
        self.count_with(BatchItemStatus::Processing)
    }

    fn count_with(&self, status: BatchItemStatus) -> usize {
        self.items.iter().filter(|i| i.status == status).count()
    }

    /// The item currently being processed, if any.
    pub fn current_item(&self) -> Option<&BatchItem> {
        self.items
            .get(self.current_item_index)
            .filter(|item| item.status == BatchItemStatus::Processing)
    }

    /// Recompute `progress` from `completed_items`.
    pub fn refresh_progress(&mut self) {
        self.progress = if self.items.is_empty() {
            0.0
        } else {
            self.completed_items as f64 / self.items.len() as f64
        };
    }

    /// Verify the structural invariants of a batch record.
    pub fn check_invariants(&self) -> Result<(), CoreError> {
        let processing = self.processing_count();
        if processing > 1 {
            return Err(CoreError::ContractViolation(format!(
                "Batch {} has {processing} items processing at once",
                self.id
            )));
        }

        let accounted = self.completed_items + self.failed_items + self.skipped_items();
        if accounted > self.total_items() {
            return Err(CoreError::ContractViolation(format!(
                "Batch {} accounts for {accounted} of {} items",
                self.id,
                self.total_items()
            )));
        }

        if self.status == BatchStatus::Completed && !self.items.iter().all(BatchItem::is_terminal) {
            return Err(CoreError::ContractViolation(format!(
                "Batch {} is completed with unfinished items",
                self.id
            )));
        }

        if !(0.0..=1.0).contains(&self.progress) {
            return Err(CoreError::ContractViolation(format!(
                "Batch {} progress {} outside [0, 1]",
                self.id, self.progress
            )));
        }

        Ok(())
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            batch_id: self.id.clone(),
            name: self.name.clone(),
            status: self.status,
            total_items: self.total_items(),
            completed_items: self.completed_items,
            failed_items: self.failed_items,
            progress: self.progress,
            created_at: self.created_at,
            completed_at: self.completed_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Requests and responses
// ---------------------------------------------------------------------------

/// One script submitted for a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchItemInput {
    #[serde(default)]
    pub title: Option<String>,
    pub text: String,
}

/// Payload of create-batch and analyze-batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateBatchRequest {
    pub name: String,
    pub items: Vec<BatchItemInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_override: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateBatchResponse {
    pub batch_id: BatchId,
    pub status: BatchStatus,
    pub total_items: usize,
    pub estimated_total_duration_seconds: f64,
    #[serde(default)]
    pub message: String,
}

/// Compact listing entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub batch_id: BatchId,
    pub name: String,
    pub status: BatchStatus,
    pub total_items: usize,
    pub completed_items: usize,
    pub failed_items: usize,
    pub progress: f64,
    pub created_at: Timestamp,
    #[serde(default)]
    pub completed_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchListResponse {
    pub batches: Vec<BatchSummary>,
    pub total: usize,
}

/// Validate submitted scripts and turn them into pending items.
///
/// Blank scripts are dropped and the survivors are renumbered; a script
/// over [`MAX_TEXT_CHARS`] rejects the whole request.
pub fn prepare_items(batch_id: &str, inputs: &[BatchItemInput]) -> Result<Vec<BatchItem>, CoreError> {
    if inputs.is_empty() {
        return Err(CoreError::Validation("No scripts provided".into()));
    }

    let mut items = Vec::with_capacity(inputs.len());
    for input in inputs {
        let text = input.text.trim();
        if text.is_empty() {
            continue;
        }
        if char_count(text) > MAX_TEXT_CHARS {
            let title = input.title.as_deref().unwrap_or("untitled");
            return Err(CoreError::Validation(format!(
                "Script '{title}' exceeds {MAX_TEXT_CHARS} characters"
            )));
        }

        let index = items.len();
        let title = input
            .title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| format!("Script {}", index + 1));
        items.push(BatchItem::new(batch_id, index, title, text));
    }

    if items.is_empty() {
        return Err(CoreError::Validation("No valid scripts provided".into()));
    }
    Ok(items)
}

/// Sum of estimated narration durations, in seconds.
pub fn estimated_total_duration(items: &[BatchItem]) -> f64 {
    items.iter().map(|i| estimate_duration_secs(&i.text)).sum()
}
