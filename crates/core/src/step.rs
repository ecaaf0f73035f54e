//! The fixed, totally ordered catalogue of generation pipeline stages.
//!
//! A job's status is interpreted as a position in this catalogue: the
//! ordinal of a [`Step`] is its index in [`Step::ALL`], so comparing two
//! steps answers "has A completed relative to B?" in O(1).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Number of stages in the pipeline.
pub const STEP_COUNT: usize = 9;

/// One stage of the generation pipeline.
///
/// Variant order is the pipeline order; `Ord` follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    ProcessingText,
    GeneratingAudio,
    MergingAudio,
    Transcribing,
    AnalyzingScenes,
    SelectingMusic,
    GeneratingImages,
    MixingAudio,
    ComposingVideo,
}

impl Step {
    /// Every step in pipeline order.
    pub const ALL: [Step; STEP_COUNT] = [
        Step::ProcessingText,
        Step::GeneratingAudio,
        Step::MergingAudio,
        Step::Transcribing,
        Step::AnalyzingScenes,
        Step::SelectingMusic,
        Step::GeneratingImages,
        Step::MixingAudio,
        Step::ComposingVideo,
    ];

    /// Zero-based position in the pipeline.
    pub fn ordinal(self) -> usize {
        self as usize
    }

    /// Step at the given ordinal, if any.
    pub fn from_ordinal(ordinal: usize) -> Option<Step> {
        Self::ALL.get(ordinal).copied()
    }

    /// Wire key, e.g. `"generating_audio"`.
    pub fn key(self) -> &'static str {
        match self {
            Self::ProcessingText => "processing_text",
            Self::GeneratingAudio => "generating_audio",
            Self::MergingAudio => "merging_audio",
            Self::Transcribing => "transcribing",
            Self::AnalyzingScenes => "analyzing_scenes",
            Self::SelectingMusic => "selecting_music",
            Self::GeneratingImages => "generating_images",
            Self::MixingAudio => "mixing_audio",
            Self::ComposingVideo => "composing_video",
        }
    }

    /// Look up a step by its wire key.
    pub fn from_key(key: &str) -> Option<Step> {
        Self::ALL.into_iter().find(|s| s.key() == key)
    }

    /// Human-readable label for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::ProcessingText => "Text processing",
            Self::GeneratingAudio => "Narration",
            Self::MergingAudio => "Audio merge",
            Self::Transcribing => "Transcription",
            Self::AnalyzingScenes => "Scene analysis",
            Self::SelectingMusic => "Music selection",
            Self::GeneratingImages => "Image generation",
            Self::MixingAudio => "Audio mix",
            Self::ComposingVideo => "Video composition",
        }
    }

    /// Label shown while the step is running.
    pub fn active_label(self) -> &'static str {
        match self {
            Self::ProcessingText => "Processing text",
            Self::GeneratingAudio => "Generating narration",
            Self::MergingAudio => "Merging audio",
            Self::Transcribing => "Transcribing audio",
            Self::AnalyzingScenes => "Analyzing scenes",
            Self::SelectingMusic => "Selecting music",
            Self::GeneratingImages => "Generating images",
            Self::MixingAudio => "Mixing audio",
            Self::ComposingVideo => "Composing video",
        }
    }

    /// The `(completed, total)` counter keys this step reports in a job's
    /// step details, for steps that have sub-units.
    pub fn detail_counters(self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::GeneratingAudio => Some(("chunks_completed", "chunks_total")),
            Self::GeneratingImages => Some(("images_completed", "images_total")),
            _ => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Step {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s).ok_or_else(|| CoreError::Validation(format!("Unknown step: '{s}'")))
    }
}
