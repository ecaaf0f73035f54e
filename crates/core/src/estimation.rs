//! Narration text analysis: word counts, duration estimates and the
//! chunking the audio step applies before synthesis.
//!
//! All lengths are counted in Unicode scalar values, not bytes.

use serde::{Deserialize, Serialize};

use crate::batch::BatchItemInput;
use crate::error::CoreError;

/// Assumed narration speed.
pub const WORDS_PER_MINUTE: f64 = 150.0;

/// Maximum characters per narration chunk.
pub const MAX_CHUNK_CHARS: usize = 2500;

/// Maximum characters accepted for a single script.
pub const MAX_TEXT_CHARS: usize = 50_000;

/// Processing time is roughly this many minutes per minute of video.
pub const PROCESSING_MINUTES_PER_VIDEO_MINUTE: f64 = 4.0;

/// Preferred cut points, strongest first.
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", "! ", "? ", "; ", ", "];

// ---------------------------------------------------------------------------
// Primitive measures
// ---------------------------------------------------------------------------

pub fn char_count(text: &str) -> usize {
    text.chars().count()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Estimated narration length in seconds.
pub fn estimate_duration_secs(text: &str) -> f64 {
    word_count(text) as f64 / WORDS_PER_MINUTE * 60.0
}

// ---------------------------------------------------------------------------
// Chunking
// ---------------------------------------------------------------------------

/// Split `text` into chunks of at most `max_chars` characters, cutting at
/// the strongest separator that fits.
pub fn split_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut remaining = text.trim();

    while !remaining.is_empty() {
        let Some((limit, _)) = remaining.char_indices().nth(max_chars) else {
            chunks.push(remaining.to_string());
            break;
        };

        let cut = find_cut_point(remaining, limit);
        let chunk = remaining[..cut].trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        remaining = remaining[cut..].trim();
    }

    chunks
}

/// Byte offset to cut at, given the byte offset of the character limit.
fn find_cut_point(text: &str, limit: usize) -> usize {
    let window = &text[..limit];

    for sep in SEPARATORS {
        if let Some(pos) = window.rfind(sep) {
            if pos > 0 {
                return pos + sep.len();
            }
        }
    }

    match window.rfind(' ') {
        Some(pos) if pos > 0 => pos + 1,
        _ => limit,
    }
}

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Estimates for one script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAnalysis {
    pub char_count: usize,
    pub word_count: usize,
    pub estimated_duration_seconds: f64,
    pub estimated_chunks: usize,
}

pub fn analyze_text(text: &str) -> TextAnalysis {
    let text = text.trim();
    TextAnalysis {
        char_count: char_count(text),
        word_count: word_count(text),
        estimated_duration_seconds: estimate_duration_secs(text),
        estimated_chunks: split_chunks(text, MAX_CHUNK_CHARS).len(),
    }
}

/// Per-item entry of a batch analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemAnalysis {
    pub index: usize,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(flatten)]
    pub analysis: Option<TextAnalysis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Preview of a batch before it is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchAnalysis {
    pub total_items: usize,
    pub total_characters: usize,
    pub total_words: usize,
    pub estimated_total_duration_seconds: f64,
    pub estimated_processing_time_minutes: f64,
    pub items_analysis: Vec<ItemAnalysis>,
}

/// Analyze every item of a prospective batch without starting anything.
///
/// Blank items are reported with an error and excluded from the totals.
pub fn analyze_batch(items: &[BatchItemInput]) -> Result<BatchAnalysis, CoreError> {
    if items.is_empty() {
        return Err(CoreError::Validation("No scripts provided".into()));
    }

    let mut items_analysis = Vec::with_capacity(items.len());
    let mut total_characters = 0;
    let mut total_words = 0;
    let mut total_duration = 0.0;

    for (index, item) in items.iter().enumerate() {
        if item.text.trim().is_empty() {
            items_analysis.push(ItemAnalysis {
                index,
                title: item.title.clone(),
                analysis: None,
                error: Some("empty text".into()),
            });
            continue;
        }

        let analysis = analyze_text(&item.text);
        total_characters += analysis.char_count;
        total_words += analysis.word_count;
        total_duration += analysis.estimated_duration_seconds;

        items_analysis.push(ItemAnalysis {
            index,
            title: item.title.clone(),
            analysis: Some(analysis),
            error: None,
        });
    }

    Ok(BatchAnalysis {
        total_items: items.len(),
        total_characters,
        total_words,
        estimated_total_duration_seconds: total_duration,
        estimated_processing_time_minutes: total_duration / 60.0
            * PROCESSING_MINUTES_PER_VIDEO_MINUTE,
        items_analysis,
    })
}
