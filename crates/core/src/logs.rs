//! Job log lines and their display severity.
//!
//! Engines should emit structured `{ "severity", "message" }` entries.
//! Plain-text lines from older engines are still accepted and get a
//! severity inferred by keyword matching, see [`classify_log_line`].

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Keyword lists (fallback classification)
// ---------------------------------------------------------------------------

/// Keywords that mark a plain-text line as an error.
const ERROR_KEYWORDS: &[&str] = &["error", "failed"];

/// Keywords that mark a plain-text line as a warning.
const WARNING_KEYWORDS: &[&str] = &["warning", "retry"];

/// Keywords that mark a plain-text line as a success.
const SUCCESS_KEYWORDS: &[&str] = &["success", "completed", "generated"];

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Display severity of a log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSeverity {
    Error,
    Warning,
    Success,
    Info,
}

impl LogSeverity {
    /// Short tag for terminal output.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Error => "ERR",
            Self::Warning => "WRN",
            Self::Success => "OK ",
            Self::Info => "INF",
        }
    }
}

/// Infer the severity of a free-text log line.
///
/// Case-insensitive substring match, first hit wins: error keywords, then
/// warning keywords, then success keywords, otherwise informational.
pub fn classify_log_line(line: &str) -> LogSeverity {
    let lower = line.to_lowercase();
    let contains_any = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

    if contains_any(ERROR_KEYWORDS) {
        LogSeverity::Error
    } else if contains_any(WARNING_KEYWORDS) {
        LogSeverity::Warning
    } else if contains_any(SUCCESS_KEYWORDS) {
        LogSeverity::Success
    } else {
        LogSeverity::Info
    }
}

// ---------------------------------------------------------------------------
// Log line
// ---------------------------------------------------------------------------

/// One entry of a job's append-only log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogLine {
    /// Entry with an engine-supplied severity.
    Structured {
        severity: LogSeverity,
        message: String,
    },
    /// Legacy free-text entry.
    Text(String),
}

impl LogLine {
    /// The human-readable message.
    pub fn message(&self) -> &str {
        match self {
            Self::Structured { message, .. } => message,
            Self::Text(text) => text,
        }
    }

    /// The engine-supplied severity, or the inferred one for plain text.
    pub fn severity(&self) -> LogSeverity {
        match self {
            Self::Structured { severity, .. } => *severity,
            Self::Text(text) => classify_log_line(text),
        }
    }
}

impl From<&str> for LogLine {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// The last `limit` lines of a log, oldest first.
pub fn recent_lines(lines: &[LogLine], limit: usize) -> &[LogLine] {
    &lines[lines.len().saturating_sub(limit)..]
}
