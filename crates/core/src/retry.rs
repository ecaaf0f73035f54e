//! Retry policy for the job status poller.
//!
//! Failed fetches are classified as transient timeouts (the engine is
//! busy but working) or generic errors. Each class has its own backoff
//! curve; both draw on the same pair of error budgets.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Delay between polls while the job is healthy.
pub const DEFAULT_BASE_INTERVAL: Duration = Duration::from_millis(2000);

/// Consecutive failures after which polling stops.
pub const MAX_CONSECUTIVE_ERRORS: u32 = 10;

/// Failures over the whole session after which polling stops.
pub const MAX_TOTAL_ERRORS: u32 = 30;

/// Per-failure increment of the timeout backoff.
pub const TIMEOUT_BACKOFF_STEP: Duration = Duration::from_millis(5000);

/// Ceiling of the timeout backoff.
pub const TIMEOUT_BACKOFF_CAP: Duration = Duration::from_millis(30_000);

/// Ceiling of the generic exponential backoff.
pub const GENERIC_BACKOFF_CAP: Duration = Duration::from_millis(15_000);

/// Lower-cased substrings that mark an error message as server-busy or
/// timeout-like.
const TIMEOUT_MARKERS: &[&str] = &[
    "timeout",
    "timed out",
    "server busy",
    "server is busy",
    "too busy",
];

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Class of a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// The request timed out or the server said it is busy.
    TransientTimeout,
    /// Anything else: connectivity, 5xx, unexpected payloads.
    Generic,
}

impl ErrorClass {
    /// Classify an error by its message.
    pub fn from_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        if TIMEOUT_MARKERS.iter().any(|m| lower.contains(m)) {
            Self::TransientTimeout
        } else {
            Self::Generic
        }
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Tunable poller retry parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_interval: Duration,
    pub max_consecutive_errors: u32,
    pub max_total_errors: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_interval: DEFAULT_BASE_INTERVAL,
            max_consecutive_errors: MAX_CONSECUTIVE_ERRORS,
            max_total_errors: MAX_TOTAL_ERRORS,
        }
    }
}

impl RetryPolicy {
    /// Delay before the `n`-th consecutive timeout retry:
    /// `min(5000 ms * n, 30000 ms)`.
    pub fn timeout_backoff(&self, n: u32) -> Duration {
        TIMEOUT_BACKOFF_STEP
            .saturating_mul(n)
            .min(TIMEOUT_BACKOFF_CAP)
    }

    /// Delay before the `n`-th consecutive generic retry:
    /// `min(base * 2^n, 15000 ms)`.
    pub fn generic_backoff(&self, n: u32) -> Duration {
        let factor = 2u32.checked_pow(n).unwrap_or(u32::MAX);
        self.base_interval
            .saturating_mul(factor)
            .min(GENERIC_BACKOFF_CAP)
    }
}

// ---------------------------------------------------------------------------
// Error budget
// ---------------------------------------------------------------------------

/// What the poller should do after a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again after the given delay.
    Retry(Duration),
    /// Stop polling; the budget is spent.
    GiveUp,
}

/// Consecutive and total failure counters for one polling session.
///
/// Owned by a single poller instance; never shared between jobs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorBudget {
    consecutive: u32,
    total: u32,
}

impl ErrorBudget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// A fetch succeeded; only the consecutive counter resets.
    pub fn record_success(&mut self) {
        self.consecutive = 0;
    }

    /// Count a failed fetch and decide whether to retry.
    pub fn record_failure(&mut self, class: ErrorClass, policy: &RetryPolicy) -> RetryDecision {
        self.total = self.total.saturating_add(1);
        self.consecutive = self.consecutive.saturating_add(1);

        let within_consecutive = self.consecutive < policy.max_consecutive_errors;

        if class == ErrorClass::TransientTimeout && within_consecutive {
            return RetryDecision::Retry(policy.timeout_backoff(self.consecutive));
        }
        if self.total < policy.max_total_errors && within_consecutive {
            return RetryDecision::Retry(policy.generic_backoff(self.consecutive));
        }
        RetryDecision::GiveUp
    }
}
