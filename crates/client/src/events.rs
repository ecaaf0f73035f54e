//! Events emitted while a job is being polled.

use std::time::Duration;

use storyreel_core::job::Job;
use storyreel_core::retry::ErrorClass;

#[derive(Debug, Clone)]
pub enum PollEvent {
    /// A fetched job passed the ordering checks.
    Observed(Job),

    /// A fetch failed and will be retried after `delay`.
    Retrying {
        class: ErrorClass,
        /// Consecutive failures so far, including this one.
        consecutive: u32,
        total: u32,
        delay: Duration,
        error: String,
    },
}
