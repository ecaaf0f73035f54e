use std::time::Duration;

use storyreel_core::retry::{RetryPolicy, MAX_CONSECUTIVE_ERRORS, MAX_TOTAL_ERRORS};

/// Client configuration loaded from environment variables.
///
/// Defaults target a local development setup.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Job execution engine base URL (default: `http://localhost:8000`).
    pub engine_url: String,
    /// Batch service base URL (default: `http://localhost:3000`).
    pub batch_service_url: String,
    /// Upper bound for a single HTTP request (default: 30 s).
    pub request_timeout: Duration,
    /// Delay between healthy polls (default: 2000 ms).
    pub poll_interval: Duration,
    pub max_consecutive_errors: u32,
    pub max_total_errors: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            engine_url: "http://localhost:8000".into(),
            batch_service_url: "http://localhost:3000".into(),
            request_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(2000),
            max_consecutive_errors: MAX_CONSECUTIVE_ERRORS,
            max_total_errors: MAX_TOTAL_ERRORS,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                  |
    /// |--------------------------|--------------------------|
    /// | `ENGINE_URL`             | `http://localhost:8000`  |
    /// | `BATCH_SERVICE_URL`      | `http://localhost:3000`  |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                     |
    /// | `POLL_INTERVAL_MS`       | `2000`                   |
    /// | `MAX_CONSECUTIVE_ERRORS` | `10`                     |
    /// | `MAX_TOTAL_ERRORS`       | `30`                     |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let engine_url = std::env::var("ENGINE_URL").unwrap_or(defaults.engine_url);
        let batch_service_url =
            std::env::var("BATCH_SERVICE_URL").unwrap_or(defaults.batch_service_url);

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let poll_interval_ms: u64 = std::env::var("POLL_INTERVAL_MS")
            .unwrap_or_else(|_| "2000".into())
            .parse()
            .expect("POLL_INTERVAL_MS must be a valid u64");

        let max_consecutive_errors: u32 = std::env::var("MAX_CONSECUTIVE_ERRORS")
            .unwrap_or_else(|_| MAX_CONSECUTIVE_ERRORS.to_string())
            .parse()
            .expect("MAX_CONSECUTIVE_ERRORS must be a valid u32");

        let max_total_errors: u32 = std::env::var("MAX_TOTAL_ERRORS")
            .unwrap_or_else(|_| MAX_TOTAL_ERRORS.to_string())
            .parse()
            .expect("MAX_TOTAL_ERRORS must be a valid u32");

        Self {
            engine_url,
            batch_service_url,
            request_timeout: Duration::from_secs(request_timeout_secs),
            poll_interval: Duration::from_millis(poll_interval_ms),
            max_consecutive_errors,
            max_total_errors,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            base_interval: self.poll_interval,
            max_consecutive_errors: self.max_consecutive_errors,
            max_total_errors: self.max_total_errors,
        }
    }
}
