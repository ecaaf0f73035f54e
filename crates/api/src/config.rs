use storyreel_client::config::ClientConfig;
use storyreel_orchestrator::store::DEFAULT_MAX_BATCHES;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub http_timeout_secs: u64,
    /// Upper bound on batches kept in memory (default: `20`).
    pub max_batches: usize,
    /// Execution engine connection and poller settings.
    pub client: ClientConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                    |
    /// |-------------------------|----------------------------|
    /// | `HOST`                  | `0.0.0.0`                  |
    /// | `PORT`                  | `3000`                     |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`    |
    /// | `HTTP_TIMEOUT_SECS`     | `30`                       |
    /// | `MAX_BATCHES_IN_MEMORY` | `20`                       |
    ///
    /// Engine settings come from [`ClientConfig::from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let http_timeout_secs: u64 = std::env::var("HTTP_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("HTTP_TIMEOUT_SECS must be a valid u64");

        let max_batches: usize = std::env::var("MAX_BATCHES_IN_MEMORY")
            .unwrap_or_else(|_| DEFAULT_MAX_BATCHES.to_string())
            .parse()
            .expect("MAX_BATCHES_IN_MEMORY must be a valid usize");

        Self {
            host,
            port,
            cors_origins,
            http_timeout_secs,
            max_batches,
            client: ClientConfig::from_env(),
        }
    }
}
