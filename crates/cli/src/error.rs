use storyreel_client::api::EngineApiError;
use storyreel_core::error::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Api(#[from] EngineApiError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Input(String),

    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Batch {0} no longer exists")]
    BatchGone(String),
}

pub type Result<T> = std::result::Result<T, CliError>;
