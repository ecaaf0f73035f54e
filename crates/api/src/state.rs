use std::sync::Arc;

use storyreel_orchestrator::service::BatchService;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything inside is behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Owns the batch store and one orchestrator task per running batch.
    pub batches: Arc<BatchService>,
}
