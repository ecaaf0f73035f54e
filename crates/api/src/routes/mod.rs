pub mod batches;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /batches                      list, create
/// /batches/analyze              estimate without creating (POST)
/// /batches/{id}                 get, delete
/// /batches/{id}/pause           pause (POST)
/// /batches/{id}/resume          resume (POST)
/// /batches/{id}/cancel          cancel (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/batches", batches::router())
}
