//! Route definitions for the `/batches` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::batches;
use crate::state::AppState;

/// Routes mounted at `/batches`.
///
/// ```text
/// GET    /                -> list
/// POST   /                -> create
/// POST   /analyze         -> analyze
/// GET    /{id}            -> get_by_id
/// DELETE /{id}            -> delete
/// POST   /{id}/pause      -> pause
/// POST   /{id}/resume     -> resume
/// POST   /{id}/cancel     -> cancel
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(batches::list).post(batches::create))
        .route("/analyze", post(batches::analyze))
        .route("/{id}", get(batches::get_by_id).delete(batches::delete))
        .route("/{id}/pause", post(batches::pause))
        .route("/{id}/resume", post(batches::resume))
        .route("/{id}/cancel", post(batches::cancel))
}
