//! Handlers for the `/batches` resource.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use storyreel_core::batch::{
    Batch, BatchListResponse, BatchStatus, CreateBatchRequest, CreateBatchResponse,
};
use storyreel_core::estimation::BatchAnalysis;
use storyreel_orchestrator::store::DEFAULT_LIST_LIMIT;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /batches`.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub status: Option<BatchStatus>,
    pub limit: Option<usize>,
}

/// POST /api/v1/batches/analyze
pub async fn analyze(
    State(state): State<AppState>,
    Json(input): Json<CreateBatchRequest>,
) -> AppResult<Json<DataResponse<BatchAnalysis>>> {
    let analysis = state.batches.analyze(&input)?;
    Ok(Json(DataResponse { data: analysis }))
}

/// POST /api/v1/batches
///
/// Processing starts immediately; the response carries the new batch id.
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateBatchRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<CreateBatchResponse>>)> {
    let created = state.batches.create(input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

/// GET /api/v1/batches
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<Json<DataResponse<BatchListResponse>>> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    if limit == 0 {
        return Err(AppError::BadRequest("limit must be at least 1".into()));
    }

    let batches = state.batches.list(params.status, limit);
    Ok(Json(DataResponse { data: batches }))
}

/// GET /api/v1/batches/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<Batch>>> {
    let batch = state.batches.get(&id)?;
    Ok(Json(DataResponse { data: batch }))
}

/// POST /api/v1/batches/{id}/pause
pub async fn pause(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<Batch>>> {
    let batch = state.batches.pause(&id).await?;
    Ok(Json(DataResponse { data: batch }))
}

/// POST /api/v1/batches/{id}/resume
pub async fn resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<Batch>>> {
    let batch = state.batches.resume(&id).await?;
    Ok(Json(DataResponse { data: batch }))
}

/// POST /api/v1/batches/{id}/cancel
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<DataResponse<Batch>>> {
    let batch = state.batches.cancel(&id).await?;
    Ok(Json(DataResponse { data: batch }))
}

/// DELETE /api/v1/batches/{id}
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> AppResult<StatusCode> {
    state.batches.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
