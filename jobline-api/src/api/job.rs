//! Job API Handlers
//!
//! HTTP endpoints for submitting jobs and reading their status.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use jobline_core::domain::job::JobRecord;
use jobline_core::dto::job::EnqueueJob;

use crate::api::error::{ApiError, ApiResult};
use crate::service::job_service;
use crate::state::AppState;

/// POST /enqueue
/// Create a pending job and push its id onto the queue
pub async fn enqueue_job(
    State(state): State<AppState>,
    body: Result<Json<EnqueueJob>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<JobRecord>)> {
    let Json(req) = body?;

    tracing::debug!("Enqueue request ({} bytes of data)", req.data.len());

    let job = job_service::enqueue_job(
        state.store.as_ref(),
        state.queue.as_ref(),
        req,
        state.default_max_retries,
    )
    .await?;

    Ok((StatusCode::ACCEPTED, Json(job)))
}

/// GET /status/{id}
/// Get the current record for a job
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<JobRecord>> {
    tracing::debug!("Getting job: {}", id);

    let job = job_service::get_job(state.store.as_ref(), &id).await?;

    Ok(Json(job))
}

/// GET /status and GET /status/
/// A status request without an id
pub async fn missing_job_id() -> ApiError {
    ApiError::BadRequest("missing job id".to_string())
}
