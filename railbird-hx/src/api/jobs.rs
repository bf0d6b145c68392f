//! Job submission and status handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    models::{Job, JobStatus, SubmitRequest},
    AppState,
};

/// POST /jobs response
#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub total_segments: usize,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// POST /jobs/:id/cancel response
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub message: String,
}

/// POST /jobs
///
/// Validates the request synchronously; a rejected request never creates a
/// job record. Returns 202 Accepted once the job is PENDING.
pub async fn submit_job(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> ApiResult<(StatusCode, Json<SubmitResponse>)> {
    let job = state.coordinator.submit(request).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            job_id: job.id,
            status: job.status,
            total_segments: job.total_segments,
            created_at: job.created_at,
        }),
    ))
}

/// GET /jobs/:id
///
/// Full job snapshot. The output payload is present once the job reaches
/// SUCCESS; on FAILURE only the diagnostic report is attached.
pub async fn job_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Job>> {
    let job = state
        .registry
        .get(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Job {} not found", id)))?;
    Ok(Json(job))
}

/// POST /jobs/:id/cancel
///
/// Cancelling a terminal job is a conflict, not an idempotent no-op; the
/// caller's view of the job is stale and should be refreshed.
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CancelResponse>> {
    let job = state.coordinator.cancel(id).await.map_err(|e| match e {
        railbird_common::Error::InvalidInput(message) => ApiError::Conflict(message),
        other => ApiError::from(other),
    })?;

    Ok(Json(CancelResponse {
        job_id: job.id,
        status: job.status,
        message: "Cancellation requested".to_string(),
    }))
}
