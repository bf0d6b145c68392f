//! HTTP API surface

pub mod health;
pub mod jobs;
pub mod sse;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

/// All routes for the extraction service
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/jobs", post(jobs::submit_job))
        .route("/jobs/:id", get(jobs::job_status))
        .route("/jobs/:id/cancel", post(jobs::cancel_job))
        .route("/jobs/:id/events", get(sse::job_event_stream))
}
