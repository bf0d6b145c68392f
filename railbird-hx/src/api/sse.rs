//! Server-Sent Events stream for per-job progress

use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use railbird_common::events::ExtractEvent;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// GET /jobs/:id/events - SSE stream of one job's lifecycle events
///
/// Streams JobProgress, JobLog, JobCompleted, and JobFailed events for the
/// given job, with a heartbeat comment every 15 seconds. The stream closes
/// after the terminal event. Connecting to a job that is already terminal
/// yields its terminal event immediately.
pub async fn job_event_stream(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let job = state
        .registry
        .get(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Job {} not found", id)))?;

    info!(job_id = %id, "New SSE client connected");

    // Subscribe before reading the snapshot so no event can fall between
    let mut rx = state.event_bus.subscribe();

    // Synthesize a terminal event for late subscribers
    let replay = if job.is_terminal() {
        Some(match job.error {
            Some(error) => ExtractEvent::JobFailed {
                job_id: id,
                error,
                processed_segments: job.processed_segments,
                timestamp: job.completed_at.unwrap_or(job.updated_at),
            },
            None => ExtractEvent::JobCompleted {
                job_id: id,
                hands_found: job.hands_found,
                total_errors: job
                    .output
                    .as_ref()
                    .map(|o| o.report.total_errors)
                    .unwrap_or(0),
                duration_seconds: (job.updated_at - job.created_at).num_seconds().max(0) as u64,
                timestamp: job.completed_at.unwrap_or(job.updated_at),
            },
        })
    } else {
        None
    };

    let stream = async_stream::stream! {
        if let Some(event) = replay {
            if let Some(sse_event) = to_sse_event(&event) {
                yield Ok(sse_event);
            }
            return;
        }

        // Heartbeats come from the keep-alive layer below, not from here
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(job_id = %id, skipped, "SSE: subscriber lagged");
                    continue;
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            };

            if event.job_id() != id {
                continue;
            }

            let terminal = matches!(
                event,
                ExtractEvent::JobCompleted { .. } | ExtractEvent::JobFailed { .. }
            );

            if let Some(sse_event) = to_sse_event(&event) {
                yield Ok(sse_event);
            }

            if terminal {
                debug!(job_id = %id, "SSE: job reached terminal state, closing stream");
                break;
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    ))
}

/// Wire name each bus event is published under
fn wire_name(event: &ExtractEvent) -> &'static str {
    match event {
        ExtractEvent::JobSubmitted { .. } => "submitted",
        ExtractEvent::JobProgress { .. } => "progress",
        ExtractEvent::JobLog { .. } => "log",
        ExtractEvent::JobCompleted { .. } => "complete",
        ExtractEvent::JobFailed { .. } => "error",
    }
}

/// Map a bus event onto a named SSE event with a JSON payload
fn to_sse_event(event: &ExtractEvent) -> Option<Event> {
    match serde_json::to_string(event) {
        Ok(json) => Some(Event::default().event(wire_name(event)).data(json)),
        Err(e) => {
            warn!(event_type = event.event_type(), error = %e, "SSE: failed to serialize event");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_every_event_maps_to_its_wire_name() {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let cases = [
            (
                ExtractEvent::JobSubmitted {
                    job_id: id,
                    video_source: "test://broadcast".to_string(),
                    total_segments: 3,
                    timestamp: now,
                },
                "submitted",
            ),
            (
                ExtractEvent::JobProgress {
                    job_id: id,
                    status: "EXECUTING".to_string(),
                    progress_percent: 33.3,
                    processed_segments: 1,
                    total_segments: 3,
                    hands_found: 2,
                    message: "Segment 1/3 complete".to_string(),
                    timestamp: now,
                },
                "progress",
            ),
            (
                ExtractEvent::JobLog {
                    job_id: id,
                    message: "sampling".to_string(),
                    timestamp: now,
                },
                "log",
            ),
            (
                ExtractEvent::JobCompleted {
                    job_id: id,
                    hands_found: 4,
                    total_errors: 1,
                    duration_seconds: 12,
                    timestamp: now,
                },
                "complete",
            ),
            (
                ExtractEvent::JobFailed {
                    job_id: id,
                    error: "decode failed".to_string(),
                    processed_segments: 1,
                    timestamp: now,
                },
                "error",
            ),
        ];

        for (event, expected) in &cases {
            assert_eq!(wire_name(event), *expected);
            assert!(to_sse_event(event).is_some());
        }
    }
}
