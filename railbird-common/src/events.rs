//! Event types for the Railbird event system
//!
//! Provides shared event definitions and the EventBus used to fan job
//! progress out to SSE subscribers.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Extraction job events
///
/// Events are broadcast via EventBus and serialized for SSE transmission.
/// All job lifecycle notifications flow through this central enum so
/// handling stays exhaustive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExtractEvent {
    /// Job accepted and queued
    JobSubmitted {
        /// Job UUID
        job_id: Uuid,
        /// Video source being processed
        video_source: String,
        /// Number of segments the window was split into
        total_segments: usize,
        /// When the job was submitted
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Progress update, emitted after each segment completes
    JobProgress {
        /// Job UUID
        job_id: Uuid,
        /// Current job status string (PENDING/EXECUTING/...)
        status: String,
        /// Progress percentage (0.0-100.0), monotonically non-decreasing
        progress_percent: f32,
        /// Segments fully processed so far
        processed_segments: usize,
        /// Total segments in the window
        total_segments: usize,
        /// Accepted hands found so far
        hands_found: usize,
        /// Human-readable description of the current stage
        message: String,
        /// When progress was recorded
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Diagnostic log line attached to a job
    JobLog {
        /// Job UUID
        job_id: Uuid,
        /// Log message
        message: String,
        /// When the message was logged
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Job reached SUCCESS
    JobCompleted {
        /// Job UUID
        job_id: Uuid,
        /// Final count of accepted hands
        hands_found: usize,
        /// Total errors recorded in the validation report
        total_errors: usize,
        /// Run duration in seconds
        duration_seconds: u64,
        /// When the job completed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Job reached FAILURE
    JobFailed {
        /// Job UUID
        job_id: Uuid,
        /// Terminal error message
        error: String,
        /// Segments processed before the failure
        processed_segments: usize,
        /// When the job failed
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl ExtractEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            ExtractEvent::JobSubmitted { .. } => "JobSubmitted",
            ExtractEvent::JobProgress { .. } => "JobProgress",
            ExtractEvent::JobLog { .. } => "JobLog",
            ExtractEvent::JobCompleted { .. } => "JobCompleted",
            ExtractEvent::JobFailed { .. } => "JobFailed",
        }
    }

    /// Job this event belongs to
    pub fn job_id(&self) -> Uuid {
        match self {
            ExtractEvent::JobSubmitted { job_id, .. }
            | ExtractEvent::JobProgress { job_id, .. }
            | ExtractEvent::JobLog { job_id, .. }
            | ExtractEvent::JobCompleted { job_id, .. }
            | ExtractEvent::JobFailed { job_id, .. } => *job_id,
        }
    }
}

/// Central event distribution bus for job lifecycle events
///
/// Wraps tokio::broadcast, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ExtractEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ExtractEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: ExtractEvent,
    ) -> Result<usize, broadcast::error::SendError<ExtractEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Progress updates are best-effort; it is acceptable for nobody to be
    /// watching a job while it runs.
    pub fn emit_lossy(&self, event: ExtractEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
