//! Extraction job state machine
//!
//! A job progresses PENDING → EXECUTING → {SUCCESS, FAILURE}. Terminal states
//! never transition further; terminal jobs only disappear via the registry's
//! TTL sweep.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::hand::CandidateHand;
use crate::validator::ErrorReport;

/// Job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    /// Accepted, not yet started
    Pending,
    /// Pipeline running segment by segment
    Executing,
    /// All segments processed, output attached
    Success,
    /// A stage exhausted retries or the job was cancelled
    Failure,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Executing => "EXECUTING",
            JobStatus::Success => "SUCCESS",
            JobStatus::Failure => "FAILURE",
        }
    }
}

/// Status change record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusTransition {
    pub job_id: Uuid,
    pub old_status: JobStatus,
    pub new_status: JobStatus,
    pub transitioned_at: DateTime<Utc>,
}

/// Final pipeline output handed to the persistence collaborator on SUCCESS
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutput {
    /// Accepted hands, ordered by timestamp_seconds
    pub hands: Vec<CandidateHand>,
    /// Validation report covering all candidate hands, accepted or not
    pub report: ErrorReport,
}

/// Run-level aggregate owned by the job coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub status: JobStatus,
    /// 0.0-100.0, monotonically non-decreasing
    pub progress_percent: f32,
    pub total_segments: usize,
    pub processed_segments: usize,
    /// Accepted hands so far (final count once terminal)
    pub hands_found: usize,
    /// Terminal error message, set only on FAILURE
    pub error: Option<String>,
    /// Attached on SUCCESS; FAILURE keeps only the report for diagnostics
    pub output: Option<JobOutput>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(total_segments: usize) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: JobStatus::Pending,
            progress_percent: 0.0,
            total_segments,
            processed_segments: 0,
            hands_found: 0,
            error: None,
            output: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Transition to a new status
    pub fn transition_to(&mut self, new_status: JobStatus) -> StatusTransition {
        let transition = StatusTransition {
            job_id: self.id,
            old_status: self.status,
            new_status,
            transitioned_at: Utc::now(),
        };
        self.status = new_status;
        self.updated_at = transition.transitioned_at;

        if matches!(new_status, JobStatus::Success | JobStatus::Failure) {
            self.completed_at = Some(transition.transitioned_at);
        }

        transition
    }

    /// Update segment progress. Progress percent never regresses, even if
    /// counters are replayed.
    pub fn update_progress(&mut self, processed_segments: usize, hands_found: usize) {
        self.processed_segments = self.processed_segments.max(processed_segments);
        self.hands_found = hands_found;

        let percentage = if self.total_segments > 0 {
            (self.processed_segments as f32 / self.total_segments as f32) * 100.0
        } else {
            0.0
        };
        self.progress_percent = self.progress_percent.max(percentage);
        self.updated_at = Utc::now();
    }

    /// Record terminal failure
    pub fn fail(&mut self, message: impl Into<String>) -> StatusTransition {
        self.error = Some(message.into());
        self.transition_to(JobStatus::Failure)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Success | JobStatus::Failure)
    }

    /// Eligible for the TTL sweep: older than the retention window,
    /// regardless of status
    pub fn is_expired(&self, retention_seconds: u64) -> bool {
        let age = Utc::now() - self.created_at;
        age.num_seconds() >= retention_seconds as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_job_is_pending() {
        let job = Job::new(5);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress_percent, 0.0);
        assert!(!job.is_terminal());
        assert!(job.completed_at.is_none());
    }

    #[test]
    fn test_transition_records_old_and_new() {
        let mut job = Job::new(3);
        let t = job.transition_to(JobStatus::Executing);
        assert_eq!(t.old_status, JobStatus::Pending);
        assert_eq!(t.new_status, JobStatus::Executing);
        assert_eq!(job.status, JobStatus::Executing);
        assert!(job.completed_at.is_none());
    }

    #[test]
    fn test_terminal_states_set_completed_at() {
        let mut job = Job::new(3);
        job.transition_to(JobStatus::Executing);
        job.transition_to(JobStatus::Success);
        assert!(job.is_terminal());
        assert!(job.completed_at.is_some());

        let mut failed = Job::new(3);
        failed.transition_to(JobStatus::Executing);
        failed.fail("decode error");
        assert!(failed.is_terminal());
        assert_eq!(failed.error.as_deref(), Some("decode error"));
        assert!(failed.completed_at.is_some());
    }

    #[test]
    fn test_progress_calculation() {
        let mut job = Job::new(4);
        job.update_progress(1, 2);
        assert_eq!(job.progress_percent, 25.0);
        assert_eq!(job.hands_found, 2);

        job.update_progress(4, 7);
        assert_eq!(job.progress_percent, 100.0);
        assert_eq!(job.processed_segments, 4);
    }

    #[test]
    fn test_progress_never_regresses() {
        let mut job = Job::new(4);
        job.update_progress(3, 5);
        assert_eq!(job.progress_percent, 75.0);

        // Replayed stale update must not move progress backwards
        job.update_progress(1, 5);
        assert_eq!(job.progress_percent, 75.0);
        assert_eq!(job.processed_segments, 3);
    }

    #[test]
    fn test_zero_segments_progress() {
        let mut job = Job::new(0);
        job.update_progress(0, 0);
        assert_eq!(job.progress_percent, 0.0);
    }

    #[test]
    fn test_status_serialization_uppercase() {
        let json = serde_json::to_string(&JobStatus::Executing).expect("serialize");
        assert_eq!(json, "\"EXECUTING\"");
        let back: JobStatus = serde_json::from_str("\"FAILURE\"").expect("deserialize");
        assert_eq!(back, JobStatus::Failure);
    }

    #[test]
    fn test_expiry() {
        let mut job = Job::new(1);
        assert!(!job.is_expired(3600));

        job.created_at = Utc::now() - chrono::Duration::seconds(7200);
        assert!(job.is_expired(3600));
    }
}
