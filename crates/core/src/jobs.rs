//! Background clone job model (queue payloads, lifecycle, retry policy).
//!
//! A job is created by the queue service when a clone or import is
//! requested and drained later by the worker pool:
//!
//! ```text
//! queued -> active -> completed
//!                  -> failed
//!                  -> queued   (scheduled retry)
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::clone::error::CloneError;
use crate::clone::CloneOperation;
use crate::domain::{Event, JobUser};
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Job kind
// ---------------------------------------------------------------------------

/// The named job types placed on the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CloneJobKind {
    /// Copy the source event's associations into a freshly created event.
    #[serde(rename = "eventAssociation")]
    EventAssociation,
    /// Merge the source event's associations into an existing event.
    #[serde(rename = "importAssociation")]
    ImportAssociation,
}

impl CloneJobKind {
    /// Queue name stored with the job row.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EventAssociation => "eventAssociation",
            Self::ImportAssociation => "importAssociation",
        }
    }

    /// Parse a stored queue name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "eventAssociation" => Some(Self::EventAssociation),
            "importAssociation" => Some(Self::ImportAssociation),
            _ => None,
        }
    }

    /// The guarded operation this job performs on its destination event.
    pub fn operation(self) -> CloneOperation {
        match self {
            Self::EventAssociation => CloneOperation::Clone,
            Self::ImportAssociation => CloneOperation::Import,
        }
    }
}

// ---------------------------------------------------------------------------
// Job status
// ---------------------------------------------------------------------------

/// Lifecycle state of a queued job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Active,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "queued" => Some(Self::Queued),
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Completed and failed jobs never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether `self -> next` is an edge of the job state machine.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Active)
                | (Self::Active, Self::Completed)
                | (Self::Active, Self::Failed)
                | (Self::Active, Self::Queued)
        )
    }

    /// Validate a transition, returning a [`CloneError::Queue`] if illegal.
    pub fn transition(self, next: JobStatus) -> Result<JobStatus, CloneError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CloneError::Queue(format!(
                "Illegal job status transition {} -> {}",
                self.as_str(),
                next.as_str()
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// How an import treats associations already on the destination event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    /// Remove every existing association first, then copy the source's.
    #[default]
    Replace,
    /// Keep existing associations and add the source's missing ones.
    Merge,
}

/// Job payload, serialized as `{ "id", "newEvent", "user" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloneJobPayload {
    /// Source event whose associations are copied.
    pub id: DbId,
    /// Destination event (new for clones, existing for imports).
    pub new_event: Event,
    /// Acting user.
    pub user: JobUser,
    /// Only meaningful for `importAssociation` jobs.
    #[serde(default)]
    pub import_mode: ImportMode,
}

// ---------------------------------------------------------------------------
// Job row
// ---------------------------------------------------------------------------

/// A job as stored by a [`JobQueue`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloneJob {
    pub id: DbId,
    pub kind: CloneJobKind,
    pub status: JobStatus,
    pub destination_event_id: DbId,
    pub payload: CloneJobPayload,
    /// Number of times the job has been claimed.
    pub attempts: i32,
    pub last_error: Option<String>,
    pub result: Option<serde_json::Value>,
    pub worker_id: Option<String>,
    pub run_at: Timestamp,
    pub claimed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// Default number of attempts before a job is marked failed.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay before the first retry.
pub const DEFAULT_RETRY_BASE: Duration = Duration::from_secs(2);

/// Default upper bound for a single retry delay.
pub const DEFAULT_RETRY_MAX: Duration = Duration::from_secs(60);

/// Exponential backoff applied by the worker pool to failed jobs.
///
/// Attempt `n` (1-based) waits `base * 2^(n-1)`, capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_RETRY_BASE,
            max_delay: DEFAULT_RETRY_MAX,
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt - 1);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Whether a job that failed on `attempt` with `error` should run again.
    pub fn should_retry(&self, attempt: u32, error: &CloneError) -> bool {
        error.is_retryable() && attempt < self.max_attempts
    }
}

// ---------------------------------------------------------------------------
// Queue seam
// ---------------------------------------------------------------------------

/// Durable queue of clone and import jobs.
///
/// At most one queued or active job may exist per destination event;
/// `enqueue` reports a second one as [`CloneError::AlreadyInProgress`].
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Add a job in `queued` state, runnable immediately.
    async fn enqueue(
        &self,
        kind: CloneJobKind,
        payload: &CloneJobPayload,
    ) -> Result<CloneJob, CloneError>;

    /// Claim the oldest runnable queued job, moving it to `active`.
    async fn claim_next(&self, worker_id: &str) -> Result<Option<CloneJob>, CloneError>;

    /// Mark an active job completed with its result.
    async fn complete(&self, job_id: DbId, result: &serde_json::Value) -> Result<(), CloneError>;

    /// Put an active job back in the queue to run again at `run_at`.
    async fn retry_later(
        &self,
        job_id: DbId,
        error: &str,
        run_at: Timestamp,
    ) -> Result<(), CloneError>;

    /// Mark an active job permanently failed.
    async fn fail(&self, job_id: DbId, error: &str) -> Result<(), CloneError>;

    /// Look up a job by id.
    async fn find(&self, job_id: DbId) -> Result<Option<CloneJob>, CloneError>;

    /// All queued and active jobs, oldest first.
    async fn list_active(&self) -> Result<Vec<CloneJob>, CloneError>;

    /// Return jobs claimed before `claimed_before` and still active to the queue.
    async fn requeue_stale(&self, claimed_before: Timestamp) -> Result<u64, CloneError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn job_kind_round_trips_through_queue_name() {
        for kind in [CloneJobKind::EventAssociation, CloneJobKind::ImportAssociation] {
            assert_eq!(CloneJobKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(CloneJobKind::parse("somethingElse"), None);
    }

    #[test]
    fn job_kind_maps_to_guarded_operation() {
        assert_eq!(CloneJobKind::EventAssociation.operation(), CloneOperation::Clone);
        assert_eq!(CloneJobKind::ImportAssociation.operation(), CloneOperation::Import);
    }

    #[test]
    fn status_machine_allows_only_documented_edges() {
        use JobStatus::*;
        assert!(Queued.can_transition_to(Active));
        assert!(Active.can_transition_to(Completed));
        assert!(Active.can_transition_to(Failed));
        assert!(Active.can_transition_to(Queued));

        assert!(!Queued.can_transition_to(Completed));
        assert!(!Queued.can_transition_to(Failed));
        assert!(!Completed.can_transition_to(Queued));
        assert!(!Failed.can_transition_to(Active));
    }

    #[test]
    fn illegal_transition_is_a_queue_error() {
        assert_matches!(
            JobStatus::Completed.transition(JobStatus::Active),
            Err(CloneError::Queue(_))
        );
        assert_eq!(
            JobStatus::Queued.transition(JobStatus::Active).unwrap(),
            JobStatus::Active
        );
    }

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Active.is_terminal());
    }

    #[test]
    fn backoff_grows_geometrically() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        };
        assert_eq!(policy.delay_for(0), Duration::ZERO);
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
    }

    #[test]
    fn backoff_is_capped() {
        let policy = RetryPolicy {
            max_attempts: 50,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(3),
        };
        assert_eq!(policy.delay_for(10), Duration::from_secs(3));
        assert_eq!(policy.delay_for(40), Duration::from_secs(3));
    }

    #[test]
    fn retries_stop_at_max_attempts_and_skip_permanent_errors() {
        let policy = RetryPolicy::default();
        let transient = CloneError::Store("connection reset".into());
        assert!(policy.should_retry(1, &transient));
        assert!(policy.should_retry(2, &transient));
        assert!(!policy.should_retry(3, &transient));

        let missing = CloneError::NotFound { entity: "Event", id: 1 };
        assert!(!policy.should_retry(1, &missing));
    }

    #[test]
    fn payload_uses_wire_field_names() {
        let payload = CloneJobPayload {
            id: 3,
            new_event: Event {
                id: 8,
                company_id: 1,
                name: "Summit [Clone 1]".into(),
                cloning_in_progress: false,
                importing_in_progress: false,
                created_at: chrono::Utc::now(),
                updated_at: chrono::Utc::now(),
            },
            user: JobUser { id: 5, role: "admin".into() },
            import_mode: ImportMode::Replace,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["newEvent"]["id"], 8);
        assert_eq!(json["user"]["id"], 5);
    }

    #[test]
    fn payload_without_import_mode_defaults_to_replace() {
        let json = serde_json::json!({
            "id": 3,
            "newEvent": {
                "id": 8,
                "company_id": 1,
                "name": "Summit",
                "cloning_in_progress": false,
                "importing_in_progress": false,
                "created_at": "2024-05-01T00:00:00Z",
                "updated_at": "2024-05-01T00:00:00Z"
            },
            "user": {"id": 5, "role": "admin"}
        });
        let payload: CloneJobPayload = serde_json::from_value(json).unwrap();
        assert_eq!(payload.import_mode, ImportMode::Replace);
    }
}
