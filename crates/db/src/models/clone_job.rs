//! Clone job queue row model.

use muster_core::clone::CloneError;
use muster_core::jobs::{CloneJob, CloneJobKind, CloneJobPayload, JobStatus};
use muster_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `clone_jobs` table.
///
/// `kind`, `status` and `payload` are stored as text and JSONB and
/// validated on conversion into [`CloneJob`].
#[derive(Debug, Clone, FromRow)]
pub struct CloneJobRow {
    pub id: DbId,
    pub kind: String,
    pub status: String,
    pub destination_event_id: DbId,
    pub payload: serde_json::Value,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub result: Option<serde_json::Value>,
    pub worker_id: Option<String>,
    pub run_at: Timestamp,
    pub claimed_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl TryFrom<CloneJobRow> for CloneJob {
    type Error = CloneError;

    fn try_from(row: CloneJobRow) -> Result<Self, Self::Error> {
        let kind = CloneJobKind::parse(&row.kind)
            .ok_or_else(|| CloneError::Queue(format!("Unknown job kind '{}'", row.kind)))?;
        let status = JobStatus::parse(&row.status)
            .ok_or_else(|| CloneError::Queue(format!("Unknown job status '{}'", row.status)))?;
        let payload: CloneJobPayload = serde_json::from_value(row.payload)?;

        Ok(CloneJob {
            id: row.id,
            kind,
            status,
            destination_event_id: row.destination_event_id,
            payload,
            attempts: row.attempts,
            last_error: row.last_error,
            result: row.result,
            worker_id: row.worker_id,
            run_at: row.run_at,
            claimed_at: row.claimed_at,
            completed_at: row.completed_at,
            created_at: row.created_at,
        })
    }
}
