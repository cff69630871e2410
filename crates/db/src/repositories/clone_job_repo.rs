//! Repository for the `clone_jobs` queue table.

use muster_core::jobs::{CloneJobKind, JobStatus};
use muster_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::clone_job::CloneJobRow;

/// Column list for `clone_jobs` queries.
const COLUMNS: &str = "\
    id, kind, status, destination_event_id, payload, attempts, \
    last_error, result, worker_id, run_at, claimed_at, completed_at, \
    created_at, updated_at";

/// Statuses that occupy a destination event.
const LIVE_STATUSES: [&str; 2] = ["queued", "active"];

/// Queue operations over `clone_jobs`.
///
/// Status transitions are encoded in each `WHERE status = ...` clause; an
/// update that matches no row means the job was not in the expected state.
pub struct CloneJobRepo;

impl CloneJobRepo {
    /// Insert a queued job. Fails with a unique violation on
    /// `uq_clone_jobs_active_destination` if the destination already has a
    /// live job.
    pub async fn insert(
        pool: &PgPool,
        kind: CloneJobKind,
        destination_event_id: DbId,
        payload: &serde_json::Value,
    ) -> Result<CloneJobRow, sqlx::Error> {
        let query = format!(
            "INSERT INTO clone_jobs (kind, status, destination_event_id, payload) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CloneJobRow>(&query)
            .bind(kind.as_str())
            .bind(JobStatus::Queued.as_str())
            .bind(destination_event_id)
            .bind(payload)
            .fetch_one(pool)
            .await
    }

    /// Atomically claim the oldest runnable queued job.
    ///
    /// Uses `SELECT FOR UPDATE SKIP LOCKED` so concurrent workers never
    /// claim the same row.
    pub async fn claim_next(
        pool: &PgPool,
        worker_id: &str,
    ) -> Result<Option<CloneJobRow>, sqlx::Error> {
        let query = format!(
            "UPDATE clone_jobs \
             SET status = $1, worker_id = $2, claimed_at = NOW(), \
                 attempts = attempts + 1, updated_at = NOW() \
             WHERE id = ( \
                 SELECT id FROM clone_jobs \
                 WHERE status = $3 AND run_at <= NOW() \
                 ORDER BY run_at ASC, id ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CloneJobRow>(&query)
            .bind(JobStatus::Active.as_str())
            .bind(worker_id)
            .bind(JobStatus::Queued.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Mark an active job completed. Returns `false` if it was not active.
    pub async fn complete(
        pool: &PgPool,
        job_id: DbId,
        result: &serde_json::Value,
    ) -> Result<bool, sqlx::Error> {
        let done = sqlx::query(
            "UPDATE clone_jobs \
             SET status = $2, result = $3, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status = $4",
        )
        .bind(job_id)
        .bind(JobStatus::Completed.as_str())
        .bind(result)
        .bind(JobStatus::Active.as_str())
        .execute(pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    /// Return an active job to the queue. Returns `false` if it was not active.
    pub async fn retry_later(
        pool: &PgPool,
        job_id: DbId,
        error: &str,
        run_at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let done = sqlx::query(
            "UPDATE clone_jobs \
             SET status = $2, last_error = $3, run_at = $4, \
                 worker_id = NULL, claimed_at = NULL, updated_at = NOW() \
             WHERE id = $1 AND status = $5",
        )
        .bind(job_id)
        .bind(JobStatus::Queued.as_str())
        .bind(error)
        .bind(run_at)
        .bind(JobStatus::Active.as_str())
        .execute(pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    /// Mark an active job failed. Returns `false` if it was not active.
    pub async fn fail(pool: &PgPool, job_id: DbId, error: &str) -> Result<bool, sqlx::Error> {
        let done = sqlx::query(
            "UPDATE clone_jobs \
             SET status = $2, last_error = $3, completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status = $4",
        )
        .bind(job_id)
        .bind(JobStatus::Failed.as_str())
        .bind(error)
        .bind(JobStatus::Active.as_str())
        .execute(pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    pub async fn find_by_id(pool: &PgPool, job_id: DbId) -> Result<Option<CloneJobRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM clone_jobs WHERE id = $1");
        sqlx::query_as::<_, CloneJobRow>(&query)
            .bind(job_id)
            .fetch_optional(pool)
            .await
    }

    /// The queued or active job holding `destination_event_id`, if any.
    pub async fn find_live_for_destination(
        pool: &PgPool,
        destination_event_id: DbId,
    ) -> Result<Option<CloneJobRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM clone_jobs \
             WHERE destination_event_id = $1 AND status IN ($2, $3)"
        );
        sqlx::query_as::<_, CloneJobRow>(&query)
            .bind(destination_event_id)
            .bind(LIVE_STATUSES[0])
            .bind(LIVE_STATUSES[1])
            .fetch_optional(pool)
            .await
    }

    /// Queued and active jobs, oldest first.
    pub async fn list_live(pool: &PgPool) -> Result<Vec<CloneJobRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM clone_jobs WHERE status IN ($1, $2) ORDER BY created_at, id"
        );
        sqlx::query_as::<_, CloneJobRow>(&query)
            .bind(LIVE_STATUSES[0])
            .bind(LIVE_STATUSES[1])
            .fetch_all(pool)
            .await
    }

    /// Requeue active jobs claimed before `claimed_before`.
    pub async fn requeue_stale(pool: &PgPool, claimed_before: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE clone_jobs \
             SET status = $1, worker_id = NULL, claimed_at = NULL, \
                 run_at = NOW(), updated_at = NOW() \
             WHERE status = $2 AND claimed_at < $3",
        )
        .bind(JobStatus::Queued.as_str())
        .bind(JobStatus::Active.as_str())
        .bind(claimed_before)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
