//! PostgreSQL implementation of [`JobQueue`].

use async_trait::async_trait;
use muster_core::clone::CloneError;
use muster_core::jobs::{CloneJob, CloneJobKind, CloneJobPayload, JobQueue, JobStatus};
use muster_core::types::{DbId, Timestamp};

use crate::error::{queue_error, unique_violation, ACTIVE_JOB_INDEX};
use crate::repositories::CloneJobRepo;
use crate::DbPool;

/// Job queue stored in the `clone_jobs` table.
#[derive(Debug, Clone)]
pub struct PgJobQueue {
    pool: DbPool,
}

impl PgJobQueue {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Turn a conditional update that matched nothing into the right error.
    async fn rejected_transition(&self, job_id: DbId, next: JobStatus) -> CloneError {
        match self.find(job_id).await {
            Ok(Some(job)) => match job.status.transition(next) {
                Err(err) => err,
                Ok(_) => CloneError::Queue(format!("Job {job_id} changed concurrently")),
            },
            Ok(None) => CloneError::NotFound {
                entity: "CloneJob",
                id: job_id,
            },
            Err(err) => err,
        }
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn enqueue(
        &self,
        kind: CloneJobKind,
        payload: &CloneJobPayload,
    ) -> Result<CloneJob, CloneError> {
        let destination_event_id = payload.new_event.id;
        let value = serde_json::to_value(payload)?;

        match CloneJobRepo::insert(&self.pool, kind, destination_event_id, &value).await {
            Ok(row) => row.try_into(),
            Err(err) if unique_violation(&err) == Some(ACTIVE_JOB_INDEX) => {
                let holder = CloneJobRepo::find_live_for_destination(&self.pool, destination_event_id)
                    .await
                    .map_err(queue_error)?
                    .and_then(|row| CloneJobKind::parse(&row.kind))
                    .unwrap_or(kind);
                tracing::debug!(
                    destination_event_id,
                    requested = kind.as_str(),
                    "Destination already has a live job"
                );
                Err(CloneError::AlreadyInProgress {
                    event_id: destination_event_id,
                    operation: holder.operation(),
                })
            }
            Err(err) => Err(queue_error(err)),
        }
    }

    async fn claim_next(&self, worker_id: &str) -> Result<Option<CloneJob>, CloneError> {
        CloneJobRepo::claim_next(&self.pool, worker_id)
            .await
            .map_err(queue_error)?
            .map(CloneJob::try_from)
            .transpose()
    }

    async fn complete(&self, job_id: DbId, result: &serde_json::Value) -> Result<(), CloneError> {
        let done = CloneJobRepo::complete(&self.pool, job_id, result)
            .await
            .map_err(queue_error)?;
        if done {
            Ok(())
        } else {
            Err(self.rejected_transition(job_id, JobStatus::Completed).await)
        }
    }

    async fn retry_later(
        &self,
        job_id: DbId,
        error: &str,
        run_at: Timestamp,
    ) -> Result<(), CloneError> {
        let done = CloneJobRepo::retry_later(&self.pool, job_id, error, run_at)
            .await
            .map_err(queue_error)?;
        if done {
            Ok(())
        } else {
            Err(self.rejected_transition(job_id, JobStatus::Queued).await)
        }
    }

    async fn fail(&self, job_id: DbId, error: &str) -> Result<(), CloneError> {
        let done = CloneJobRepo::fail(&self.pool, job_id, error)
            .await
            .map_err(queue_error)?;
        if done {
            Ok(())
        } else {
            Err(self.rejected_transition(job_id, JobStatus::Failed).await)
        }
    }

    async fn find(&self, job_id: DbId) -> Result<Option<CloneJob>, CloneError> {
        CloneJobRepo::find_by_id(&self.pool, job_id)
            .await
            .map_err(queue_error)?
            .map(CloneJob::try_from)
            .transpose()
    }

    async fn list_active(&self) -> Result<Vec<CloneJob>, CloneError> {
        CloneJobRepo::list_live(&self.pool)
            .await
            .map_err(queue_error)?
            .into_iter()
            .map(CloneJob::try_from)
            .collect()
    }

    async fn requeue_stale(&self, claimed_before: Timestamp) -> Result<u64, CloneError> {
        CloneJobRepo::requeue_stale(&self.pool, claimed_before)
            .await
            .map_err(queue_error)
    }
}
