use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::clone::error::CloneError;
use crate::jobs::{CloneJob, CloneJobKind, CloneJobPayload, JobQueue, JobStatus};
use crate::types::{DbId, Timestamp};

#[derive(Debug, Default)]
struct Jobs {
    next_id: DbId,
    rows: BTreeMap<DbId, CloneJob>,
}

impl Jobs {
    fn get_mut(&mut self, job_id: DbId) -> Result<&mut CloneJob, CloneError> {
        self.rows.get_mut(&job_id).ok_or(CloneError::NotFound {
            entity: "CloneJob",
            id: job_id,
        })
    }
}

/// Job queue held in memory, with the same one-active-job-per-event rule
/// and status machine as the database queue.
#[derive(Debug, Default)]
pub struct MemoryJobQueue {
    jobs: Mutex<Jobs>,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every job regardless of status, oldest first.
    pub async fn all(&self) -> Vec<CloneJob> {
        self.jobs.lock().await.rows.values().cloned().collect()
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(
        &self,
        kind: CloneJobKind,
        payload: &CloneJobPayload,
    ) -> Result<CloneJob, CloneError> {
        let mut jobs = self.jobs.lock().await;
        let destination_event_id = payload.new_event.id;

        if let Some(existing) = jobs
            .rows
            .values()
            .find(|j| j.destination_event_id == destination_event_id && !j.status.is_terminal())
        {
            return Err(CloneError::AlreadyInProgress {
                event_id: destination_event_id,
                operation: existing.kind.operation(),
            });
        }

        jobs.next_id += 1;
        let now = Utc::now();
        let job = CloneJob {
            id: jobs.next_id,
            kind,
            status: JobStatus::Queued,
            destination_event_id,
            payload: payload.clone(),
            attempts: 0,
            last_error: None,
            result: None,
            worker_id: None,
            run_at: now,
            claimed_at: None,
            completed_at: None,
            created_at: now,
        };
        jobs.rows.insert(job.id, job.clone());
        Ok(job)
    }

    async fn claim_next(&self, worker_id: &str) -> Result<Option<CloneJob>, CloneError> {
        let mut jobs = self.jobs.lock().await;
        let now = Utc::now();

        let next = jobs
            .rows
            .values()
            .filter(|j| j.status == JobStatus::Queued && j.run_at <= now)
            .min_by_key(|j| (j.run_at, j.id))
            .map(|j| j.id);

        let Some(job_id) = next else {
            return Ok(None);
        };

        let job = jobs.get_mut(job_id)?;
        job.status = job.status.transition(JobStatus::Active)?;
        job.attempts += 1;
        job.worker_id = Some(worker_id.to_string());
        job.claimed_at = Some(now);
        Ok(Some(job.clone()))
    }

    async fn complete(&self, job_id: DbId, result: &serde_json::Value) -> Result<(), CloneError> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs.get_mut(job_id)?;
        job.status = job.status.transition(JobStatus::Completed)?;
        job.result = Some(result.clone());
        job.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn retry_later(
        &self,
        job_id: DbId,
        error: &str,
        run_at: Timestamp,
    ) -> Result<(), CloneError> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs.get_mut(job_id)?;
        job.status = job.status.transition(JobStatus::Queued)?;
        job.last_error = Some(error.to_string());
        job.run_at = run_at;
        job.worker_id = None;
        job.claimed_at = None;
        Ok(())
    }

    async fn fail(&self, job_id: DbId, error: &str) -> Result<(), CloneError> {
        let mut jobs = self.jobs.lock().await;
        let job = jobs.get_mut(job_id)?;
        job.status = job.status.transition(JobStatus::Failed)?;
        job.last_error = Some(error.to_string());
        job.completed_at = Some(Utc::now());
        Ok(())
    }

    async fn find(&self, job_id: DbId) -> Result<Option<CloneJob>, CloneError> {
        Ok(self.jobs.lock().await.rows.get(&job_id).cloned())
    }

    async fn list_active(&self) -> Result<Vec<CloneJob>, CloneError> {
        let jobs = self.jobs.lock().await;
        Ok(jobs
            .rows
            .values()
            .filter(|j| !j.status.is_terminal())
            .cloned()
            .collect())
    }

    async fn requeue_stale(&self, claimed_before: Timestamp) -> Result<u64, CloneError> {
        let mut jobs = self.jobs.lock().await;
        let mut requeued = 0;
        for job in jobs.rows.values_mut() {
            let stale = job.status == JobStatus::Active
                && job.claimed_at.is_some_and(|at| at < claimed_before);
            if stale {
                job.status = job.status.transition(JobStatus::Queued)?;
                job.worker_id = None;
                job.claimed_at = None;
                job.run_at = Utc::now();
                requeued += 1;
            }
        }
        Ok(requeued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clone::CloneOperation;
    use crate::domain::{Event, JobUser};
    use crate::jobs::ImportMode;
    use assert_matches::assert_matches;
    use chrono::Duration;

    fn payload(destination_id: DbId) -> CloneJobPayload {
        let now = Utc::now();
        CloneJobPayload {
            id: 1,
            new_event: Event {
                id: destination_id,
                company_id: 1,
                name: "Expo".to_string(),
                cloning_in_progress: false,
                importing_in_progress: false,
                created_at: now,
                updated_at: now,
            },
            user: JobUser {
                id: 5,
                role: "admin".to_string(),
            },
            import_mode: ImportMode::Replace,
        }
    }

    #[tokio::test]
    async fn claim_moves_oldest_job_to_active() {
        let queue = MemoryJobQueue::new();
        let first = queue
            .enqueue(CloneJobKind::EventAssociation, &payload(10))
            .await
            .unwrap();
        queue
            .enqueue(CloneJobKind::ImportAssociation, &payload(11))
            .await
            .unwrap();

        let claimed = queue.claim_next("worker-0").await.unwrap().unwrap();

        assert_eq!(claimed.id, first.id);
        assert_eq!(claimed.status, JobStatus::Active);
        assert_eq!(claimed.attempts, 1);
        assert_eq!(claimed.worker_id.as_deref(), Some("worker-0"));
    }

    #[tokio::test]
    async fn second_job_for_same_destination_is_rejected() {
        let queue = MemoryJobQueue::new();
        queue
            .enqueue(CloneJobKind::EventAssociation, &payload(10))
            .await
            .unwrap();

        let result = queue
            .enqueue(CloneJobKind::ImportAssociation, &payload(10))
            .await;

        assert_matches!(
            result,
            Err(CloneError::AlreadyInProgress {
                event_id: 10,
                operation: CloneOperation::Clone,
            })
        );
    }

    #[tokio::test]
    async fn destination_is_free_again_after_completion() {
        let queue = MemoryJobQueue::new();
        let job = queue
            .enqueue(CloneJobKind::ImportAssociation, &payload(10))
            .await
            .unwrap();
        queue.claim_next("w").await.unwrap();
        queue
            .complete(job.id, &serde_json::json!({"ok": true}))
            .await
            .unwrap();

        queue
            .enqueue(CloneJobKind::ImportAssociation, &payload(10))
            .await
            .unwrap();
        assert_eq!(queue.list_active().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn completing_a_queued_job_is_illegal() {
        let queue = MemoryJobQueue::new();
        let job = queue
            .enqueue(CloneJobKind::EventAssociation, &payload(10))
            .await
            .unwrap();

        let result = queue.complete(job.id, &serde_json::Value::Null).await;

        assert_matches!(result, Err(CloneError::Queue(_)));
    }

    #[tokio::test]
    async fn retried_job_waits_until_run_at() {
        let queue = MemoryJobQueue::new();
        let job = queue
            .enqueue(CloneJobKind::EventAssociation, &payload(10))
            .await
            .unwrap();
        queue.claim_next("w").await.unwrap();

        queue
            .retry_later(job.id, "connection reset", Utc::now() + Duration::hours(1))
            .await
            .unwrap();

        assert!(queue.claim_next("w").await.unwrap().is_none());
        let stored = queue.find(job.id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Queued);
        assert_eq!(stored.last_error.as_deref(), Some("connection reset"));
    }

    #[tokio::test]
    async fn stale_active_jobs_are_requeued() {
        let queue = MemoryJobQueue::new();
        let job = queue
            .enqueue(CloneJobKind::EventAssociation, &payload(10))
            .await
            .unwrap();
        queue.claim_next("crashed").await.unwrap();

        let requeued = queue
            .requeue_stale(Utc::now() + Duration::seconds(1))
            .await
            .unwrap();

        assert_eq!(requeued, 1);
        let reclaimed = queue.claim_next("w").await.unwrap().unwrap();
        assert_eq!(reclaimed.id, job.id);
        assert_eq!(reclaimed.attempts, 2);
    }

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let queue = MemoryJobQueue::new();
        let result = queue.fail(77, "boom").await;
        assert_matches!(result, Err(CloneError::NotFound { entity: "CloneJob", id: 77 }));
    }
}
