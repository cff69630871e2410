//! Concurrent claim loops over the clone job queue.
//!
//! Each loop polls [`JobQueue::claim_next`] every `poll_interval`, drains
//! every runnable job it can, and stops claiming once the cancellation
//! token fires. A job already in flight always runs to completion.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use muster_core::clone::{AssociationStore, CloneError, CloneProcessor, CloneReport};
use muster_core::jobs::{CloneJob, JobQueue, JobStatus};
use muster_core::types::DbId;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::WorkerConfig;

/// Attempts at recording a finished job before giving up on it.
const COMPLETE_ATTEMPTS: u32 = 3;

/// What happened to a claimed job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed { job_id: DbId },
    Retried { job_id: DbId, delay: Duration },
    Failed { job_id: DbId, error: String },
}

/// Result of the startup recovery sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryReport {
    pub requeued_jobs: u64,
    pub released_guards: u64,
}

/// Pool of claim loops sharing one store, queue and processor.
pub struct WorkerPool<S> {
    store: Arc<S>,
    queue: Arc<dyn JobQueue>,
    processor: CloneProcessor<S>,
    config: WorkerConfig,
}

impl<S: AssociationStore + 'static> WorkerPool<S> {
    pub fn new(
        store: Arc<S>,
        queue: Arc<dyn JobQueue>,
        processor: CloneProcessor<S>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            queue,
            processor,
            config,
        }
    }

    /// Recover from a previous crash.
    ///
    /// Jobs left `active` beyond the lease timeout go back to the queue,
    /// then guard flags on events with no active job are cleared.
    pub async fn recover(&self) -> Result<RecoveryReport, CloneError> {
        let lease = chrono::Duration::from_std(self.config.lease_timeout)
            .map_err(|e| CloneError::Internal(format!("Invalid lease timeout: {e}")))?;
        let requeued_jobs = self.queue.requeue_stale(Utc::now() - lease).await?;

        let held: Vec<DbId> = self
            .queue
            .list_active()
            .await?
            .into_iter()
            .filter(|job| job.status == JobStatus::Active)
            .map(|job| job.destination_event_id)
            .collect();
        let released_guards = self.store.release_stale_guards(&held).await?;

        let report = RecoveryReport {
            requeued_jobs,
            released_guards,
        };
        if requeued_jobs > 0 || released_guards > 0 {
            tracing::warn!(requeued_jobs, released_guards, "Recovered stale clone work");
        }
        Ok(report)
    }

    /// Run recovery, then `concurrency` claim loops until `cancel` fires.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        if let Err(e) = self.recover().await {
            tracing::error!(error = %e, "Startup recovery failed");
        }

        tracing::info!(
            concurrency = self.config.concurrency,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            max_attempts = self.config.retry.max_attempts,
            "Worker pool started",
        );

        let mut loops = JoinSet::new();
        for n in 0..self.config.concurrency {
            let pool = Arc::clone(&self);
            let cancel = cancel.clone();
            let worker_id = format!("worker-{}-{n}", std::process::id());
            loops.spawn(async move { pool.claim_loop(worker_id, cancel).await });
        }

        while let Some(joined) = loops.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Worker loop panicked");
            }
        }
        tracing::info!("Worker pool stopped");
    }

    async fn claim_loop(&self, worker_id: String, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(worker_id, "Claim loop shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    self.drain(&worker_id, &cancel).await;
                }
            }
        }
    }

    /// Run jobs back to back until the queue is empty or shutdown begins.
    async fn drain(&self, worker_id: &str, cancel: &CancellationToken) {
        while !cancel.is_cancelled() {
            match self.run_once(worker_id).await {
                Ok(Some(_)) => continue,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(worker_id, error = %e, "Claim cycle failed");
                    break;
                }
            }
        }
    }

    /// Claim and run a single job. Returns `None` when nothing is runnable.
    pub async fn run_once(&self, worker_id: &str) -> Result<Option<JobOutcome>, CloneError> {
        let Some(job) = self.queue.claim_next(worker_id).await? else {
            return Ok(None);
        };

        tracing::info!(
            job_id = job.id,
            worker_id,
            kind = job.kind.as_str(),
            attempt = job.attempts,
            destination_event_id = job.destination_event_id,
            "Job claimed",
        );

        let outcome = match self.processor.process(job.kind, &job.payload).await {
            Ok(report) => match self.finish(&job, &report).await {
                Ok(()) => {
                    tracing::info!(job_id = job.id, "Job completed");
                    JobOutcome::Completed { job_id: job.id }
                }
                Err(e) => {
                    // The work is committed, so the job must not run again.
                    let message = format!("Work committed but completion was not recorded: {e}");
                    self.queue.fail(job.id, &message).await?;
                    tracing::error!(job_id = job.id, error = %e, "Job completion could not be recorded");
                    JobOutcome::Failed {
                        job_id: job.id,
                        error: message,
                    }
                }
            },
            Err(e) => self.handle_failure(&job, e).await?,
        };

        Ok(Some(outcome))
    }

    /// Record the report on the job, retrying transient queue errors.
    async fn finish(&self, job: &CloneJob, report: &CloneReport) -> Result<(), CloneError> {
        let result = serde_json::to_value(report)?;
        let mut attempt = 1;
        loop {
            match self.queue.complete(job.id, &result).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < COMPLETE_ATTEMPTS && e.is_retryable() => {
                    let delay = self.config.retry.delay_for(attempt);
                    tracing::warn!(
                        job_id = job.id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Job completion failed, retrying",
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn handle_failure(&self, job: &CloneJob, error: CloneError) -> Result<JobOutcome, CloneError> {
        let attempt = u32::try_from(job.attempts).unwrap_or(u32::MAX);
        let message = error.to_string();

        if self.config.retry.should_retry(attempt, &error) {
            let delay = self.config.retry.delay_for(attempt);
            let run_at = Utc::now()
                + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero());
            self.queue.retry_later(job.id, &message, run_at).await?;
            tracing::warn!(
                job_id = job.id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %message,
                "Job failed, retry scheduled",
            );
            return Ok(JobOutcome::Retried {
                job_id: job.id,
                delay,
            });
        }

        self.queue.fail(job.id, &message).await?;
        tracing::error!(job_id = job.id, attempt, error = %message, "Job failed permanently");
        Ok(JobOutcome::Failed {
            job_id: job.id,
            error: message,
        })
    }
}
