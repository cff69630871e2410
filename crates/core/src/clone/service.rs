//! Entry points that turn clone and import requests into queued jobs.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clone::error::CloneError;
use crate::clone::naming::{extract_event_name, next_clone_name, validate_event_name};
use crate::clone::store::EventCatalog;
use crate::clone::CloneOperation;
use crate::domain::{Event, JobUser, NewEvent};
use crate::jobs::{CloneJob, CloneJobKind, CloneJobPayload, ImportMode, JobQueue};
use crate::types::DbId;

/// Request body for cloning an event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CloneEventRequest {
    /// Explicit name for the new event. Derived from the source when absent.
    #[serde(default)]
    pub name: Option<String>,
}

/// Request body for importing another event's associations.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportEventRequest {
    pub source_event_id: DbId,
    #[serde(default)]
    pub mode: Option<ImportMode>,
}

/// The event created by a clone request and the job that will fill it.
#[derive(Debug, Clone, Serialize)]
pub struct EnqueuedClone {
    pub event: Event,
    pub job: CloneJob,
}

/// Creates destination events and places association jobs on the queue.
///
/// Nothing here copies associations; that happens later in the worker.
pub struct QueueService {
    catalog: Arc<dyn EventCatalog>,
    queue: Arc<dyn JobQueue>,
}

impl QueueService {
    pub fn new(catalog: Arc<dyn EventCatalog>, queue: Arc<dyn JobQueue>) -> Self {
        Self { catalog, queue }
    }

    /// Create a copy of `source_event_id` and enqueue an `eventAssociation`
    /// job that copies its associations into the copy.
    pub async fn clone_event(
        &self,
        source_event_id: DbId,
        request: CloneEventRequest,
        user: &JobUser,
    ) -> Result<EnqueuedClone, CloneError> {
        let source = self.require_event(source_event_id).await?;

        let name = match request.name {
            Some(name) => {
                validate_event_name(&name)?;
                name
            }
            None => {
                let base = extract_event_name(&source.name);
                let siblings = self
                    .catalog
                    .list_event_names(source.company_id, &base)
                    .await?;
                next_clone_name(&source.name, siblings)?
            }
        };

        let event = self
            .catalog
            .create_event(&NewEvent {
                company_id: source.company_id,
                name,
            })
            .await?;

        let payload = CloneJobPayload {
            id: source.id,
            new_event: event.clone(),
            user: user.clone(),
            import_mode: ImportMode::default(),
        };
        let job = match self
            .queue
            .enqueue(CloneJobKind::EventAssociation, &payload)
            .await
        {
            Ok(job) => job,
            Err(e) => {
                self.discard_event(&event).await;
                return Err(e);
            }
        };

        tracing::info!(
            job_id = job.id,
            source_event_id = source.id,
            destination_event_id = event.id,
            user_id = user.id,
            name = %event.name,
            "Clone enqueued"
        );

        Ok(EnqueuedClone { event, job })
    }

    /// Enqueue an `importAssociation` job copying `request.source_event_id`'s
    /// associations into `destination_event_id`.
    pub async fn import_event(
        &self,
        destination_event_id: DbId,
        request: ImportEventRequest,
        user: &JobUser,
    ) -> Result<CloneJob, CloneError> {
        if request.source_event_id == destination_event_id {
            return Err(CloneError::Validation(
                "An event cannot import from itself".to_string(),
            ));
        }

        let destination = self.require_event(destination_event_id).await?;
        let source = self.require_event(request.source_event_id).await?;

        if destination.is_busy() {
            let operation = if destination.cloning_in_progress {
                CloneOperation::Clone
            } else {
                CloneOperation::Import
            };
            return Err(CloneError::AlreadyInProgress {
                event_id: destination.id,
                operation,
            });
        }

        let payload = CloneJobPayload {
            id: source.id,
            new_event: destination,
            user: user.clone(),
            import_mode: request.mode.unwrap_or_default(),
        };
        let job = self
            .queue
            .enqueue(CloneJobKind::ImportAssociation, &payload)
            .await?;

        tracing::info!(
            job_id = job.id,
            source_event_id = source.id,
            destination_event_id,
            user_id = user.id,
            mode = ?payload.import_mode,
            "Import enqueued"
        );

        Ok(job)
    }

    /// All clone and import jobs still queued or running.
    pub async fn active_processes(&self) -> Result<Vec<CloneJob>, CloneError> {
        self.queue.list_active().await
    }

    /// Look up a single job.
    pub async fn job(&self, job_id: DbId) -> Result<CloneJob, CloneError> {
        self.queue
            .find(job_id)
            .await?
            .ok_or(CloneError::NotFound {
                entity: "CloneJob",
                id: job_id,
            })
    }

    /// Remove a destination event whose job never made it onto the queue.
    async fn discard_event(&self, event: &Event) {
        match self.catalog.remove_event(event.id).await {
            Ok(()) => tracing::warn!(
                event_id = event.id,
                name = %event.name,
                "Clone could not be queued, destination event removed"
            ),
            Err(e) => tracing::error!(
                event_id = event.id,
                error = %e,
                "Clone could not be queued and its destination event was not removed"
            ),
        }
    }

    async fn require_event(&self, id: DbId) -> Result<Event, CloneError> {
        self.catalog
            .find_event(id)
            .await?
            .ok_or(CloneError::NotFound { entity: "Event", id })
    }
}
