//! Handlers that start clone and import jobs.
//!
//! Both return `202 Accepted` as soon as the job is queued; associations
//! are copied later by the worker.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use muster_core::clone::service::{CloneEventRequest, EnqueuedClone, ImportEventRequest};
use muster_core::jobs::CloneJob;
use muster_core::types::DbId;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/events/{id}/clone
///
/// Create a copy of event `id` and queue the association copy.
pub async fn clone_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<CloneEventRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<EnqueuedClone>>)> {
    let enqueued = state
        .queue_service
        .clone_event(id, input, &auth.job_user())
        .await?;

    tracing::info!(
        source_event_id = id,
        event_id = enqueued.event.id,
        job_id = enqueued.job.id,
        user_id = auth.user_id,
        "Clone accepted"
    );

    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: enqueued })))
}

/// POST /api/v1/events/{id}/import
///
/// Queue an import of `source_event_id`'s associations into event `id`.
pub async fn import_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<ImportEventRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<CloneJob>>)> {
    let job = state
        .queue_service
        .import_event(id, input, &auth.job_user())
        .await?;

    tracing::info!(
        event_id = id,
        job_id = job.id,
        user_id = auth.user_id,
        "Import accepted"
    );

    Ok((StatusCode::ACCEPTED, Json(DataResponse { data: job })))
}
