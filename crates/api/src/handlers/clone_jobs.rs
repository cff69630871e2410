//! Handlers for the `/clone-jobs` resource.

use axum::extract::{Path, State};
use axum::Json;
use muster_core::jobs::CloneJob;
use muster_core::types::DbId;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/clone-jobs/active
///
/// Every clone and import job that is still queued or running.
pub async fn list_active(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> AppResult<Json<DataResponse<Vec<CloneJob>>>> {
    let jobs = state.queue_service.active_processes().await?;
    Ok(Json(DataResponse { data: jobs }))
}

/// GET /api/v1/clone-jobs/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<CloneJob>>> {
    let job = state.queue_service.job(id).await?;
    Ok(Json(DataResponse { data: job }))
}
