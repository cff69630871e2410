pub mod clone_jobs;
pub mod events;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /events/{id}/clone            clone into a new event (POST, 202)
/// /events/{id}/import           import another event's associations (POST, 202)
///
/// /clone-jobs/active            queued and running jobs
/// /clone-jobs/{id}              single job status
/// ```
///
/// Every route requires a Bearer token.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/events", events::router())
        .nest("/clone-jobs", clone_jobs::router())
}
