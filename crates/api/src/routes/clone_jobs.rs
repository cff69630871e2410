//! Route definitions for the `/clone-jobs` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::clone_jobs;
use crate::state::AppState;

/// Routes mounted at `/clone-jobs`.
///
/// ```text
/// GET /active    -> list_active
/// GET /{id}      -> get_by_id
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/active", get(clone_jobs::list_active))
        .route("/{id}", get(clone_jobs::get_by_id))
}
