//! Route definitions for event clone and import.

use axum::routing::post;
use axum::Router;

use crate::handlers::events;
use crate::state::AppState;

/// Routes mounted at `/events`.
///
/// ```text
/// POST /{id}/clone     -> clone_event
/// POST /{id}/import    -> import_event
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/clone", post(events::clone_event))
        .route("/{id}/import", post(events::import_event))
}
