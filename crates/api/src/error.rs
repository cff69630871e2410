use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use muster_core::clone::CloneError;
use muster_core::error::CoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] and [`CloneError`].
/// Implements [`IntoResponse`] to produce `{ "error", "code" }` JSON bodies.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `muster_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A failure raised while validating or enqueueing clone work.
    #[error(transparent)]
    Clone(#[from] CloneError),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Internal(msg) => internal(msg),
            },

            // --- Clone / queue errors ---
            AppError::Clone(err) => classify_clone_error(err),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

/// Classify a [`CloneError`] into an HTTP status, error code, and message.
///
/// - `NotFound` maps to 404.
/// - `AlreadyInProgress` maps to 409. The queue reports a violated
///   one-live-job-per-event index the same way.
/// - `Validation` maps to 400.
/// - Store, queue and serialization failures map to 500 with a sanitized message.
fn classify_clone_error(err: &CloneError) -> (StatusCode, &'static str, String) {
    match err {
        CloneError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CloneError::AlreadyInProgress { .. } => {
            (StatusCode::CONFLICT, "ALREADY_IN_PROGRESS", err.to_string())
        }
        CloneError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        other => internal(&other.to_string()),
    }
}

fn internal(detail: &str) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %detail, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}
