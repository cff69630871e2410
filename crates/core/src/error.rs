use crate::clone::error::CloneError;
use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CloneError> for CoreError {
    fn from(err: CloneError) -> Self {
        match err {
            CloneError::NotFound { entity, id } => CoreError::NotFound { entity, id },
            CloneError::Validation(msg) => CoreError::Validation(msg),
            err @ CloneError::AlreadyInProgress { .. } => CoreError::Conflict(err.to_string()),
            other => CoreError::Internal(other.to_string()),
        }
    }
}
