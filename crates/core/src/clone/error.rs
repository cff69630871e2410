//! Errors raised while cloning, importing or queueing association work.

use crate::clone::CloneOperation;
use crate::error::CoreError;
use crate::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum CloneError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Event {event_id} is locked by a running {operation}")]
    AlreadyInProgress {
        event_id: DbId,
        operation: CloneOperation,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A read or write against the backing store failed.
    #[error("Store error: {0}")]
    Store(String),

    #[error("Queue error: {0}")]
    Queue(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CloneError {
    /// Whether running the same job again may succeed.
    ///
    /// Missing rows and invalid input are permanent; store, queue and
    /// contention failures are transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NotFound { .. } | Self::Validation(_) | Self::Serialization(_) => false,
            Self::AlreadyInProgress { .. } | Self::Store(_) | Self::Queue(_) | Self::Internal(_) => {
                true
            }
        }
    }
}

impl From<CoreError> for CloneError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { entity, id } => CloneError::NotFound { entity, id },
            CoreError::Validation(msg) => CloneError::Validation(msg),
            other => CloneError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_in_progress_message_names_operation() {
        let err = CloneError::AlreadyInProgress {
            event_id: 4,
            operation: CloneOperation::Import,
        };
        assert_eq!(err.to_string(), "Event 4 is locked by a running import");
    }

    #[test]
    fn converts_into_core_conflict() {
        let core: CoreError = CloneError::AlreadyInProgress {
            event_id: 4,
            operation: CloneOperation::Clone,
        }
        .into();
        assert!(matches!(core, CoreError::Conflict(_)));
    }

    #[test]
    fn store_errors_become_internal() {
        let core: CoreError = CloneError::Store("boom".into()).into();
        assert!(matches!(core, CoreError::Internal(_)));
    }
}
