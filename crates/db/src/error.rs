//! Mapping from `sqlx` failures to [`CloneError`].

use muster_core::clone::CloneError;

/// Name of the partial unique index allowing one live job per event.
pub const ACTIVE_JOB_INDEX: &str = "uq_clone_jobs_active_destination";

/// Convert a database error into a store error.
pub fn store_error(err: sqlx::Error) -> CloneError {
    CloneError::Store(err.to_string())
}

/// Convert a database error raised by the job queue.
pub fn queue_error(err: sqlx::Error) -> CloneError {
    CloneError::Queue(err.to_string())
}

/// The name of the violated unique constraint, if `err` is a
/// unique-violation (`23505`).
pub fn unique_violation(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            db_err.constraint()
        }
        _ => None,
    }
}
