//! Database row structs.
//!
//! Each row converts into its `muster-core` domain type so callers above
//! the db crate never handle `FromRow` types.

pub mod association;
pub mod clone_job;
pub mod event;
pub mod task;
