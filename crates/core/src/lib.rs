//! Domain core for the event clone / import service.
//!
//! Pure types and algorithms with no database or HTTP dependency:
//!
//! - [`clone`]: association handler, transaction provider, queue service,
//!   clone naming and the store traits they run against.
//! - [`jobs`]: background job model, status machine and retry policy.
//! - [`memory`]: in-process store and queue used by tests and local runs.

pub mod association;
pub mod channels;
pub mod clone;
pub mod domain;
pub mod error;
pub mod jobs;
pub mod memory;
pub mod plain_object;
pub mod types;
