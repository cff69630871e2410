//! Background worker that drains the clone job queue.
//!
//! [`WorkerPool`] claims `eventAssociation` and `importAssociation` jobs
//! and runs each through a [`CloneProcessor`](muster_core::clone::CloneProcessor),
//! applying the configured retry policy to failures.

pub mod config;
pub mod pool;

pub use config::WorkerConfig;
pub use pool::{JobOutcome, RecoveryReport, WorkerPool};
