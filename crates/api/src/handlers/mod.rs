//! Request handlers.
//!
//! Handlers delegate to [`QueueService`](muster_core::clone::QueueService)
//! and map errors via [`AppError`](crate::error::AppError).

pub mod clone_jobs;
pub mod events;
