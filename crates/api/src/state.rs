use std::sync::Arc;

use muster_core::clone::{EventCatalog, QueueService};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable; everything is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (JWT settings are read by the auth extractor).
    pub config: Arc<ServerConfig>,
    /// Event lookups and the database health check.
    pub catalog: Arc<dyn EventCatalog>,
    /// Creates destination events and enqueues clone / import jobs.
    pub queue_service: Arc<QueueService>,
}
