use std::sync::Arc;
use std::time::Duration;

use muster_core::clone::CloneProcessor;
use muster_db::{PgCloneStore, PgJobQueue};
use muster_events::{EventBus, PusherRelay};
use muster_worker::{WorkerConfig, WorkerPool};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "muster_worker=debug,muster_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = WorkerConfig::from_env();
    tracing::info!(concurrency = config.concurrency, "Loaded worker configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = muster_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");

    muster_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    muster_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    // --- Event bus + relay ---
    let event_bus = Arc::new(EventBus::default());

    let relay_handle = config.pusher_relay_url.as_deref().map(|url| {
        let relay = PusherRelay::new(url).expect("Failed to build relay HTTP client");
        tracing::info!(url, "Relaying association notifications");
        tokio::spawn(relay.run(event_bus.subscribe()))
    });

    // --- Worker pool ---
    let store = Arc::new(PgCloneStore::new(pool.clone()));
    let queue = Arc::new(PgJobQueue::new(pool));
    let processor = CloneProcessor::new(Arc::clone(&store), event_bus.clone());
    let workers = Arc::new(WorkerPool::new(store, queue, processor, config));

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, finishing in-flight jobs");
        shutdown.cancel();
    });

    workers.run(cancel).await;

    // Dropping the last bus handle closes the relay's receiver.
    drop(event_bus);
    if let Some(handle) = relay_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    tracing::info!("Worker shutdown complete");
}

/// Wait for SIGINT or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
