//! PostgreSQL persistence for the clone service.
//!
//! Row models and zero-sized repositories follow the usual layout; the
//! [`store`] and [`queue`] modules implement the `muster-core` seams on top
//! of them.

pub mod error;
pub mod models;
pub mod queue;
pub mod repositories;
pub mod store;

use sqlx::postgres::PgPoolOptions;

pub use queue::PgJobQueue;
pub use store::{PgCloneStore, PgCloneTx};

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Apply pending migrations from `db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../db/migrations").run(pool).await
}

/// Round-trip a trivial query to verify connectivity.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
