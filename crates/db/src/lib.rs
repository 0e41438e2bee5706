//! Persistent-store layer: sqlx/Postgres stores, the generic cache-aside
//! repository, and the dungeon statistics engine.
//!
//! Handles are injected, never global: callers build one [`DbPool`], one
//! shared cache backend, and wire repositories from them.

use sqlx::postgres::PgPoolOptions;

pub mod error;
pub mod flight;
pub mod models;
pub mod query;
pub mod repo;
pub mod repositories;
pub mod stats;

pub use error::DbError;

pub type DbPool = sqlx::PgPool;

/// Create a connection pool from a database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Verify the database answers a trivial query.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply pending migrations from the workspace `migrations/` directory.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}
