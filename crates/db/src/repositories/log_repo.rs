//! Cache-aside repository for the `logs` table.
//!
//! Logs are append-mostly; the cached read path exists for the uniform
//! contract but sees little traffic.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgConnection;

use guildhall_cache::{CacheBackend, CacheConfig, EntityCache};
use guildhall_core::types::DbId;

use crate::error::DbError;
use crate::models::log_entry::{CreateLogEntry, LogEntry, UpdateLogEntry};
use crate::query::{self, Filter};
use crate::repo::{CachedRepo, Store, TxStore};
use crate::DbPool;

/// Cache key prefix; must end with a colon.
pub const LOG_CACHE_PREFIX: &str = "logs:";

const TABLE: &str = "logs";

const COLUMNS: &str = "id, user_id, guild_id, action, detail, created_at, updated_at";

/// Persistent-store accessor for operation logs.
pub struct LogStore {
    pool: DbPool,
}

impl LogStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store<LogEntry> for LogStore {
    type Create = CreateLogEntry;
    type Update = UpdateLogEntry;

    async fn insert(&self, input: &CreateLogEntry) -> Result<LogEntry, DbError> {
        let mut conn = self.pool.acquire().await?;
        self.insert_in(&mut conn, input).await
    }

    async fn fetch_by_id(&self, id: DbId) -> Result<Option<LogEntry>, DbError> {
        let query = format!("SELECT {COLUMNS} FROM logs WHERE id = $1");
        Ok(sqlx::query_as::<_, LogEntry>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_by_id(&self, id: DbId, input: &UpdateLogEntry) -> Result<bool, DbError> {
        let mut conn = self.pool.acquire().await?;
        self.update_in(&mut conn, id, input).await
    }

    async fn delete_by_id(&self, id: DbId) -> Result<bool, DbError> {
        let mut conn = self.pool.acquire().await?;
        self.delete_in(&mut conn, id).await
    }

    async fn fetch_by_filter(&self, filter: &Filter) -> Result<(Vec<LogEntry>, i64), DbError> {
        query::fetch_filtered(&self.pool, TABLE, COLUMNS, filter).await
    }
}

#[async_trait]
impl TxStore<LogEntry> for LogStore {
    async fn insert_in(
        &self,
        conn: &mut PgConnection,
        input: &CreateLogEntry,
    ) -> Result<LogEntry, DbError> {
        let query = format!(
            "INSERT INTO logs (user_id, guild_id, action, detail)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        Ok(sqlx::query_as::<_, LogEntry>(&query)
            .bind(input.user_id)
            .bind(input.guild_id)
            .bind(&input.action)
            .bind(&input.detail)
            .fetch_one(&mut *conn)
            .await?)
    }

    async fn update_in(
        &self,
        conn: &mut PgConnection,
        id: DbId,
        input: &UpdateLogEntry,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            "UPDATE logs SET
                user_id = COALESCE($2, user_id),
                guild_id = COALESCE($3, guild_id),
                action = COALESCE($4, action),
                detail = COALESCE($5, detail),
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(input.user_id)
        .bind(input.guild_id)
        .bind(&input.action)
        .bind(&input.detail)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_in(&self, conn: &mut PgConnection, id: DbId) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM logs WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Cache-aside repository over [`LogStore`].
pub type LogRepo = CachedRepo<LogEntry, LogStore>;

/// Wire up the log repository with an optional shared cache backend.
pub fn log_repo(
    pool: DbPool,
    backend: Option<Arc<dyn CacheBackend>>,
    config: &CacheConfig,
) -> LogRepo {
    let cache = backend.map(|backend| {
        EntityCache::new(
            backend,
            LOG_CACHE_PREFIX,
            config.positive_ttl(),
            config.placeholder_ttl(),
        )
    });
    CachedRepo::new(LogStore::new(pool), cache)
}
