//! Cache-aside repository for the `guilds` table.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgConnection;

use guildhall_cache::{CacheBackend, CacheConfig, EntityCache};
use guildhall_core::types::DbId;

use crate::error::DbError;
use crate::models::guild::{CreateGuild, Guild, UpdateGuild};
use crate::query::{self, Filter};
use crate::repo::{CachedRepo, Store, TxStore};
use crate::DbPool;

/// Cache key prefix; must end with a colon.
pub const GUILD_CACHE_PREFIX: &str = "guilds:";

const TABLE: &str = "guilds";

const COLUMNS: &str = "id, group_number, ukey, name, server, avatar, \
     expire_time, preferences, created_at, updated_at";

/// Persistent-store accessor for guilds.
pub struct GuildStore {
    pool: DbPool,
}

impl GuildStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Lookup by the stable external identifier.
    pub async fn fetch_by_ukey(&self, ukey: &str) -> Result<Option<Guild>, DbError> {
        let query = format!("SELECT {COLUMNS} FROM guilds WHERE ukey = $1");
        Ok(sqlx::query_as::<_, Guild>(&query)
            .bind(ukey)
            .fetch_optional(&self.pool)
            .await?)
    }
}

#[async_trait]
impl Store<Guild> for GuildStore {
    type Create = CreateGuild;
    type Update = UpdateGuild;

    async fn insert(&self, input: &CreateGuild) -> Result<Guild, DbError> {
        let mut conn = self.pool.acquire().await?;
        self.insert_in(&mut conn, input).await
    }

    async fn fetch_by_id(&self, id: DbId) -> Result<Option<Guild>, DbError> {
        let query = format!("SELECT {COLUMNS} FROM guilds WHERE id = $1");
        Ok(sqlx::query_as::<_, Guild>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_by_id(&self, id: DbId, input: &UpdateGuild) -> Result<bool, DbError> {
        let mut conn = self.pool.acquire().await?;
        self.update_in(&mut conn, id, input).await
    }

    async fn delete_by_id(&self, id: DbId) -> Result<bool, DbError> {
        let mut conn = self.pool.acquire().await?;
        self.delete_in(&mut conn, id).await
    }

    async fn fetch_by_filter(&self, filter: &Filter) -> Result<(Vec<Guild>, i64), DbError> {
        query::fetch_filtered(&self.pool, TABLE, COLUMNS, filter).await
    }
}

#[async_trait]
impl TxStore<Guild> for GuildStore {
    async fn insert_in(
        &self,
        conn: &mut PgConnection,
        input: &CreateGuild,
    ) -> Result<Guild, DbError> {
        let query = format!(
            "INSERT INTO guilds (group_number, ukey, name, server, avatar, expire_time, preferences)
             VALUES ($1, $2, $3, $4, COALESCE($5, ''), $6, $7)
             RETURNING {COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Guild>(&query)
            .bind(&input.group_number)
            .bind(&input.ukey)
            .bind(&input.name)
            .bind(&input.server)
            .bind(&input.avatar)
            .bind(input.expire_time)
            .bind(&input.preferences)
            .fetch_one(&mut *conn)
            .await?)
    }

    async fn update_in(
        &self,
        conn: &mut PgConnection,
        id: DbId,
        input: &UpdateGuild,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            "UPDATE guilds SET
                group_number = COALESCE($2, group_number),
                ukey = COALESCE($3, ukey),
                name = COALESCE($4, name),
                server = COALESCE($5, server),
                avatar = COALESCE($6, avatar),
                expire_time = COALESCE($7, expire_time),
                preferences = COALESCE($8, preferences),
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(&input.group_number)
        .bind(&input.ukey)
        .bind(&input.name)
        .bind(&input.server)
        .bind(&input.avatar)
        .bind(input.expire_time)
        .bind(&input.preferences)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_in(&self, conn: &mut PgConnection, id: DbId) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM guilds WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Cache-aside repository over [`GuildStore`].
pub type GuildRepo = CachedRepo<Guild, GuildStore>;

/// Wire up the guild repository with an optional shared cache backend.
pub fn guild_repo(
    pool: DbPool,
    backend: Option<Arc<dyn CacheBackend>>,
    config: &CacheConfig,
) -> GuildRepo {
    let cache = backend.map(|backend| {
        EntityCache::new(
            backend,
            GUILD_CACHE_PREFIX,
            config.positive_ttl(),
            config.placeholder_ttl(),
        )
    });
    CachedRepo::new(GuildStore::new(pool), cache)
}
