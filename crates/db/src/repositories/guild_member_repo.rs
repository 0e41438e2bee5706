//! Cache-aside repository for the `guild_members` table.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgConnection;

use guildhall_cache::{CacheBackend, CacheConfig, EntityCache};
use guildhall_core::types::DbId;

use crate::error::DbError;
use crate::models::guild_member::{CreateGuildMember, GuildMember, UpdateGuildMember};
use crate::query::{self, Filter};
use crate::repo::{CachedRepo, Store, TxStore};
use crate::DbPool;

/// Cache key prefix; must end with a colon.
pub const GUILD_MEMBER_CACHE_PREFIX: &str = "guild_members:";

const TABLE: &str = "guild_members";

const COLUMNS: &str =
    "id, guild_id, member_id, role, group_nickname, created_at, updated_at";

/// Persistent-store accessor for guild memberships.
pub struct GuildMemberStore {
    pool: DbPool,
}

impl GuildMemberStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store<GuildMember> for GuildMemberStore {
    type Create = CreateGuildMember;
    type Update = UpdateGuildMember;

    async fn insert(&self, input: &CreateGuildMember) -> Result<GuildMember, DbError> {
        let mut conn = self.pool.acquire().await?;
        self.insert_in(&mut conn, input).await
    }

    async fn fetch_by_id(&self, id: DbId) -> Result<Option<GuildMember>, DbError> {
        let query = format!("SELECT {COLUMNS} FROM guild_members WHERE id = $1");
        Ok(sqlx::query_as::<_, GuildMember>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_by_id(&self, id: DbId, input: &UpdateGuildMember) -> Result<bool, DbError> {
        let mut conn = self.pool.acquire().await?;
        self.update_in(&mut conn, id, input).await
    }

    async fn delete_by_id(&self, id: DbId) -> Result<bool, DbError> {
        let mut conn = self.pool.acquire().await?;
        self.delete_in(&mut conn, id).await
    }

    async fn fetch_by_filter(&self, filter: &Filter) -> Result<(Vec<GuildMember>, i64), DbError> {
        query::fetch_filtered(&self.pool, TABLE, COLUMNS, filter).await
    }
}

#[async_trait]
impl TxStore<GuildMember> for GuildMemberStore {
    async fn insert_in(
        &self,
        conn: &mut PgConnection,
        input: &CreateGuildMember,
    ) -> Result<GuildMember, DbError> {
        let query = format!(
            "INSERT INTO guild_members (guild_id, member_id, role, group_nickname)
             VALUES ($1, $2, COALESCE($3, 'member'), COALESCE($4, ''))
             RETURNING {COLUMNS}"
        );
        Ok(sqlx::query_as::<_, GuildMember>(&query)
            .bind(input.guild_id)
            .bind(input.member_id)
            .bind(&input.role)
            .bind(&input.group_nickname)
            .fetch_one(&mut *conn)
            .await?)
    }

    async fn update_in(
        &self,
        conn: &mut PgConnection,
        id: DbId,
        input: &UpdateGuildMember,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            "UPDATE guild_members SET
                guild_id = COALESCE($2, guild_id),
                member_id = COALESCE($3, member_id),
                role = COALESCE($4, role),
                group_nickname = COALESCE($5, group_nickname),
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(input.guild_id)
        .bind(input.member_id)
        .bind(&input.role)
        .bind(&input.group_nickname)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_in(&self, conn: &mut PgConnection, id: DbId) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM guild_members WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Cache-aside repository over [`GuildMemberStore`].
pub type GuildMemberRepo = CachedRepo<GuildMember, GuildMemberStore>;

/// Wire up the membership repository with an optional shared cache backend.
pub fn guild_member_repo(
    pool: DbPool,
    backend: Option<Arc<dyn CacheBackend>>,
    config: &CacheConfig,
) -> GuildMemberRepo {
    let cache = backend.map(|backend| {
        EntityCache::new(
            backend,
            GUILD_MEMBER_CACHE_PREFIX,
            config.positive_ttl(),
            config.placeholder_ttl(),
        )
    });
    CachedRepo::new(GuildMemberStore::new(pool), cache)
}
