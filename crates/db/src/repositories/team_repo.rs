//! Cache-aside repository for the `teams` table.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgConnection;

use guildhall_cache::{CacheBackend, CacheConfig, EntityCache};
use guildhall_core::types::DbId;

use crate::error::DbError;
use crate::models::team::{CreateTeam, Team, UpdateTeam};
use crate::query::{self, Filter};
use crate::repo::{CachedRepo, Store, TxStore};
use crate::DbPool;

/// Cache key prefix; must end with a colon.
pub const TEAM_CACHE_PREFIX: &str = "teams:";

const TABLE: &str = "teams";

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, guild_id, creator_id, title, team_time, dungeon_name, \
     book_rare_drop, book_materials, is_hidden, is_locked, rule, notice, \
     close_time, closer_id, summary, created_at, updated_at";

/// Persistent-store accessor for teams.
pub struct TeamStore {
    pool: DbPool,
}

impl TeamStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Filtered listing through an externally-managed transaction, so a
    /// caller's scan sees its own transaction's snapshot. Used by the
    /// statistics engine.
    pub async fn fetch_by_filter_in(
        &self,
        conn: &mut PgConnection,
        filter: &Filter,
    ) -> Result<Vec<Team>, DbError> {
        query::fetch_filtered_in(conn, TABLE, COLUMNS, filter).await
    }
}

#[async_trait]
impl Store<Team> for TeamStore {
    type Create = CreateTeam;
    type Update = UpdateTeam;

    async fn insert(&self, input: &CreateTeam) -> Result<Team, DbError> {
        let mut conn = self.pool.acquire().await?;
        self.insert_in(&mut conn, input).await
    }

    async fn fetch_by_id(&self, id: DbId) -> Result<Option<Team>, DbError> {
        let query = format!("SELECT {COLUMNS} FROM teams WHERE id = $1");
        Ok(sqlx::query_as::<_, Team>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_by_id(&self, id: DbId, input: &UpdateTeam) -> Result<bool, DbError> {
        let mut conn = self.pool.acquire().await?;
        self.update_in(&mut conn, id, input).await
    }

    async fn delete_by_id(&self, id: DbId) -> Result<bool, DbError> {
        let mut conn = self.pool.acquire().await?;
        self.delete_in(&mut conn, id).await
    }

    async fn fetch_by_filter(&self, filter: &Filter) -> Result<(Vec<Team>, i64), DbError> {
        query::fetch_filtered(&self.pool, TABLE, COLUMNS, filter).await
    }
}

#[async_trait]
impl TxStore<Team> for TeamStore {
    async fn insert_in(&self, conn: &mut PgConnection, input: &CreateTeam) -> Result<Team, DbError> {
        let query = format!(
            "INSERT INTO teams (guild_id, creator_id, title, team_time, dungeon_name,
                 book_rare_drop, book_materials, is_hidden, is_locked, rule, notice)
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, false), COALESCE($7, false),
                 COALESCE($8, false), COALESCE($9, false),
                 COALESCE($10, '{{}}'::jsonb), COALESCE($11, ''))
             RETURNING {COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Team>(&query)
            .bind(input.guild_id)
            .bind(input.creator_id)
            .bind(&input.title)
            .bind(input.team_time)
            .bind(&input.dungeon_name)
            .bind(input.book_rare_drop)
            .bind(input.book_materials)
            .bind(input.is_hidden)
            .bind(input.is_locked)
            .bind(&input.rule)
            .bind(&input.notice)
            .fetch_one(&mut *conn)
            .await?)
    }

    async fn update_in(
        &self,
        conn: &mut PgConnection,
        id: DbId,
        input: &UpdateTeam,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            "UPDATE teams SET
                guild_id = COALESCE($2, guild_id),
                creator_id = COALESCE($3, creator_id),
                title = COALESCE($4, title),
                team_time = COALESCE($5, team_time),
                dungeon_name = COALESCE($6, dungeon_name),
                book_rare_drop = COALESCE($7, book_rare_drop),
                book_materials = COALESCE($8, book_materials),
                is_hidden = COALESCE($9, is_hidden),
                is_locked = COALESCE($10, is_locked),
                rule = COALESCE($11, rule),
                notice = COALESCE($12, notice),
                close_time = COALESCE($13, close_time),
                closer_id = COALESCE($14, closer_id),
                summary = COALESCE($15, summary),
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(input.guild_id)
        .bind(input.creator_id)
        .bind(&input.title)
        .bind(input.team_time)
        .bind(&input.dungeon_name)
        .bind(input.book_rare_drop)
        .bind(input.book_materials)
        .bind(input.is_hidden)
        .bind(input.is_locked)
        .bind(&input.rule)
        .bind(&input.notice)
        .bind(input.close_time)
        .bind(input.closer_id)
        .bind(&input.summary)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_in(&self, conn: &mut PgConnection, id: DbId) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM teams WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Cache-aside repository over [`TeamStore`].
pub type TeamRepo = CachedRepo<Team, TeamStore>;

/// Wire up the team repository with an optional shared cache backend.
pub fn team_repo(
    pool: DbPool,
    backend: Option<Arc<dyn CacheBackend>>,
    config: &CacheConfig,
) -> TeamRepo {
    let cache = backend.map(|backend| {
        EntityCache::new(
            backend,
            TEAM_CACHE_PREFIX,
            config.positive_ttl(),
            config.placeholder_ttl(),
        )
    });
    CachedRepo::new(TeamStore::new(pool), cache)
}
