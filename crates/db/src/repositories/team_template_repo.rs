//! Cache-aside repository for the `team_templates` table.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgConnection;

use guildhall_cache::{CacheBackend, CacheConfig, EntityCache};
use guildhall_core::types::DbId;

use crate::error::DbError;
use crate::models::team_template::{CreateTeamTemplate, TeamTemplate, UpdateTeamTemplate};
use crate::query::{self, Filter};
use crate::repo::{CachedRepo, Store, TxStore};
use crate::DbPool;

/// Cache key prefix; must end with a colon.
pub const TEAM_TEMPLATE_CACHE_PREFIX: &str = "team_templates:";

const TABLE: &str = "team_templates";

const COLUMNS: &str =
    "id, guild_id, creator_id, title, rule, notice, created_at, updated_at";

/// Persistent-store accessor for team templates.
pub struct TeamTemplateStore {
    pool: DbPool,
}

impl TeamTemplateStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store<TeamTemplate> for TeamTemplateStore {
    type Create = CreateTeamTemplate;
    type Update = UpdateTeamTemplate;

    async fn insert(&self, input: &CreateTeamTemplate) -> Result<TeamTemplate, DbError> {
        let mut conn = self.pool.acquire().await?;
        self.insert_in(&mut conn, input).await
    }

    async fn fetch_by_id(&self, id: DbId) -> Result<Option<TeamTemplate>, DbError> {
        let query = format!("SELECT {COLUMNS} FROM team_templates WHERE id = $1");
        Ok(sqlx::query_as::<_, TeamTemplate>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_by_id(&self, id: DbId, input: &UpdateTeamTemplate) -> Result<bool, DbError> {
        let mut conn = self.pool.acquire().await?;
        self.update_in(&mut conn, id, input).await
    }

    async fn delete_by_id(&self, id: DbId) -> Result<bool, DbError> {
        let mut conn = self.pool.acquire().await?;
        self.delete_in(&mut conn, id).await
    }

    async fn fetch_by_filter(&self, filter: &Filter) -> Result<(Vec<TeamTemplate>, i64), DbError> {
        query::fetch_filtered(&self.pool, TABLE, COLUMNS, filter).await
    }
}

#[async_trait]
impl TxStore<TeamTemplate> for TeamTemplateStore {
    async fn insert_in(
        &self,
        conn: &mut PgConnection,
        input: &CreateTeamTemplate,
    ) -> Result<TeamTemplate, DbError> {
        let query = format!(
            "INSERT INTO team_templates (guild_id, creator_id, title, rule, notice)
             VALUES ($1, $2, $3, COALESCE($4, '{{}}'::jsonb), COALESCE($5, ''))
             RETURNING {COLUMNS}"
        );
        Ok(sqlx::query_as::<_, TeamTemplate>(&query)
            .bind(input.guild_id)
            .bind(input.creator_id)
            .bind(&input.title)
            .bind(&input.rule)
            .bind(&input.notice)
            .fetch_one(&mut *conn)
            .await?)
    }

    async fn update_in(
        &self,
        conn: &mut PgConnection,
        id: DbId,
        input: &UpdateTeamTemplate,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            "UPDATE team_templates SET
                guild_id = COALESCE($2, guild_id),
                creator_id = COALESCE($3, creator_id),
                title = COALESCE($4, title),
                rule = COALESCE($5, rule),
                notice = COALESCE($6, notice),
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(input.guild_id)
        .bind(input.creator_id)
        .bind(&input.title)
        .bind(&input.rule)
        .bind(&input.notice)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_in(&self, conn: &mut PgConnection, id: DbId) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM team_templates WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Cache-aside repository over [`TeamTemplateStore`].
pub type TeamTemplateRepo = CachedRepo<TeamTemplate, TeamTemplateStore>;

/// Wire up the template repository with an optional shared cache backend.
pub fn team_template_repo(
    pool: DbPool,
    backend: Option<Arc<dyn CacheBackend>>,
    config: &CacheConfig,
) -> TeamTemplateRepo {
    let cache = backend.map(|backend| {
        EntityCache::new(
            backend,
            TEAM_TEMPLATE_CACHE_PREFIX,
            config.positive_ttl(),
            config.placeholder_ttl(),
        )
    });
    CachedRepo::new(TeamTemplateStore::new(pool), cache)
}
