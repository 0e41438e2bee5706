//! Cache-aside repository for the `dungeon_stats` table.
//!
//! On top of the uniform CRUD contract this store carries the two
//! operations the statistics engine needs: lookup by the (guild, dungeon)
//! group key and the atomic aggregate upsert.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgConnection;

use guildhall_cache::{CacheBackend, CacheConfig, EntityCache};
use guildhall_core::stats::StatsTotals;
use guildhall_core::types::DbId;

use crate::error::DbError;
use crate::models::dungeon_stats::{CreateDungeonStats, DungeonStats, UpdateDungeonStats};
use crate::query::{self, Filter};
use crate::repo::{CachedRepo, Store, TxStore};
use crate::DbPool;

/// Cache key prefix; must end with a colon.
pub const DUNGEON_STATS_CACHE_PREFIX: &str = "dungeon_stats:";

const TABLE: &str = "dungeon_stats";

const COLUMNS: &str = "id, guild_id, dungeon_name, total_count, \
     min_salary, max_salary, avg_salary, \
     min_per_person_salary, max_per_person_salary, avg_per_person_salary, \
     min_salary_team_id, max_salary_team_id, created_at, updated_at";

/// Persistent-store accessor for dungeon statistics.
pub struct DungeonStatsStore {
    pool: DbPool,
}

impl DungeonStatsStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Fetch the aggregate row for a (guild, dungeon) pair.
    pub async fn fetch_by_group(
        &self,
        guild_id: DbId,
        dungeon_name: &str,
    ) -> Result<Option<DungeonStats>, DbError> {
        let query =
            format!("SELECT {COLUMNS} FROM dungeon_stats WHERE guild_id = $1 AND dungeon_name = $2");
        Ok(sqlx::query_as::<_, DungeonStats>(&query)
            .bind(guild_id)
            .bind(dungeon_name)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Transaction-scoped variant of [`fetch_by_group`](Self::fetch_by_group).
    pub async fn fetch_by_group_in(
        &self,
        conn: &mut PgConnection,
        guild_id: DbId,
        dungeon_name: &str,
    ) -> Result<Option<DungeonStats>, DbError> {
        let query =
            format!("SELECT {COLUMNS} FROM dungeon_stats WHERE guild_id = $1 AND dungeon_name = $2");
        Ok(sqlx::query_as::<_, DungeonStats>(&query)
            .bind(guild_id)
            .bind(dungeon_name)
            .fetch_optional(&mut *conn)
            .await?)
    }

    /// Atomic insert-or-update keyed on (guild_id, dungeon_name).
    ///
    /// One ON CONFLICT statement, not a read-then-write: concurrent
    /// recomputations cannot lose updates on the aggregate row, and the
    /// store's native conflict resolution replaces every computed column.
    pub async fn upsert_in(
        &self,
        conn: &mut PgConnection,
        guild_id: DbId,
        dungeon_name: &str,
        totals: &StatsTotals,
    ) -> Result<(), DbError> {
        sqlx::query(
            "INSERT INTO dungeon_stats (
                 guild_id, dungeon_name, total_count,
                 min_salary, max_salary, avg_salary,
                 min_per_person_salary, max_per_person_salary, avg_per_person_salary,
                 min_salary_team_id, max_salary_team_id
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             ON CONFLICT (guild_id, dungeon_name) DO UPDATE SET
                 total_count = EXCLUDED.total_count,
                 min_salary = EXCLUDED.min_salary,
                 max_salary = EXCLUDED.max_salary,
                 avg_salary = EXCLUDED.avg_salary,
                 min_per_person_salary = EXCLUDED.min_per_person_salary,
                 max_per_person_salary = EXCLUDED.max_per_person_salary,
                 avg_per_person_salary = EXCLUDED.avg_per_person_salary,
                 min_salary_team_id = EXCLUDED.min_salary_team_id,
                 max_salary_team_id = EXCLUDED.max_salary_team_id,
                 updated_at = NOW()",
        )
        .bind(guild_id)
        .bind(dungeon_name)
        .bind(totals.total_count)
        .bind(totals.min_salary)
        .bind(totals.max_salary)
        .bind(totals.avg_salary)
        .bind(totals.min_per_person_salary)
        .bind(totals.max_per_person_salary)
        .bind(totals.avg_per_person_salary)
        .bind(totals.min_salary_team_id)
        .bind(totals.max_salary_team_id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl Store<DungeonStats> for DungeonStatsStore {
    type Create = CreateDungeonStats;
    type Update = UpdateDungeonStats;

    async fn insert(&self, input: &CreateDungeonStats) -> Result<DungeonStats, DbError> {
        let mut conn = self.pool.acquire().await?;
        self.insert_in(&mut conn, input).await
    }

    async fn fetch_by_id(&self, id: DbId) -> Result<Option<DungeonStats>, DbError> {
        let query = format!("SELECT {COLUMNS} FROM dungeon_stats WHERE id = $1");
        Ok(sqlx::query_as::<_, DungeonStats>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_by_id(&self, id: DbId, input: &UpdateDungeonStats) -> Result<bool, DbError> {
        let mut conn = self.pool.acquire().await?;
        self.update_in(&mut conn, id, input).await
    }

    async fn delete_by_id(&self, id: DbId) -> Result<bool, DbError> {
        let mut conn = self.pool.acquire().await?;
        self.delete_in(&mut conn, id).await
    }

    async fn fetch_by_filter(&self, filter: &Filter) -> Result<(Vec<DungeonStats>, i64), DbError> {
        query::fetch_filtered(&self.pool, TABLE, COLUMNS, filter).await
    }
}

#[async_trait]
impl TxStore<DungeonStats> for DungeonStatsStore {
    async fn insert_in(
        &self,
        conn: &mut PgConnection,
        input: &CreateDungeonStats,
    ) -> Result<DungeonStats, DbError> {
        let query = format!(
            "INSERT INTO dungeon_stats (
                 guild_id, dungeon_name, total_count,
                 min_salary, max_salary, avg_salary,
                 min_per_person_salary, max_per_person_salary, avg_per_person_salary,
                 min_salary_team_id, max_salary_team_id
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {COLUMNS}"
        );
        Ok(sqlx::query_as::<_, DungeonStats>(&query)
            .bind(input.guild_id)
            .bind(&input.dungeon_name)
            .bind(input.total_count)
            .bind(input.min_salary)
            .bind(input.max_salary)
            .bind(input.avg_salary)
            .bind(input.min_per_person_salary)
            .bind(input.max_per_person_salary)
            .bind(input.avg_per_person_salary)
            .bind(input.min_salary_team_id)
            .bind(input.max_salary_team_id)
            .fetch_one(&mut *conn)
            .await?)
    }

    async fn update_in(
        &self,
        conn: &mut PgConnection,
        id: DbId,
        input: &UpdateDungeonStats,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            "UPDATE dungeon_stats SET
                guild_id = COALESCE($2, guild_id),
                dungeon_name = COALESCE($3, dungeon_name),
                total_count = COALESCE($4, total_count),
                min_salary = COALESCE($5, min_salary),
                max_salary = COALESCE($6, max_salary),
                avg_salary = COALESCE($7, avg_salary),
                min_per_person_salary = COALESCE($8, min_per_person_salary),
                max_per_person_salary = COALESCE($9, max_per_person_salary),
                avg_per_person_salary = COALESCE($10, avg_per_person_salary),
                min_salary_team_id = COALESCE($11, min_salary_team_id),
                max_salary_team_id = COALESCE($12, max_salary_team_id),
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(input.guild_id)
        .bind(&input.dungeon_name)
        .bind(input.total_count)
        .bind(input.min_salary)
        .bind(input.max_salary)
        .bind(input.avg_salary)
        .bind(input.min_per_person_salary)
        .bind(input.max_per_person_salary)
        .bind(input.avg_per_person_salary)
        .bind(input.min_salary_team_id)
        .bind(input.max_salary_team_id)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_in(&self, conn: &mut PgConnection, id: DbId) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM dungeon_stats WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Cache-aside repository over [`DungeonStatsStore`].
pub type DungeonStatsRepo = CachedRepo<DungeonStats, DungeonStatsStore>;

/// Wire up the statistics repository with an optional shared cache backend.
pub fn dungeon_stats_repo(
    pool: DbPool,
    backend: Option<Arc<dyn CacheBackend>>,
    config: &CacheConfig,
) -> DungeonStatsRepo {
    let cache = backend.map(|backend| {
        EntityCache::new(
            backend,
            DUNGEON_STATS_CACHE_PREFIX,
            config.positive_ttl(),
            config.placeholder_ttl(),
        )
    });
    CachedRepo::new(DungeonStatsStore::new(pool), cache)
}
