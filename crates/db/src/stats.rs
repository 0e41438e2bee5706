//! Per-dungeon salary statistics engine.
//!
//! Recomputes one aggregate row per (guild, dungeon) pair from the raw
//! closed teams of that group, inside a single transaction, and replaces
//! it with an atomic upsert.

use std::sync::Arc;

use sqlx::PgConnection;
use tracing::{error, warn};

use guildhall_core::stats::StatsAccumulator;
use guildhall_core::summary::RaidSummary;
use guildhall_core::types::DbId;

use crate::error::DbError;
use crate::models::dungeon_stats::DungeonStats;
use crate::query::{Filter, FilterValue, MAX_LIMIT};
use crate::repositories::dungeon_stats_repo::DungeonStatsRepo;
use crate::repositories::team_repo::TeamRepo;
use crate::repo::{Store, TxStore};
use crate::DbPool;

/// Upper bound on the number of closed teams scanned per recomputation.
/// One dungeon in one guild stays far below this in practice; the bound
/// exists so the scan can never grow without limit.
const SCAN_LIMIT: i64 = MAX_LIMIT;

/// Page size for per-guild aggregate listings.
const GUILD_LISTING_LIMIT: i64 = 1_000;

/// Derived-data engine for per-dungeon salary statistics.
///
/// Holds the team repository for source data and the statistics
/// repository for the aggregate rows; both are shared with the rest of
/// the application.
pub struct DungeonStatsService {
    pool: DbPool,
    teams: Arc<TeamRepo>,
    stats: Arc<DungeonStatsRepo>,
}

impl DungeonStatsService {
    pub fn new(pool: DbPool, teams: Arc<TeamRepo>, stats: Arc<DungeonStatsRepo>) -> Self {
        Self { pool, teams, stats }
    }

    /// Recompute the aggregate row for one (guild, dungeon) group.
    ///
    /// Runs entirely inside one transaction: the closed-team scan, the
    /// delete of a stale row when the group has no source data left, and
    /// the upsert. All-or-nothing per group: a store error aborts the
    /// transaction and no partial aggregate is ever observable. The cache
    /// entry of a pre-existing aggregate row is invalidated only after
    /// commit, so a rollback never evicts a still-valid entry.
    pub async fn update_stats_for_group(
        &self,
        guild_id: DbId,
        dungeon_name: &str,
    ) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        let stale_id = match self.recompute_in(&mut tx, guild_id, dungeon_name).await {
            Ok(stale_id) => stale_id,
            Err(err) => {
                error!(guild_id, dungeon_name, error = %err, "statistics recomputation failed");
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "rollback after failed recomputation also failed");
                }
                return Err(err);
            }
        };
        tx.commit().await?;

        if let Some(id) = stale_id {
            self.stats.invalidate(id).await;
        }
        Ok(())
    }

    /// Transaction body. Returns the id of a pre-existing aggregate row
    /// whose cache entry must be dropped after commit, if any.
    async fn recompute_in(
        &self,
        conn: &mut PgConnection,
        guild_id: DbId,
        dungeon_name: &str,
    ) -> Result<Option<DbId>, DbError> {
        let filter = Filter::new()
            .eq("guild_id", FilterValue::Int(guild_id))
            .eq("dungeon_name", FilterValue::Text(dungeon_name.to_string()))
            .is_not_null("close_time")
            .skip_count()
            .limit(SCAN_LIMIT);
        let teams = self
            .teams
            .store()
            .fetch_by_filter_in(&mut *conn, &filter)
            .await?;

        let existing = self
            .stats
            .store()
            .fetch_by_group_in(&mut *conn, guild_id, dungeon_name)
            .await?;

        if teams.is_empty() {
            // No source data left: an aggregate row for the group is
            // stale by definition.
            if let Some(row) = &existing {
                self.stats.store().delete_in(&mut *conn, row.id).await?;
                return Ok(Some(row.id));
            }
            return Ok(None);
        }

        let mut acc = StatsAccumulator::new();
        for team in &teams {
            let Some(raw) = &team.summary else { continue };
            match RaidSummary::parse(raw) {
                Ok(summary) => acc.observe(team.id, &summary),
                Err(err) => {
                    warn!(team_id = team.id, error = %err, "skipping team with unparseable summary");
                }
            }
        }

        let Some(totals) = acc.finish() else {
            // Closed teams exist but none carries a usable salary figure;
            // never write a zero-count aggregate row.
            return Ok(None);
        };

        self.stats
            .store()
            .upsert_in(&mut *conn, guild_id, dungeon_name, &totals)
            .await?;
        Ok(existing.map(|row| row.id))
    }

    /// Fetch the aggregate for a group, materializing it on first access.
    ///
    /// A miss triggers exactly one recomputation and one retry; a second
    /// miss (the group has no qualifying data) is returned as
    /// [`DbError::RecordNotFound`].
    pub async fn get_stats_by_group(
        &self,
        guild_id: DbId,
        dungeon_name: &str,
    ) -> Result<DungeonStats, DbError> {
        if let Some(row) = self
            .stats
            .store()
            .fetch_by_group(guild_id, dungeon_name)
            .await?
        {
            return Ok(row);
        }

        self.update_stats_for_group(guild_id, dungeon_name).await?;
        self.stats
            .store()
            .fetch_by_group(guild_id, dungeon_name)
            .await?
            .ok_or(DbError::RecordNotFound)
    }

    /// All aggregates for a guild, sorted by dungeon name. A plain
    /// listing, never an aggregation trigger.
    pub async fn get_all_stats_by_guild(
        &self,
        guild_id: DbId,
    ) -> Result<Vec<DungeonStats>, DbError> {
        let filter = Filter::new()
            .eq("guild_id", FilterValue::Int(guild_id))
            .sort_asc("dungeon_name")
            .skip_count()
            .limit(GUILD_LISTING_LIMIT);
        let (rows, _) = self.stats.store().fetch_by_filter(&filter).await?;
        Ok(rows)
    }
}
