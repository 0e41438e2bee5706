//! Per-dungeon salary statistics aggregate model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use guildhall_core::types::{DbId, HasId, Timestamp};

/// One aggregate row per (guild, dungeon) pair, unique on that pair.
///
/// Derived data: fully recomputed from the closed teams of the group on
/// every statistics run and replaced via upsert. Deleted when the group
/// has no qualifying source records left.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DungeonStats {
    pub id: DbId,
    pub guild_id: DbId,
    pub dungeon_name: String,
    /// Number of closed teams with a usable salary figure.
    pub total_count: i64,
    pub min_salary: i64,
    pub max_salary: i64,
    pub avg_salary: f64,
    pub min_per_person_salary: i64,
    pub max_per_person_salary: i64,
    pub avg_per_person_salary: f64,
    /// Team achieving the lowest total salary.
    pub min_salary_team_id: Option<DbId>,
    /// Team achieving the highest total salary.
    pub max_salary_team_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl HasId for DungeonStats {
    fn id(&self) -> DbId {
        self.id
    }
}

/// DTO for inserting an aggregate row directly. The statistics engine
/// goes through the upsert instead; this exists for the uniform
/// per-entity CRUD contract.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDungeonStats {
    pub guild_id: DbId,
    pub dungeon_name: String,
    pub total_count: i64,
    pub min_salary: i64,
    pub max_salary: i64,
    pub avg_salary: f64,
    pub min_per_person_salary: i64,
    pub max_per_person_salary: i64,
    pub avg_per_person_salary: f64,
    pub min_salary_team_id: Option<DbId>,
    pub max_salary_team_id: Option<DbId>,
}

/// DTO for updating an aggregate row. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDungeonStats {
    pub guild_id: Option<DbId>,
    pub dungeon_name: Option<String>,
    pub total_count: Option<i64>,
    pub min_salary: Option<i64>,
    pub max_salary: Option<i64>,
    pub avg_salary: Option<f64>,
    pub min_per_person_salary: Option<i64>,
    pub max_per_person_salary: Option<i64>,
    pub avg_per_person_salary: Option<f64>,
    pub min_salary_team_id: Option<DbId>,
    pub max_salary_team_id: Option<DbId>,
}
