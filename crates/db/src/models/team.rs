//! Team (raid instance) model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use guildhall_core::types::{DbId, HasId, Timestamp};

/// A team row from the `teams` table.
///
/// A team is opened for one dungeon run, collects signups, and is
/// eventually closed. `summary` is written once at close time and is the
/// raw input to the per-dungeon statistics aggregation; open teams have
/// neither `close_time` nor `summary`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Team {
    pub id: DbId,
    pub guild_id: DbId,
    pub creator_id: DbId,
    pub title: String,
    /// Scheduled start of the run.
    pub team_time: Timestamp,
    pub dungeon_name: String,
    /// Someone reserved the rare drop for this run.
    pub book_rare_drop: bool,
    /// Someone reserved crafting materials.
    pub book_materials: bool,
    pub is_hidden: bool,
    pub is_locked: bool,
    /// Signup rules: slot layout, discipline requirements.
    pub rule: serde_json::Value,
    pub notice: String,
    pub close_time: Option<Timestamp>,
    pub closer_id: Option<DbId>,
    /// Post-raid summary payload; see `guildhall_core::summary`.
    pub summary: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl HasId for Team {
    fn id(&self) -> DbId {
        self.id
    }
}

/// DTO for opening a new team.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTeam {
    pub guild_id: DbId,
    pub creator_id: DbId,
    pub title: String,
    pub team_time: Timestamp,
    pub dungeon_name: String,
    pub book_rare_drop: Option<bool>,
    pub book_materials: Option<bool>,
    pub is_hidden: Option<bool>,
    pub is_locked: Option<bool>,
    /// Defaults to `{}` if omitted.
    pub rule: Option<serde_json::Value>,
    pub notice: Option<String>,
}

/// DTO for updating an existing team. All fields are optional; absent
/// fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTeam {
    pub guild_id: Option<DbId>,
    pub creator_id: Option<DbId>,
    pub title: Option<String>,
    pub team_time: Option<Timestamp>,
    pub dungeon_name: Option<String>,
    pub book_rare_drop: Option<bool>,
    pub book_materials: Option<bool>,
    pub is_hidden: Option<bool>,
    pub is_locked: Option<bool>,
    pub rule: Option<serde_json::Value>,
    pub notice: Option<String>,
    pub close_time: Option<Timestamp>,
    pub closer_id: Option<DbId>,
    pub summary: Option<serde_json::Value>,
}
