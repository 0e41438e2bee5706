//! Team template model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use guildhall_core::types::{DbId, HasId, Timestamp};

/// A reusable team setup: open a team from a template instead of
/// re-entering the rules every week.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TeamTemplate {
    pub id: DbId,
    pub guild_id: DbId,
    pub creator_id: DbId,
    pub title: String,
    pub rule: serde_json::Value,
    pub notice: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl HasId for TeamTemplate {
    fn id(&self) -> DbId {
        self.id
    }
}

/// DTO for saving a template.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTeamTemplate {
    pub guild_id: DbId,
    pub creator_id: DbId,
    pub title: String,
    pub rule: Option<serde_json::Value>,
    pub notice: Option<String>,
}

/// DTO for updating a template. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTeamTemplate {
    pub guild_id: Option<DbId>,
    pub creator_id: Option<DbId>,
    pub title: Option<String>,
    pub rule: Option<serde_json::Value>,
    pub notice: Option<String>,
}
