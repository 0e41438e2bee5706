//! Guild membership model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use guildhall_core::types::{DbId, HasId, Timestamp};

/// A membership row from the `guild_members` table; unique per
/// (guild, member) pair.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GuildMember {
    pub id: DbId,
    pub guild_id: DbId,
    pub member_id: DbId,
    /// `owner`, `admin`, or `member`.
    pub role: String,
    pub group_nickname: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl HasId for GuildMember {
    fn id(&self) -> DbId {
        self.id
    }
}

/// DTO for adding a member to a guild.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGuildMember {
    pub guild_id: DbId,
    pub member_id: DbId,
    /// Defaults to `member` if omitted.
    pub role: Option<String>,
    pub group_nickname: Option<String>,
}

/// DTO for updating a membership. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateGuildMember {
    pub guild_id: Option<DbId>,
    pub member_id: Option<DbId>,
    pub role: Option<String>,
    pub group_nickname: Option<String>,
}
