//! Guild entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use guildhall_core::types::{DbId, HasId, Timestamp};

/// A guild row from the `guilds` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Guild {
    pub id: DbId,
    /// Chat-group number the guild is reachable at.
    pub group_number: String,
    /// Stable external identifier, unique across guilds.
    pub ukey: String,
    pub name: String,
    /// Game server the guild plays on.
    pub server: String,
    pub avatar: String,
    /// Subscription expiry; `None` means never expires.
    pub expire_time: Option<Timestamp>,
    pub preferences: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl HasId for Guild {
    fn id(&self) -> DbId {
        self.id
    }
}

/// DTO for registering a new guild.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGuild {
    pub group_number: String,
    pub ukey: String,
    pub name: String,
    pub server: String,
    /// Defaults to empty if omitted.
    pub avatar: Option<String>,
    pub expire_time: Option<Timestamp>,
    pub preferences: Option<serde_json::Value>,
}

/// DTO for updating an existing guild. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateGuild {
    pub group_number: Option<String>,
    pub ukey: Option<String>,
    pub name: Option<String>,
    pub server: Option<String>,
    pub avatar: Option<String>,
    pub expire_time: Option<Timestamp>,
    pub preferences: Option<serde_json::Value>,
}
