//! Operation log model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use guildhall_core::types::{DbId, HasId, Timestamp};

/// An audit row from the `logs` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: DbId,
    pub user_id: DbId,
    /// `None` for actions outside any guild context.
    pub guild_id: Option<DbId>,
    pub action: String,
    pub detail: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl HasId for LogEntry {
    fn id(&self) -> DbId {
        self.id
    }
}

/// DTO for appending a log entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLogEntry {
    pub user_id: DbId,
    pub guild_id: Option<DbId>,
    pub action: String,
    pub detail: Option<serde_json::Value>,
}

/// DTO for amending a log entry. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLogEntry {
    pub user_id: Option<DbId>,
    pub guild_id: Option<DbId>,
    pub action: Option<String>,
    pub detail: Option<serde_json::Value>,
}
