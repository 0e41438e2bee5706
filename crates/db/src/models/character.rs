//! Game character model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use guildhall_core::types::{DbId, HasId, Timestamp};

/// A character row from the `characters` table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Character {
    pub id: DbId,
    /// Owning user account.
    pub user_id: DbId,
    pub name: String,
    pub server: String,
    /// Combat discipline (class/spec) the character plays.
    pub discipline: String,
    pub remark: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl HasId for Character {
    fn id(&self) -> DbId {
        self.id
    }
}

/// DTO for registering a character.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCharacter {
    pub user_id: DbId,
    pub name: String,
    pub server: String,
    pub discipline: String,
    pub remark: Option<String>,
}

/// DTO for updating a character. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCharacter {
    pub user_id: Option<DbId>,
    pub name: Option<String>,
    pub server: Option<String>,
    pub discipline: Option<String>,
    pub remark: Option<String>,
}
