//! User account model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use guildhall_core::types::{DbId, HasId, Timestamp};

/// Full user row from the `users` table.
///
/// Contains the password hash -- never hand this struct to API responses
/// directly.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: DbId,
    /// Chat-platform account number; unique.
    pub account: String,
    pub password_hash: String,
    pub nickname: String,
    pub avatar: String,
    pub is_admin: bool,
    /// Machine accounts used by the bot bridge.
    pub is_bot: bool,
    pub must_reset_password: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl HasId for User {
    fn id(&self) -> DbId {
        self.id
    }
}

/// DTO for creating a new user.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub account: String,
    pub password_hash: String,
    pub nickname: String,
    pub avatar: Option<String>,
    pub is_admin: Option<bool>,
    pub is_bot: Option<bool>,
}

/// DTO for updating an existing user. All fields are optional, so a
/// present `Some(false)` is an explicit write, not "unchanged".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUser {
    pub account: Option<String>,
    pub password_hash: Option<String>,
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub is_admin: Option<bool>,
    pub is_bot: Option<bool>,
    pub must_reset_password: Option<bool>,
}
