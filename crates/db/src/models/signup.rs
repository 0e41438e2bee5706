//! Signup model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use guildhall_core::types::{DbId, HasId, Timestamp};

/// A signup row from the `signups` table: one player (or stand-in)
/// registered for one team.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Signup {
    pub id: DbId,
    pub team_id: DbId,
    /// Who submitted the signup; differs from the player for proxies.
    pub submit_user_id: DbId,
    pub signup_user_id: Option<DbId>,
    pub signup_character_id: Option<DbId>,
    pub signup_info: Option<serde_json::Value>,
    pub priority: i32,
    /// Buyer seats pay instead of rolling for loot.
    pub is_rich: bool,
    pub is_proxy: bool,
    pub client_type: String,
    /// Pin the signup to a fixed slot; 0 means unpinned.
    pub lock_slot: i32,
    /// Signed up and then failed to show.
    pub is_dove: bool,
    pub is_candidate: bool,
    pub detail: Option<serde_json::Value>,
    pub signup_time: Option<Timestamp>,
    pub cancel_user_id: Option<DbId>,
    pub cancel_time: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl HasId for Signup {
    fn id(&self) -> DbId {
        self.id
    }
}

/// DTO for submitting a signup.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSignup {
    pub team_id: DbId,
    pub submit_user_id: DbId,
    pub signup_user_id: Option<DbId>,
    pub signup_character_id: Option<DbId>,
    pub signup_info: Option<serde_json::Value>,
    pub priority: Option<i32>,
    pub is_rich: Option<bool>,
    pub is_proxy: Option<bool>,
    pub client_type: Option<String>,
    pub lock_slot: Option<i32>,
    pub is_candidate: Option<bool>,
    pub detail: Option<serde_json::Value>,
    pub signup_time: Option<Timestamp>,
}

/// DTO for updating a signup. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSignup {
    pub team_id: Option<DbId>,
    pub submit_user_id: Option<DbId>,
    pub signup_user_id: Option<DbId>,
    pub signup_character_id: Option<DbId>,
    pub signup_info: Option<serde_json::Value>,
    pub priority: Option<i32>,
    pub is_rich: Option<bool>,
    pub is_proxy: Option<bool>,
    pub client_type: Option<String>,
    pub lock_slot: Option<i32>,
    pub is_dove: Option<bool>,
    pub is_candidate: Option<bool>,
    pub detail: Option<serde_json::Value>,
    pub signup_time: Option<Timestamp>,
    pub cancel_user_id: Option<DbId>,
    pub cancel_time: Option<Timestamp>,
}
