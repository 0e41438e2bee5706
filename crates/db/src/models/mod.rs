//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` + `Deserialize` entity struct matching the
//!   database row (serializable both ways so it can live in the cache)
//! - A create DTO for inserts
//! - An update DTO (all `Option` fields) for partial updates

pub mod character;
pub mod dungeon_stats;
pub mod guild;
pub mod guild_member;
pub mod log_entry;
pub mod signup;
pub mod team;
pub mod team_template;
pub mod user;
