//! Repository layer.
//!
//! One module per entity: the sqlx store (table SQL), a `CachedRepo` type
//! alias over it, and a constructor wiring pool + shared cache backend.
//! All repositories share one pool and one backend; each gets its own key
//! prefix and `EntityCache` instance.

pub mod character_repo;
pub mod dungeon_stats_repo;
pub mod guild_member_repo;
pub mod guild_repo;
pub mod log_repo;
pub mod signup_repo;
pub mod team_repo;
pub mod team_template_repo;
pub mod user_repo;

pub use character_repo::{character_repo, CharacterRepo, CharacterStore};
pub use dungeon_stats_repo::{dungeon_stats_repo, DungeonStatsRepo, DungeonStatsStore};
pub use guild_member_repo::{guild_member_repo, GuildMemberRepo, GuildMemberStore};
pub use guild_repo::{guild_repo, GuildRepo, GuildStore};
pub use log_repo::{log_repo, LogRepo, LogStore};
pub use signup_repo::{signup_repo, SignupRepo, SignupStore};
pub use team_repo::{team_repo, TeamRepo, TeamStore};
pub use team_template_repo::{team_template_repo, TeamTemplateRepo, TeamTemplateStore};
pub use user_repo::{user_repo, UserRepo, UserStore};
