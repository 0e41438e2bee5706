//! Keyed cache layer for the guildhall backend.
//!
//! One [`EntityCache`] per entity type fronts a shared [`CacheBackend`]:
//! in-process for tests and single-instance deployments, Redis for
//! multi-instance fleets. The backend is selected by [`CacheConfig`],
//! never by call-site code changes. The cache is advisory everywhere it
//! is used: an outage degrades read performance, not correctness.

pub mod backend;
pub mod client;
pub mod config;
pub mod entity;
pub mod error;
pub mod local;

pub use backend::CacheBackend;
pub use client::RedisBackend;
pub use config::{build_backend, CacheConfig, CacheMode};
pub use entity::EntityCache;
pub use error::CacheError;
pub use local::MemoryBackend;
