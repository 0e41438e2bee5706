//! Cache configuration loaded from environment variables.

use std::sync::Arc;
use std::time::Duration;

use crate::backend::CacheBackend;
use crate::client::RedisBackend;
use crate::error::CacheError;
use crate::local::MemoryBackend;

/// Which backend serves the per-entity caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    Memory,
    Redis,
    /// No caching: repositories run in store pass-through mode.
    Disabled,
}

impl CacheMode {
    fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "memory" => Self::Memory,
            "redis" => Self::Redis,
            "none" | "disabled" => Self::Disabled,
            other => panic!("CACHE_MODE must be memory, redis, or none (got {other:?})"),
        }
    }
}

/// Cache configuration loaded from environment variables with defaults.
///
/// | Env Var                      | Default                  |
/// |------------------------------|--------------------------|
/// | `CACHE_MODE`                 | `memory`                 |
/// | `REDIS_URL`                  | `redis://localhost:6379` |
/// | `CACHE_TTL_SECS`             | `300`                    |
/// | `CACHE_PLACEHOLDER_TTL_SECS` | `600`                    |
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub mode: CacheMode,
    pub redis_url: String,
    /// Expiry for positive entries, in seconds. Always finite.
    pub ttl_secs: u64,
    /// Expiry for not-found placeholders, in seconds. Independent of the
    /// positive policy.
    pub placeholder_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            mode: CacheMode::Memory,
            redis_url: "redis://localhost:6379".to_string(),
            ttl_secs: 300,
            placeholder_ttl_secs: 600,
        }
    }
}

impl CacheConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        let mode = std::env::var("CACHE_MODE")
            .map(|raw| CacheMode::parse(&raw))
            .unwrap_or(CacheMode::Memory);

        let redis_url = std::env::var("REDIS_URL")
            .unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let ttl_secs: u64 = std::env::var("CACHE_TTL_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .expect("CACHE_TTL_SECS must be a valid u64");
        assert!(ttl_secs > 0, "CACHE_TTL_SECS must be greater than zero");

        let placeholder_ttl_secs: u64 = std::env::var("CACHE_PLACEHOLDER_TTL_SECS")
            .unwrap_or_else(|_| "600".to_string())
            .parse()
            .expect("CACHE_PLACEHOLDER_TTL_SECS must be a valid u64");
        assert!(
            placeholder_ttl_secs > 0,
            "CACHE_PLACEHOLDER_TTL_SECS must be greater than zero"
        );

        Self {
            mode,
            redis_url,
            ttl_secs,
            placeholder_ttl_secs,
        }
    }

    /// TTL for positive entries.
    pub fn positive_ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// TTL for not-found placeholders.
    pub fn placeholder_ttl(&self) -> Duration {
        Duration::from_secs(self.placeholder_ttl_secs)
    }
}

/// Build the configured backend.
///
/// `Ok(None)` means caching is disabled; repositories constructed without
/// a backend read straight through to the store.
pub async fn build_backend(
    config: &CacheConfig,
) -> Result<Option<Arc<dyn CacheBackend>>, CacheError> {
    match config.mode {
        CacheMode::Disabled => Ok(None),
        CacheMode::Memory => Ok(Some(Arc::new(MemoryBackend::new()))),
        CacheMode::Redis => Ok(Some(Arc::new(
            RedisBackend::connect(&config.redis_url).await?,
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parsing_accepts_known_values() {
        assert_eq!(CacheMode::parse("memory"), CacheMode::Memory);
        assert_eq!(CacheMode::parse("Redis"), CacheMode::Redis);
        assert_eq!(CacheMode::parse("none"), CacheMode::Disabled);
        assert_eq!(CacheMode::parse("disabled"), CacheMode::Disabled);
    }

    #[test]
    #[should_panic(expected = "CACHE_MODE")]
    fn mode_parsing_rejects_unknown_values() {
        CacheMode::parse("memcached");
    }

    #[tokio::test]
    async fn disabled_mode_builds_no_backend() {
        let config = CacheConfig {
            mode: CacheMode::Disabled,
            ..Default::default()
        };
        assert!(build_backend(&config).await.unwrap().is_none());
    }
}
