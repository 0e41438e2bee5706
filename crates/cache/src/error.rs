//! Cache error taxonomy.

use std::sync::Arc;

/// Errors from the cache layer.
///
/// `Clone` so a result can be fanned out to every waiter of a collapsed
/// concurrent load; non-clonable sources are held behind `Arc`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    /// Key absent. Signals the caller to fall through to the store.
    #[error("cache key not found")]
    NotFound,

    /// Key holds the not-found placeholder: the record is confirmed
    /// absent and the store must not be consulted.
    #[error("cache key holds the not-found placeholder")]
    Placeholder,

    /// Entries must always expire; a zero TTL would cache forever.
    #[error("cache ttl must be at least one second")]
    ZeroTtl,

    #[error("cache payload codec error: {0}")]
    Codec(Arc<serde_json::Error>),

    #[error("cache backend error: {0}")]
    Backend(Arc<redis::RedisError>),
}

impl CacheError {
    /// Structural check for a plain miss, instead of matching error text.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Structural check for the negative marker.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Self::Placeholder)
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        Self::Codec(Arc::new(err))
    }
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        Self::Backend(Arc::new(err))
    }
}
