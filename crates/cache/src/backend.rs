//! Raw backend contract shared by the in-process and Redis caches.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheError;

/// Sentinel payload marking a key as confirmed absent from the store.
///
/// Kept short and syntactically invalid as JSON so decoding a placeholder
/// can never be mistaken for decoding a real record.
pub(crate) const PLACEHOLDER: &str = "*";

/// Raw string-keyed cache operations.
///
/// Implementations store opaque payloads; typing, key prefixes, and
/// placeholder semantics live in [`EntityCache`](crate::EntityCache).
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetch a raw payload. `Ok(None)` is a miss, not an error.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store a payload with an expiry.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Fetch many payloads; the result is positionally aligned with `keys`.
    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError>;

    /// Store many payloads under one expiry. Partial failure surfaces as
    /// a single aggregate error, not itemized.
    async fn multi_set(&self, entries: &[(String, String)], ttl: Duration)
        -> Result<(), CacheError>;

    /// Remove a key. Deleting an absent key is not an error.
    async fn del(&self, key: &str) -> Result<(), CacheError>;
}
