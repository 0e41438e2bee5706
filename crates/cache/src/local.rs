//! In-process cache backed by DashMap for lock-free concurrent access.
//!
//! Suitable for tests and single-instance deployments. Multi-instance
//! deployments want [`RedisBackend`](crate::RedisBackend) so writes on
//! one node invalidate reads on another.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::backend::CacheBackend;
use crate::error::CacheError;

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Lock-free in-process backend with lazy expiry.
#[derive(Default)]
pub struct MemoryBackend {
    entries: DashMap<String, Entry>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove expired entries. Expiry is otherwise lazy (checked on
    /// read), so keys that are never read again linger until this sweep
    /// runs. Call it periodically from a maintenance task.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn read(&self, key: &str) -> Option<String> {
        let entry = self.entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            drop(entry);
            self.entries.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    fn write(&self, key: &str, value: &str, ttl: Duration) {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.read(key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.write(key, value, ttl);
        Ok(())
    }

    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<String>>, CacheError> {
        Ok(keys.iter().map(|key| self.read(key)).collect())
    }

    async fn multi_set(
        &self,
        entries: &[(String, String)],
        ttl: Duration,
    ) -> Result<(), CacheError> {
        for (key, value) in entries {
            self.write(key, value, ttl);
        }
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_del_round_trip() {
        let backend = MemoryBackend::new();
        backend
            .set("widgets:1", "payload", Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            backend.get("widgets:1").await.unwrap(),
            Some("payload".to_string())
        );

        backend.del("widgets:1").await.unwrap();
        assert_eq!(backend.get("widgets:1").await.unwrap(), None);
        // Deleting again is a no-op, not an error.
        backend.del("widgets:1").await.unwrap();
    }

    #[tokio::test]
    async fn entries_expire_on_read() {
        let backend = MemoryBackend::new();
        backend
            .set("widgets:1", "payload", Duration::from_millis(20))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(backend.get("widgets:1").await.unwrap(), None);
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn multi_get_aligns_with_keys() {
        let backend = MemoryBackend::new();
        backend
            .set("widgets:2", "two", Duration::from_secs(60))
            .await
            .unwrap();

        let keys = vec!["widgets:1".to_string(), "widgets:2".to_string()];
        let values = backend.multi_get(&keys).await.unwrap();
        assert_eq!(values, vec![None, Some("two".to_string())]);
    }

    #[tokio::test]
    async fn purge_drops_only_expired_entries() {
        let backend = MemoryBackend::new();
        backend
            .set("stale", "x", Duration::from_millis(10))
            .await
            .unwrap();
        backend
            .set("fresh", "y", Duration::from_secs(60))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert_eq!(backend.purge_expired(), 1);
        assert_eq!(backend.len(), 1);
        assert_eq!(backend.get("fresh").await.unwrap(), Some("y".to_string()));
    }
}
