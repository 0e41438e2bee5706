//! Typed per-entity view over a raw cache backend.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use guildhall_core::types::{DbId, HasId};

use crate::backend::{CacheBackend, PLACEHOLDER};
use crate::error::CacheError;

/// Typed cache facade for one entity type.
///
/// Keys are `"<prefix><id>"`; payloads are serde-JSON. A distinguished
/// placeholder payload records "confirmed absent" so repeated lookups for
/// a missing id stop at the cache instead of reaching the store.
pub struct EntityCache<T> {
    backend: Arc<dyn CacheBackend>,
    prefix: &'static str,
    positive_ttl: Duration,
    placeholder_ttl: Duration,
    _entity: PhantomData<fn() -> T>,
}

impl<T> EntityCache<T> {
    /// `prefix` must end with a colon so entity keyspaces cannot collide.
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        prefix: &'static str,
        positive_ttl: Duration,
        placeholder_ttl: Duration,
    ) -> Self {
        debug_assert!(prefix.ends_with(':'), "cache prefix must end with a colon");
        Self {
            backend,
            prefix,
            positive_ttl,
            placeholder_ttl,
            _entity: PhantomData,
        }
    }

    /// Cache key for an id.
    pub fn key(&self, id: DbId) -> String {
        format!("{}{id}", self.prefix)
    }

    /// TTL applied to positive entries.
    pub fn positive_ttl(&self) -> Duration {
        self.positive_ttl
    }

    /// TTL applied to not-found placeholders; independent of the positive
    /// policy and typically longer.
    pub fn placeholder_ttl(&self) -> Duration {
        self.placeholder_ttl
    }
}

impl<T: Serialize + DeserializeOwned> EntityCache<T> {
    /// Look up one id.
    ///
    /// Distinguishes a hard miss ([`CacheError::NotFound`]) from the
    /// negative marker ([`CacheError::Placeholder`]); callers branch with
    /// [`CacheError::is_placeholder`] rather than on message text.
    pub async fn get(&self, id: DbId) -> Result<T, CacheError> {
        match self.backend.get(&self.key(id)).await? {
            None => Err(CacheError::NotFound),
            Some(raw) if raw == PLACEHOLDER => Err(CacheError::Placeholder),
            Some(raw) => Ok(serde_json::from_str(&raw)?),
        }
    }

    /// Store one record under `ttl`.
    ///
    /// `ttl` must be at least one second: entries are never cached
    /// without a finite expiry.
    pub async fn set(&self, id: DbId, record: &T, ttl: Duration) -> Result<(), CacheError> {
        if ttl.as_secs() == 0 {
            return Err(CacheError::ZeroTtl);
        }
        let payload = serde_json::to_string(record)?;
        self.backend.set(&self.key(id), &payload, ttl).await
    }

    /// Bulk lookup. Only ids held as positive entries appear in the
    /// result; misses and placeholders are silently omitted, and callers
    /// reconcile by absence.
    pub async fn multi_get(&self, ids: &[DbId]) -> Result<HashMap<DbId, T>, CacheError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let keys: Vec<String> = ids.iter().map(|id| self.key(*id)).collect();
        let raws = self.backend.multi_get(&keys).await?;

        let mut found = HashMap::new();
        for (id, raw) in ids.iter().zip(raws) {
            if let Some(raw) = raw {
                if raw != PLACEHOLDER {
                    found.insert(*id, serde_json::from_str(&raw)?);
                }
            }
        }
        Ok(found)
    }

    /// Remove one entry. Idempotent.
    pub async fn del(&self, id: DbId) -> Result<(), CacheError> {
        self.backend.del(&self.key(id)).await
    }

    /// Mark an id as confirmed absent, under the placeholder TTL policy.
    pub async fn set_placeholder(&self, id: DbId) -> Result<(), CacheError> {
        self.backend
            .set(&self.key(id), PLACEHOLDER, self.placeholder_ttl)
            .await
    }
}

impl<T: Serialize + HasId> EntityCache<T> {
    /// Bulk store under one TTL. Best effort: the backend reports partial
    /// failure as a single aggregate error.
    pub async fn multi_set(&self, records: &[T], ttl: Duration) -> Result<(), CacheError> {
        if ttl.as_secs() == 0 {
            return Err(CacheError::ZeroTtl);
        }
        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            entries.push((self.key(record.id()), serde_json::to_string(record)?));
        }
        self.backend.multi_set(&entries, ttl).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::MemoryBackend;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Widget {
        id: DbId,
        name: String,
    }

    impl HasId for Widget {
        fn id(&self) -> DbId {
            self.id
        }
    }

    fn cache() -> EntityCache<Widget> {
        EntityCache::new(
            Arc::new(MemoryBackend::new()),
            "widgets:",
            Duration::from_secs(300),
            Duration::from_secs(600),
        )
    }

    fn widget(id: DbId, name: &str) -> Widget {
        Widget {
            id,
            name: name.to_string(),
        }
    }

    #[test]
    fn keys_are_prefixed() {
        assert_eq!(cache().key(7), "widgets:7");
    }

    #[tokio::test]
    async fn get_distinguishes_miss_from_placeholder() {
        let cache = cache();

        let miss = cache.get(1).await.unwrap_err();
        assert!(miss.is_not_found());
        assert!(!miss.is_placeholder());

        cache.set_placeholder(1).await.unwrap();
        let marked = cache.get(1).await.unwrap_err();
        assert!(marked.is_placeholder());
        assert!(!marked.is_not_found());
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let cache = cache();
        let record = widget(5, "Aster");
        cache
            .set(5, &record, cache.positive_ttl())
            .await
            .unwrap();
        assert_eq!(cache.get(5).await.unwrap(), record);
    }

    #[tokio::test]
    async fn zero_ttl_is_rejected() {
        let cache = cache();
        let err = cache
            .set(1, &widget(1, "x"), Duration::from_millis(500))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::ZeroTtl));
    }

    #[tokio::test]
    async fn multi_get_omits_misses_and_placeholders() {
        let cache = cache();
        cache
            .set(1, &widget(1, "one"), cache.positive_ttl())
            .await
            .unwrap();
        cache.set_placeholder(2).await.unwrap();

        let found = cache.multi_get(&[1, 2, 3]).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[&1], widget(1, "one"));
    }

    #[tokio::test]
    async fn multi_set_stores_every_record_under_its_own_key() {
        let cache = cache();
        cache
            .multi_set(
                &[widget(1, "one"), widget(2, "two")],
                cache.positive_ttl(),
            )
            .await
            .unwrap();
        assert_eq!(cache.get(1).await.unwrap(), widget(1, "one"));
        assert_eq!(cache.get(2).await.unwrap(), widget(2, "two"));
    }

    #[tokio::test]
    async fn del_is_idempotent() {
        let cache = cache();
        cache
            .set(9, &widget(9, "nine"), cache.positive_ttl())
            .await
            .unwrap();
        cache.del(9).await.unwrap();
        cache.del(9).await.unwrap();
        assert!(cache.get(9).await.unwrap_err().is_not_found());
    }
}
