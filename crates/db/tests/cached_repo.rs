//! Policy tests for the generic cache-aside repository.
//!
//! A mock in-memory store stands in for Postgres so the caching policy
//! (at-most-one-load, negative caching, invalidate-after-write) can be
//! exercised without a live database. The cache is the real memory
//! backend behind the real `EntityCache`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use guildhall_cache::{EntityCache, MemoryBackend};
use guildhall_core::types::{DbId, HasId};
use guildhall_db::error::DbError;
use guildhall_db::query::Filter;
use guildhall_db::repo::{CachedRepo, Store};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Widget {
    id: DbId,
    name: String,
    server: String,
}

impl HasId for Widget {
    fn id(&self) -> DbId {
        self.id
    }
}

#[derive(Debug, Default)]
struct CreateWidget {
    name: String,
    server: String,
}

#[derive(Debug, Default)]
struct UpdateWidget {
    name: Option<String>,
    server: Option<String>,
}

/// In-memory stand-in for the Postgres store. Counts fetches so tests can
/// assert how many loads actually reached the "database".
#[derive(Default)]
struct MockStore {
    rows: Mutex<HashMap<DbId, Widget>>,
    next_id: AtomicI64,
    fetches: AtomicUsize,
    /// Per-fetch delay, to hold a single-flight leader open while
    /// concurrent callers pile up behind it.
    fetch_delay: Option<Duration>,
}

impl MockStore {
    fn with_delay(delay: Duration) -> Self {
        Self {
            fetch_delay: Some(delay),
            ..Default::default()
        }
    }

    fn seed(&self, widget: Widget) {
        let mut rows = self.rows.lock().unwrap();
        self.next_id.fetch_max(widget.id, Ordering::SeqCst);
        rows.insert(widget.id, widget);
    }

    fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store<Widget> for MockStore {
    type Create = CreateWidget;
    type Update = UpdateWidget;

    async fn insert(&self, input: &CreateWidget) -> Result<Widget, DbError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let widget = Widget {
            id,
            name: input.name.clone(),
            server: input.server.clone(),
        };
        self.rows.lock().unwrap().insert(id, widget.clone());
        Ok(widget)
    }

    async fn fetch_by_id(&self, id: DbId) -> Result<Option<Widget>, DbError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.rows.lock().unwrap().get(&id).cloned())
    }

    async fn update_by_id(&self, id: DbId, input: &UpdateWidget) -> Result<bool, DbError> {
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&id) {
            Some(widget) => {
                if let Some(name) = &input.name {
                    widget.name = name.clone();
                }
                if let Some(server) = &input.server {
                    widget.server = server.clone();
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_by_id(&self, id: DbId) -> Result<bool, DbError> {
        Ok(self.rows.lock().unwrap().remove(&id).is_some())
    }

    async fn fetch_by_filter(&self, _filter: &Filter) -> Result<(Vec<Widget>, i64), DbError> {
        let rows = self.rows.lock().unwrap();
        let mut all: Vec<Widget> = rows.values().cloned().collect();
        all.sort_by_key(|w| w.id);
        let total = all.len() as i64;
        Ok((all, total))
    }
}

type WidgetRepo = CachedRepo<Widget, MockStore>;

fn cached_repo(store: MockStore) -> WidgetRepo {
    let cache = EntityCache::new(
        Arc::new(MemoryBackend::new()),
        "widgets:",
        Duration::from_secs(300),
        Duration::from_secs(600),
    );
    CachedRepo::new(store, Some(cache))
}

fn widget(id: DbId, name: &str, server: &str) -> Widget {
    Widget {
        id,
        name: name.to_string(),
        server: server.to_string(),
    }
}

#[tokio::test]
async fn concurrent_cold_reads_issue_one_store_query() {
    let store = MockStore::with_delay(Duration::from_millis(50));
    store.seed(widget(1, "Aster", "Tianhai"));
    let repo = Arc::new(cached_repo(store));

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let repo = Arc::clone(&repo);
        tasks.push(tokio::spawn(async move { repo.get_by_id(1).await }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), widget(1, "Aster", "Tianhai"));
    }
    assert_eq!(repo.store().fetch_count(), 1);
}

#[tokio::test]
async fn missing_id_is_negatively_cached() {
    let repo = cached_repo(MockStore::default());

    assert_matches!(repo.get_by_id(42).await, Err(DbError::RecordNotFound));
    assert_eq!(repo.store().fetch_count(), 1);

    // The placeholder short-circuits: no second store query.
    assert_matches!(repo.get_by_id(42).await, Err(DbError::RecordNotFound));
    assert_eq!(repo.store().fetch_count(), 1);
}

#[tokio::test]
async fn cache_hit_skips_the_store() {
    let store = MockStore::default();
    store.seed(widget(3, "Briar", "Qingzhou"));
    let repo = cached_repo(store);

    assert_eq!(repo.get_by_id(3).await.unwrap(), widget(3, "Briar", "Qingzhou"));
    assert_eq!(repo.get_by_id(3).await.unwrap(), widget(3, "Briar", "Qingzhou"));
    assert_eq!(repo.store().fetch_count(), 1);
}

#[tokio::test]
async fn update_invalidates_and_preserves_untouched_fields() {
    let store = MockStore::default();
    store.seed(widget(1, "", "Tianhai"));
    let repo = cached_repo(store);

    // Populate the cache.
    repo.get_by_id(1).await.unwrap();

    // Partial update: only `name` is present; `server` must survive.
    let update = UpdateWidget {
        name: Some("Alice".to_string()),
        ..Default::default()
    };
    repo.update_by_id(1, &update).await.unwrap();

    let reloaded = repo.get_by_id(1).await.unwrap();
    assert_eq!(reloaded, widget(1, "Alice", "Tianhai"));
    // First read loaded the stale row, the post-update read loaded again:
    // the cache entry was dropped, not refreshed in place.
    assert_eq!(repo.store().fetch_count(), 2);
}

#[tokio::test]
async fn zero_id_update_is_rejected_before_the_store() {
    let repo = cached_repo(MockStore::default());
    let update = UpdateWidget {
        name: Some("x".to_string()),
        ..Default::default()
    };
    assert_matches!(repo.update_by_id(0, &update).await, Err(DbError::InvalidId));
    assert_eq!(repo.store().fetch_count(), 0);
}

#[tokio::test]
async fn delete_invalidates_and_later_reads_miss() {
    let store = MockStore::default();
    store.seed(widget(9, "Moss", "Tianhai"));
    let repo = cached_repo(store);

    repo.get_by_id(9).await.unwrap();
    repo.delete_by_id(9).await.unwrap();

    // The next read goes to the store, finds nothing, and plants the
    // placeholder; the read after that is served by the placeholder.
    assert_matches!(repo.get_by_id(9).await, Err(DbError::RecordNotFound));
    assert_matches!(repo.get_by_id(9).await, Err(DbError::RecordNotFound));
    assert_eq!(repo.store().fetch_count(), 2);
}

#[tokio::test]
async fn create_then_get_round_trips_with_assigned_id() {
    let repo = cached_repo(MockStore::default());

    let created = repo
        .create(&CreateWidget {
            name: "Fern".to_string(),
            server: "Qingzhou".to_string(),
        })
        .await
        .unwrap();
    assert!(created.id > 0);

    // Create never touches the cache, so this read is a cold load.
    let loaded = repo.get_by_id(created.id).await.unwrap();
    assert_eq!(loaded, created);
    assert_eq!(repo.store().fetch_count(), 1);
}

#[tokio::test]
async fn multi_get_returns_only_cached_positive_entries() {
    let store = MockStore::default();
    store.seed(widget(1, "one", "s"));
    store.seed(widget(2, "two", "s"));
    let repo = cached_repo(store);

    // Cache id 1 positively and id 5 negatively; id 2 stays uncached.
    repo.get_by_id(1).await.unwrap();
    assert_matches!(repo.get_by_id(5).await, Err(DbError::RecordNotFound));

    let found = repo.multi_get(&[1, 2, 5]).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[&1], widget(1, "one", "s"));
    // No store fallback happened for the misses.
    assert_eq!(repo.store().fetch_count(), 2);
}

#[tokio::test]
async fn multi_set_primes_later_reads() {
    let store = MockStore::default();
    store.seed(widget(1, "one", "s"));
    store.seed(widget(2, "two", "s"));
    let repo = cached_repo(store);

    let (all, total) = repo.get_by_columns(&Filter::new()).await.unwrap();
    assert_eq!(total, 2);
    repo.multi_set(&all).await.unwrap();

    // Both reads are now cache hits.
    repo.get_by_id(1).await.unwrap();
    repo.get_by_id(2).await.unwrap();
    assert_eq!(repo.store().fetch_count(), 0);
}

#[tokio::test]
async fn without_cache_every_read_is_a_store_query() {
    let store = MockStore::default();
    store.seed(widget(4, "Rue", "Tianhai"));
    let repo: WidgetRepo = CachedRepo::new(store, None);

    repo.get_by_id(4).await.unwrap();
    repo.get_by_id(4).await.unwrap();
    assert_eq!(repo.store().fetch_count(), 2);

    assert_matches!(repo.get_by_id(5).await, Err(DbError::RecordNotFound));

    // Bulk lookups have no cache to consult.
    assert!(repo.multi_get(&[4]).await.unwrap().is_empty());
}
