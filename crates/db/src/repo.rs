//! Generic cache-aside repository.
//!
//! The read-through/write-invalidate policy is implemented once here and
//! parameterized over the entity type and its persistent-store accessor,
//! instead of being duplicated per entity.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::PgConnection;
use tracing::warn;

use guildhall_cache::EntityCache;
use guildhall_core::types::{DbId, HasId};

use crate::error::DbError;
use crate::flight::SingleFlight;
use crate::query::Filter;

/// Persistent-store accessor for one entity type.
///
/// Implementations own the connection pool and the entity's SQL; the
/// repository layers caching policy on top and never sees SQL.
#[async_trait]
pub trait Store<T>: Send + Sync {
    /// Insert DTO.
    type Create: Send + Sync;
    /// Partial-update DTO. All fields are `Option`: absent fields are
    /// left unchanged, so a present `Some(false)` / `Some(0)` is
    /// distinguishable from "no change".
    type Update: Send + Sync;

    /// Insert and return the stored row with its assigned id.
    async fn insert(&self, input: &Self::Create) -> Result<T, DbError>;

    /// Fetch by primary key. `Ok(None)` when no row exists.
    async fn fetch_by_id(&self, id: DbId) -> Result<Option<T>, DbError>;

    /// Apply the present fields of `input`. Returns whether a row matched.
    async fn update_by_id(&self, id: DbId, input: &Self::Update) -> Result<bool, DbError>;

    /// Delete by primary key. Returns whether a row was removed.
    async fn delete_by_id(&self, id: DbId) -> Result<bool, DbError>;

    /// Filtered, paginated listing. The total is reported as 0 when the
    /// filter skips counting.
    async fn fetch_by_filter(&self, filter: &Filter) -> Result<(Vec<T>, i64), DbError>;
}

/// Transaction-scoped store operations against a caller-managed
/// connection, for composing several writes atomically.
#[async_trait]
pub trait TxStore<T>: Store<T> {
    async fn insert_in(&self, conn: &mut PgConnection, input: &Self::Create)
        -> Result<T, DbError>;

    async fn update_in(
        &self,
        conn: &mut PgConnection,
        id: DbId,
        input: &Self::Update,
    ) -> Result<bool, DbError>;

    async fn delete_in(&self, conn: &mut PgConnection, id: DbId) -> Result<bool, DbError>;
}

/// Cache-aside repository: read-through with single-flight miss collapse
/// and negative-cache placeholders; write-invalidate on mutation.
///
/// Constructed without a cache it degrades to store pass-through. The
/// cache is always advisory: population and invalidation failures are
/// logged and swallowed, store errors always propagate. Handles are
/// injected: one repository instance per entity, sharing the pool and
/// the cache backend with its siblings.
pub struct CachedRepo<T, S> {
    store: S,
    cache: Option<EntityCache<T>>,
    flight: SingleFlight<T>,
}

impl<T, S> CachedRepo<T, S>
where
    T: Clone + Serialize + DeserializeOwned + HasId + Send + Sync,
    S: Store<T>,
{
    pub fn new(store: S, cache: Option<EntityCache<T>>) -> Self {
        Self {
            store,
            cache,
            flight: SingleFlight::new(),
        }
    }

    /// Direct access to the underlying store, for operations outside the
    /// cached contract (filtered scans inside a transaction, upserts).
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Insert a record. The cache is untouched: nothing was cached for a
    /// row that did not exist yet.
    pub async fn create(&self, input: &S::Create) -> Result<T, DbError> {
        self.store.insert(input).await
    }

    /// Fetch one record, cache first.
    ///
    /// A cache hit returns immediately. The placeholder marker fails with
    /// [`DbError::RecordNotFound`] without consulting the store; this is
    /// the anti-penetration guarantee. A plain miss joins the
    /// single-flight group for the id: the elected leader queries the
    /// store once, populates either the positive entry or the
    /// placeholder, and every concurrent caller receives its result. At
    /// most one store query is issued per id however many callers race.
    /// Dropping a waiting caller's future abandons the wait without
    /// aborting the leader's query.
    pub async fn get_by_id(&self, id: DbId) -> Result<T, DbError> {
        let Some(cache) = &self.cache else {
            return self
                .store
                .fetch_by_id(id)
                .await?
                .ok_or(DbError::RecordNotFound);
        };

        match cache.get(id).await {
            Ok(record) => return Ok(record),
            Err(err) if err.is_not_found() => {}
            Err(err) if err.is_placeholder() => return Err(DbError::RecordNotFound),
            Err(err) => return Err(err.into()),
        }

        self.flight
            .run(id, || async move {
                match self.store.fetch_by_id(id).await? {
                    Some(record) => {
                        if let Err(err) = cache.set(id, &record, cache.positive_ttl()).await {
                            warn!(id, error = %err, "failed to cache loaded record");
                        }
                        Ok(record)
                    }
                    None => {
                        // The placeholder keeps repeat lookups for this
                        // missing id away from the store until it expires.
                        if let Err(err) = cache.set_placeholder(id).await {
                            warn!(id, error = %err, "failed to set not-found placeholder");
                        }
                        Err(DbError::RecordNotFound)
                    }
                }
            })
            .await
    }

    /// Bulk positive-entry lookup.
    ///
    /// Asymmetric with [`get_by_id`](Self::get_by_id): misses are NOT
    /// loaded from the store. Callers needing guaranteed completeness
    /// must query the store for the absent ids themselves. Without a
    /// cache this returns an empty map.
    pub async fn multi_get(&self, ids: &[DbId]) -> Result<HashMap<DbId, T>, DbError> {
        match &self.cache {
            Some(cache) => Ok(cache.multi_get(ids).await?),
            None => Ok(HashMap::new()),
        }
    }

    /// Prime cache entries for records already loaded elsewhere (a list
    /// query, typically). Best effort but loud: backend failure surfaces
    /// as one aggregate error.
    pub async fn multi_set(&self, records: &[T]) -> Result<(), DbError> {
        if let Some(cache) = &self.cache {
            cache.multi_set(records, cache.positive_ttl()).await?;
        }
        Ok(())
    }

    /// Partial update by id, then drop (never refresh) the cache entry;
    /// the next read repopulates it from the store.
    pub async fn update_by_id(&self, id: DbId, input: &S::Update) -> Result<(), DbError> {
        if id < 1 {
            return Err(DbError::InvalidId);
        }
        self.store.update_by_id(id, input).await?;
        self.invalidate(id).await;
        Ok(())
    }

    /// Delete by id. The cache entry is dropped only after the store
    /// confirmed the write, so a failed delete never evicts a live entry.
    pub async fn delete_by_id(&self, id: DbId) -> Result<(), DbError> {
        self.store.delete_by_id(id).await?;
        self.invalidate(id).await;
        Ok(())
    }

    /// Filtered listing straight from the store. Never cached: filtered
    /// result sets are too variable to key usefully.
    pub async fn get_by_columns(&self, filter: &Filter) -> Result<(Vec<T>, i64), DbError> {
        self.store.fetch_by_filter(filter).await
    }

    /// Drop the cache entry for `id`, logging (not propagating) failures.
    pub async fn invalidate(&self, id: DbId) {
        if let Some(cache) = &self.cache {
            if let Err(err) = cache.del(id).await {
                warn!(id, error = %err, "failed to invalidate cache entry");
            }
        }
    }
}

impl<T, S> CachedRepo<T, S>
where
    T: Clone + Serialize + DeserializeOwned + HasId + Send + Sync,
    S: TxStore<T>,
{
    /// Insert through a caller-managed transaction.
    pub async fn create_in_tx(
        &self,
        conn: &mut PgConnection,
        input: &S::Create,
    ) -> Result<T, DbError> {
        self.store.insert_in(conn, input).await
    }

    /// Partial update through a caller-managed transaction.
    ///
    /// The cache entry is dropped immediately, before the surrounding
    /// transaction commits. If that transaction later rolls back, the
    /// next read repopulates the pre-transaction row; a reader in the
    /// window between invalidation and rollback can observe a store read
    /// the transaction would have overwritten. Callers must not assume
    /// read-after-write consistency through the cache until commit.
    pub async fn update_in_tx(
        &self,
        conn: &mut PgConnection,
        id: DbId,
        input: &S::Update,
    ) -> Result<(), DbError> {
        if id < 1 {
            return Err(DbError::InvalidId);
        }
        self.store.update_in(conn, id, input).await?;
        self.invalidate(id).await;
        Ok(())
    }

    /// Delete through a caller-managed transaction. Same invalidation
    /// caveat as [`update_in_tx`](Self::update_in_tx).
    pub async fn delete_in_tx(&self, conn: &mut PgConnection, id: DbId) -> Result<(), DbError> {
        self.store.delete_in(conn, id).await?;
        self.invalidate(id).await;
        Ok(())
    }
}
