//! Repository-level error taxonomy.

use std::sync::Arc;

use guildhall_cache::CacheError;

/// Errors surfaced by stores, repositories, and the statistics engine.
///
/// `Clone` so a single-flight leader's result, success or failure, can
/// be handed structurally intact to every collapsed waiter; the
/// non-clonable sqlx error is held behind `Arc`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DbError {
    /// Neither the cache nor the store has the record.
    #[error("record not found")]
    RecordNotFound,

    /// An update was attempted with a zero/unset identifier.
    #[error("id cannot be zero")]
    InvalidId,

    /// A column filter referenced an invalid identifier or carried a
    /// value incompatible with its operator.
    #[error("invalid filter: {0}")]
    BadFilter(String),

    /// The single-flight leader was dropped before producing a result.
    #[error("concurrent load was interrupted before completing")]
    Interrupted,

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("database error: {0}")]
    Database(Arc<sqlx::Error>),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(Arc::new(err))
    }
}
