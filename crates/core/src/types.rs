/// All database primary keys are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Implemented by persisted rows that expose their primary key.
///
/// Lets generic code (bulk cache population, invalidation) read the id
/// without knowing the concrete entity type.
pub trait HasId {
    fn id(&self) -> DbId;
}
