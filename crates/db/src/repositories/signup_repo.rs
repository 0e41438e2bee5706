//! Cache-aside repository for the `signups` table.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgConnection;

use guildhall_cache::{CacheBackend, CacheConfig, EntityCache};
use guildhall_core::types::DbId;

use crate::error::DbError;
use crate::models::signup::{CreateSignup, Signup, UpdateSignup};
use crate::query::{self, Filter};
use crate::repo::{CachedRepo, Store, TxStore};
use crate::DbPool;

/// Cache key prefix; must end with a colon.
pub const SIGNUP_CACHE_PREFIX: &str = "signups:";

const TABLE: &str = "signups";

const COLUMNS: &str = "id, team_id, submit_user_id, signup_user_id, signup_character_id, \
     signup_info, priority, is_rich, is_proxy, client_type, lock_slot, is_dove, \
     is_candidate, detail, signup_time, cancel_user_id, cancel_time, \
     created_at, updated_at";

/// Persistent-store accessor for signups.
pub struct SignupStore {
    pool: DbPool,
}

impl SignupStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// All signups for a team, in priority order then submission order.
    pub async fn fetch_by_team(&self, team_id: DbId) -> Result<Vec<Signup>, DbError> {
        let query = format!(
            "SELECT {COLUMNS} FROM signups WHERE team_id = $1 ORDER BY priority DESC, id ASC"
        );
        Ok(sqlx::query_as::<_, Signup>(&query)
            .bind(team_id)
            .fetch_all(&self.pool)
            .await?)
    }
}

#[async_trait]
impl Store<Signup> for SignupStore {
    type Create = CreateSignup;
    type Update = UpdateSignup;

    async fn insert(&self, input: &CreateSignup) -> Result<Signup, DbError> {
        let mut conn = self.pool.acquire().await?;
        self.insert_in(&mut conn, input).await
    }

    async fn fetch_by_id(&self, id: DbId) -> Result<Option<Signup>, DbError> {
        let query = format!("SELECT {COLUMNS} FROM signups WHERE id = $1");
        Ok(sqlx::query_as::<_, Signup>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_by_id(&self, id: DbId, input: &UpdateSignup) -> Result<bool, DbError> {
        let mut conn = self.pool.acquire().await?;
        self.update_in(&mut conn, id, input).await
    }

    async fn delete_by_id(&self, id: DbId) -> Result<bool, DbError> {
        let mut conn = self.pool.acquire().await?;
        self.delete_in(&mut conn, id).await
    }

    async fn fetch_by_filter(&self, filter: &Filter) -> Result<(Vec<Signup>, i64), DbError> {
        query::fetch_filtered(&self.pool, TABLE, COLUMNS, filter).await
    }
}

#[async_trait]
impl TxStore<Signup> for SignupStore {
    async fn insert_in(
        &self,
        conn: &mut PgConnection,
        input: &CreateSignup,
    ) -> Result<Signup, DbError> {
        let query = format!(
            "INSERT INTO signups (team_id, submit_user_id, signup_user_id, signup_character_id,
                 signup_info, priority, is_rich, is_proxy, client_type, lock_slot,
                 is_candidate, detail, signup_time)
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, 0), COALESCE($7, false),
                 COALESCE($8, false), COALESCE($9, ''), COALESCE($10, 0),
                 COALESCE($11, false), $12, COALESCE($13, NOW()))
             RETURNING {COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Signup>(&query)
            .bind(input.team_id)
            .bind(input.submit_user_id)
            .bind(input.signup_user_id)
            .bind(input.signup_character_id)
            .bind(&input.signup_info)
            .bind(input.priority)
            .bind(input.is_rich)
            .bind(input.is_proxy)
            .bind(&input.client_type)
            .bind(input.lock_slot)
            .bind(input.is_candidate)
            .bind(&input.detail)
            .bind(input.signup_time)
            .fetch_one(&mut *conn)
            .await?)
    }

    async fn update_in(
        &self,
        conn: &mut PgConnection,
        id: DbId,
        input: &UpdateSignup,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            "UPDATE signups SET
                team_id = COALESCE($2, team_id),
                submit_user_id = COALESCE($3, submit_user_id),
                signup_user_id = COALESCE($4, signup_user_id),
                signup_character_id = COALESCE($5, signup_character_id),
                signup_info = COALESCE($6, signup_info),
                priority = COALESCE($7, priority),
                is_rich = COALESCE($8, is_rich),
                is_proxy = COALESCE($9, is_proxy),
                client_type = COALESCE($10, client_type),
                lock_slot = COALESCE($11, lock_slot),
                is_dove = COALESCE($12, is_dove),
                is_candidate = COALESCE($13, is_candidate),
                detail = COALESCE($14, detail),
                signup_time = COALESCE($15, signup_time),
                cancel_user_id = COALESCE($16, cancel_user_id),
                cancel_time = COALESCE($17, cancel_time),
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(input.team_id)
        .bind(input.submit_user_id)
        .bind(input.signup_user_id)
        .bind(input.signup_character_id)
        .bind(&input.signup_info)
        .bind(input.priority)
        .bind(input.is_rich)
        .bind(input.is_proxy)
        .bind(&input.client_type)
        .bind(input.lock_slot)
        .bind(input.is_dove)
        .bind(input.is_candidate)
        .bind(&input.detail)
        .bind(input.signup_time)
        .bind(input.cancel_user_id)
        .bind(input.cancel_time)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_in(&self, conn: &mut PgConnection, id: DbId) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM signups WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Cache-aside repository over [`SignupStore`].
pub type SignupRepo = CachedRepo<Signup, SignupStore>;

/// Wire up the signup repository with an optional shared cache backend.
pub fn signup_repo(
    pool: DbPool,
    backend: Option<Arc<dyn CacheBackend>>,
    config: &CacheConfig,
) -> SignupRepo {
    let cache = backend.map(|backend| {
        EntityCache::new(
            backend,
            SIGNUP_CACHE_PREFIX,
            config.positive_ttl(),
            config.placeholder_ttl(),
        )
    });
    CachedRepo::new(SignupStore::new(pool), cache)
}
