//! Cache-aside repository for the `users` table.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgConnection;

use guildhall_cache::{CacheBackend, CacheConfig, EntityCache};
use guildhall_core::types::DbId;

use crate::error::DbError;
use crate::models::user::{CreateUser, UpdateUser, User};
use crate::query::{self, Filter};
use crate::repo::{CachedRepo, Store, TxStore};
use crate::DbPool;

/// Cache key prefix; must end with a colon.
pub const USER_CACHE_PREFIX: &str = "users:";

const TABLE: &str = "users";

const COLUMNS: &str = "id, account, password_hash, nickname, avatar, \
     is_admin, is_bot, must_reset_password, created_at, updated_at";

/// Persistent-store accessor for users.
pub struct UserStore {
    pool: DbPool,
}

impl UserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Lookup by account number. Used by the login path, which cannot key
    /// on an id it does not know yet.
    pub async fn fetch_by_account(&self, account: &str) -> Result<Option<User>, DbError> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE account = $1");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(account)
            .fetch_optional(&self.pool)
            .await?)
    }
}

#[async_trait]
impl Store<User> for UserStore {
    type Create = CreateUser;
    type Update = UpdateUser;

    async fn insert(&self, input: &CreateUser) -> Result<User, DbError> {
        let mut conn = self.pool.acquire().await?;
        self.insert_in(&mut conn, input).await
    }

    async fn fetch_by_id(&self, id: DbId) -> Result<Option<User>, DbError> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_by_id(&self, id: DbId, input: &UpdateUser) -> Result<bool, DbError> {
        let mut conn = self.pool.acquire().await?;
        self.update_in(&mut conn, id, input).await
    }

    async fn delete_by_id(&self, id: DbId) -> Result<bool, DbError> {
        let mut conn = self.pool.acquire().await?;
        self.delete_in(&mut conn, id).await
    }

    async fn fetch_by_filter(&self, filter: &Filter) -> Result<(Vec<User>, i64), DbError> {
        query::fetch_filtered(&self.pool, TABLE, COLUMNS, filter).await
    }
}

#[async_trait]
impl TxStore<User> for UserStore {
    async fn insert_in(&self, conn: &mut PgConnection, input: &CreateUser) -> Result<User, DbError> {
        let query = format!(
            "INSERT INTO users (account, password_hash, nickname, avatar, is_admin, is_bot)
             VALUES ($1, $2, $3, COALESCE($4, ''), COALESCE($5, false), COALESCE($6, false))
             RETURNING {COLUMNS}"
        );
        Ok(sqlx::query_as::<_, User>(&query)
            .bind(&input.account)
            .bind(&input.password_hash)
            .bind(&input.nickname)
            .bind(&input.avatar)
            .bind(input.is_admin)
            .bind(input.is_bot)
            .fetch_one(&mut *conn)
            .await?)
    }

    async fn update_in(
        &self,
        conn: &mut PgConnection,
        id: DbId,
        input: &UpdateUser,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            "UPDATE users SET
                account = COALESCE($2, account),
                password_hash = COALESCE($3, password_hash),
                nickname = COALESCE($4, nickname),
                avatar = COALESCE($5, avatar),
                is_admin = COALESCE($6, is_admin),
                is_bot = COALESCE($7, is_bot),
                must_reset_password = COALESCE($8, must_reset_password),
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(&input.account)
        .bind(&input.password_hash)
        .bind(&input.nickname)
        .bind(&input.avatar)
        .bind(input.is_admin)
        .bind(input.is_bot)
        .bind(input.must_reset_password)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_in(&self, conn: &mut PgConnection, id: DbId) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Cache-aside repository over [`UserStore`].
pub type UserRepo = CachedRepo<User, UserStore>;

/// Wire up the user repository with an optional shared cache backend.
pub fn user_repo(
    pool: DbPool,
    backend: Option<Arc<dyn CacheBackend>>,
    config: &CacheConfig,
) -> UserRepo {
    let cache = backend.map(|backend| {
        EntityCache::new(
            backend,
            USER_CACHE_PREFIX,
            config.positive_ttl(),
            config.placeholder_ttl(),
        )
    });
    CachedRepo::new(UserStore::new(pool), cache)
}
