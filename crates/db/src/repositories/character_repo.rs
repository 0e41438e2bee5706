//! Cache-aside repository for the `characters` table.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgConnection;

use guildhall_cache::{CacheBackend, CacheConfig, EntityCache};
use guildhall_core::types::DbId;

use crate::error::DbError;
use crate::models::character::{Character, CreateCharacter, UpdateCharacter};
use crate::query::{self, Filter};
use crate::repo::{CachedRepo, Store, TxStore};
use crate::DbPool;

/// Cache key prefix; must end with a colon.
pub const CHARACTER_CACHE_PREFIX: &str = "characters:";

const TABLE: &str = "characters";

const COLUMNS: &str =
    "id, user_id, name, server, discipline, remark, created_at, updated_at";

/// Persistent-store accessor for characters.
pub struct CharacterStore {
    pool: DbPool,
}

impl CharacterStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// All characters belonging to one user, ordered by name.
    pub async fn fetch_by_user(&self, user_id: DbId) -> Result<Vec<Character>, DbError> {
        let query = format!("SELECT {COLUMNS} FROM characters WHERE user_id = $1 ORDER BY name ASC");
        Ok(sqlx::query_as::<_, Character>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }
}

#[async_trait]
impl Store<Character> for CharacterStore {
    type Create = CreateCharacter;
    type Update = UpdateCharacter;

    async fn insert(&self, input: &CreateCharacter) -> Result<Character, DbError> {
        let mut conn = self.pool.acquire().await?;
        self.insert_in(&mut conn, input).await
    }

    async fn fetch_by_id(&self, id: DbId) -> Result<Option<Character>, DbError> {
        let query = format!("SELECT {COLUMNS} FROM characters WHERE id = $1");
        Ok(sqlx::query_as::<_, Character>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_by_id(&self, id: DbId, input: &UpdateCharacter) -> Result<bool, DbError> {
        let mut conn = self.pool.acquire().await?;
        self.update_in(&mut conn, id, input).await
    }

    async fn delete_by_id(&self, id: DbId) -> Result<bool, DbError> {
        let mut conn = self.pool.acquire().await?;
        self.delete_in(&mut conn, id).await
    }

    async fn fetch_by_filter(&self, filter: &Filter) -> Result<(Vec<Character>, i64), DbError> {
        query::fetch_filtered(&self.pool, TABLE, COLUMNS, filter).await
    }
}

#[async_trait]
impl TxStore<Character> for CharacterStore {
    async fn insert_in(
        &self,
        conn: &mut PgConnection,
        input: &CreateCharacter,
    ) -> Result<Character, DbError> {
        let query = format!(
            "INSERT INTO characters (user_id, name, server, discipline, remark)
             VALUES ($1, $2, $3, $4, COALESCE($5, ''))
             RETURNING {COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Character>(&query)
            .bind(input.user_id)
            .bind(&input.name)
            .bind(&input.server)
            .bind(&input.discipline)
            .bind(&input.remark)
            .fetch_one(&mut *conn)
            .await?)
    }

    async fn update_in(
        &self,
        conn: &mut PgConnection,
        id: DbId,
        input: &UpdateCharacter,
    ) -> Result<bool, DbError> {
        let result = sqlx::query(
            "UPDATE characters SET
                user_id = COALESCE($2, user_id),
                name = COALESCE($3, name),
                server = COALESCE($4, server),
                discipline = COALESCE($5, discipline),
                remark = COALESCE($6, remark),
                updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(input.user_id)
        .bind(&input.name)
        .bind(&input.server)
        .bind(&input.discipline)
        .bind(&input.remark)
        .execute(&mut *conn)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_in(&self, conn: &mut PgConnection, id: DbId) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM characters WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Cache-aside repository over [`CharacterStore`].
pub type CharacterRepo = CachedRepo<Character, CharacterStore>;

/// Wire up the character repository with an optional shared cache backend.
pub fn character_repo(
    pool: DbPool,
    backend: Option<Arc<dyn CacheBackend>>,
    config: &CacheConfig,
) -> CharacterRepo {
    let cache = backend.map(|backend| {
        EntityCache::new(
            backend,
            CHARACTER_CACHE_PREFIX,
            config.positive_ttl(),
            config.placeholder_ttl(),
        )
    });
    CachedRepo::new(CharacterStore::new(pool), cache)
}
