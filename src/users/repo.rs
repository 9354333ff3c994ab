use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::StoreError;
use crate::users::repo_types::{NewUser, User, UserPage, UserQuery};

/// Query layer over the `users` table.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Filtered total and one page, newest first (`created_at DESC, id DESC`).
    async fn list(&self, query: &UserQuery) -> Result<UserPage, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    /// Fails with [`StoreError::UniqueViolation`] if the email is taken.
    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError>;
    /// Returns the removed row, or `None` when no row had that id.
    async fn delete(&self, id: i64) -> Result<Option<User>, StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn list(&self, query: &UserQuery) -> Result<UserPage, StoreError> {
        // strpos keeps the match a plain substring test; LIKE would treat % and _ as wildcards
        let search = query.search.as_deref().unwrap_or("");

        let mut tx = self.db.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM users
            WHERE $1 = '' OR strpos(email, $1) > 0 OR strpos(COALESCE(name, ''), $1) > 0
            "#,
        )
        .bind(search)
        .fetch_one(&mut *tx)
        .await?;

        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, created_at, updated_at
            FROM users
            WHERE $1 = '' OR strpos(email, $1) > 0 OR strpos(COALESCE(name, ''), $1) > 0
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(search)
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(UserPage { users, total })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, name, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn insert(&self, new_user: NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, name)
            VALUES ($1, $2)
            RETURNING id, email, name, created_at, updated_at
            "#,
        )
        .bind(new_user.email)
        .bind(new_user.name)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn delete(&self, id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            DELETE FROM users
            WHERE id = $1
            RETURNING id, email, name, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }
}
