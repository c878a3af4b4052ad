//! PostgreSQL-backed stores
//!
//! Tables are created by `migrations/`. Username uniqueness is enforced by
//! the `auth_users.username` unique constraint, so a losing concurrent insert
//! surfaces as [`StoreError::DuplicateUsername`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{IdentityStore, SessionStore, StoreError};
use crate::models::{Session, User};

#[derive(Clone)]
pub struct PgIdentityStore {
    db_pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn exists(&self, username: &str) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(SELECT 1 FROM auth_users WHERE username = $1)
            "#,
        )
        .bind(username)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(exists)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user: Option<User> = sqlx::query_as(
            r#"
            SELECT id, username, password_hash, created_at
            FROM auth_users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(user)
    }

    async fn create(&self, user: User) -> Result<User, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO auth_users (id, username, password_hash, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.db_pool)
        .await?;

        Ok(user)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.db_pool).await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgSessionStore {
    db_pool: PgPool,
}

impl PgSessionStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(&self, session: Session) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO auth_sessions (session_hash, username, created_at, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&session.session_hash)
        .bind(&session.username)
        .bind(session.created_at)
        .bind(session.expires_at)
        .execute(&self.db_pool)
        .await?;

        Ok(())
    }

    async fn resolve(
        &self,
        session_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, StoreError> {
        let session: Option<Session> = sqlx::query_as(
            r#"
            SELECT session_hash, username, created_at, expires_at
            FROM auth_sessions
            WHERE session_hash = $1 AND expires_at > $2
            "#,
        )
        .bind(session_hash)
        .bind(now)
        .fetch_optional(&self.db_pool)
        .await?;

        Ok(session)
    }

    async fn invalidate(&self, session_hash: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            DELETE FROM auth_sessions WHERE session_hash = $1
            "#,
        )
        .bind(session_hash)
        .execute(&self.db_pool)
        .await?;

        Ok(())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM auth_sessions WHERE expires_at <= $1
            "#,
        )
        .bind(now)
        .execute(&self.db_pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.db_pool).await?;
        Ok(())
    }
}
