//! Identity and session storage
//!
//! The gateway never owns user or session state itself. It talks to these
//! two traits, which are backed either by process memory (development and
//! tests) or by PostgreSQL.

mod memory;
mod postgres;

pub use memory::{InMemoryIdentityStore, InMemorySessionStore};
pub use postgres::{PgIdentityStore, PgSessionStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{Session, User};

/// Store errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Username already exists")]
    DuplicateUsername,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::DuplicateUsername
            }
            _ => StoreError::Database(err.to_string()),
        }
    }
}

/// User records keyed by unique username
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn exists(&self, username: &str) -> Result<bool, StoreError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Insert `user` unless the username is taken. Must be atomic with
    /// respect to concurrent inserts of the same username.
    async fn create(&self, user: User) -> Result<User, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

/// Sessions keyed by the hash of the cookie token
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: Session) -> Result<(), StoreError>;

    /// Live session for `session_hash`; expired sessions resolve to `None`
    async fn resolve(
        &self,
        session_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, StoreError>;

    /// Remove a session. Removing an unknown session is not an error.
    async fn invalidate(&self, session_hash: &str) -> Result<(), StoreError>;

    /// Drop every session expired at `now`, returning how many were removed
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
