//! Authentication service
//!
//! Core business logic for username/password authentication. This is the
//! only component that talks to the identity and session stores.

use chrono::{Duration, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::error::ApiError;
use crate::models::{Credentials, Session, User};
use crate::store::{IdentityStore, SessionStore, StoreError};

use super::password::{hash_password, verify_password, PasswordError};
use super::token::{generate_token, hash_token};

/// Auth service errors
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Username already exists")]
    UsernameTaken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateUsername => AuthError::UsernameTaken,
            other => AuthError::Store(other),
        }
    }
}

impl AuthError {
    /// Map to the handler-boundary error. `expose_internal` decides whether
    /// unexpected failures keep their message.
    pub fn into_api_error(self, expose_internal: bool) -> ApiError {
        match self {
            AuthError::UsernameTaken => ApiError::Conflict(self.to_string()),
            AuthError::InvalidCredentials => ApiError::Unauthorized(self.to_string()),
            AuthError::Store(_) | AuthError::Password(_) => {
                ApiError::internal(self.to_string(), expose_internal)
            }
        }
    }
}

/// A freshly created session together with the raw token for the cookie
#[derive(Debug, Clone)]
pub struct NewSession {
    pub token: String,
    pub session: Session,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    identities: Arc<dyn IdentityStore>,
    sessions: Arc<dyn SessionStore>,
    bcrypt_cost: u32,
    session_ttl_seconds: i64,
    /// Hash verified against for unknown usernames, minted on first use
    decoy_hash: Arc<OnceCell<String>>,
}

impl AuthService {
    /// Create a new AuthService
    pub fn new(
        identities: Arc<dyn IdentityStore>,
        sessions: Arc<dyn SessionStore>,
        bcrypt_cost: u32,
        session_ttl_seconds: i64,
    ) -> Self {
        Self {
            identities,
            sessions,
            bcrypt_cost,
            session_ttl_seconds,
            decoy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Register a user and log them in
    ///
    /// `current_session` is the hash of any session the request already
    /// carries; it is invalidated before the new one is issued.
    pub async fn signup(
        &self,
        credentials: &Credentials,
        current_session: Option<&str>,
    ) -> Result<NewSession, AuthError> {
        if self.identities.exists(&credentials.username).await? {
            return Err(AuthError::UsernameTaken);
        }

        let password_hash = hash_password(&credentials.password, self.bcrypt_cost).await?;

        // A concurrent signup may have won since the existence check; the
        // store's uniqueness guarantee turns that into UsernameTaken.
        let user = self
            .identities
            .create(User::new(credentials.username.clone(), password_hash))
            .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "User created");

        self.start_session(&user.username, current_session).await
    }

    /// Verify credentials and open a new session
    pub async fn login(
        &self,
        credentials: &Credentials,
        current_session: Option<&str>,
    ) -> Result<NewSession, AuthError> {
        let user = match self.identities.find_by_username(&credentials.username).await? {
            Some(user) => user,
            None => {
                // Same bcrypt work as a wrong password
                self.verify_against_decoy(&credentials.password).await?;
                tracing::info!(username = %credentials.username, "Login for unknown user");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !verify_password(&credentials.password, &user.password_hash).await? {
            tracing::info!(username = %user.username, "Login with wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        let new_session = self.start_session(&user.username, current_session).await?;
        tracing::info!(username = %user.username, "User logged in");

        Ok(new_session)
    }

    /// Invalidate a session. Absent or unknown sessions are fine.
    pub async fn logout(&self, session_hash: Option<&str>) -> Result<(), AuthError> {
        if let Some(hash) = session_hash {
            self.sessions.invalidate(hash).await?;
            tracing::info!("Session invalidated");
        }
        Ok(())
    }

    /// Resolve a raw cookie token to a live session
    pub async fn resolve_session(&self, token: &str) -> Result<Option<Session>, AuthError> {
        let session = self
            .sessions
            .resolve(&hash_token(token), Utc::now())
            .await?;
        Ok(session)
    }

    /// Remove expired sessions
    pub async fn purge_expired_sessions(&self) -> Result<u64, AuthError> {
        Ok(self.sessions.purge_expired(Utc::now()).await?)
    }

    /// Check that both stores answer
    pub async fn check_stores(&self) -> Result<(), AuthError> {
        self.identities.ping().await?;
        self.sessions.ping().await?;
        Ok(())
    }

    async fn verify_against_decoy(&self, password: &str) -> Result<(), AuthError> {
        let cost = self.bcrypt_cost;
        let decoy = self
            .decoy_hash
            .get_or_try_init(|| async move { hash_password(&generate_token(), cost).await })
            .await?;

        verify_password(password, decoy).await?;
        Ok(())
    }

    async fn start_session(
        &self,
        username: &str,
        replaced: Option<&str>,
    ) -> Result<NewSession, AuthError> {
        if let Some(hash) = replaced {
            self.sessions.invalidate(hash).await?;
        }

        let token = generate_token();
        let now = Utc::now();
        let session = Session {
            session_hash: hash_token(&token),
            username: username.to_string(),
            created_at: now,
            expires_at: now + Duration::seconds(self.session_ttl_seconds),
        };

        self.sessions.create(session.clone()).await?;

        Ok(NewSession { token, session })
    }
}
