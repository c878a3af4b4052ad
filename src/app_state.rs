//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::AuthService;
use crate::config::Config;
use crate::middleware::RateLimiter;
use crate::store::{IdentityStore, InMemoryIdentityStore, InMemorySessionStore, SessionStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub config: Arc<Config>,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(
        config: Config,
        identities: Arc<dyn IdentityStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        let auth_service = Arc::new(AuthService::new(
            identities,
            sessions,
            config.bcrypt_cost,
            config.session_ttl_seconds,
        ));
        let rate_limiter = RateLimiter::new(config.rate_limit_rps)
            .trust_proxy_headers(config.trust_proxy_headers);

        Self {
            auth_service,
            config: Arc::new(config),
            rate_limiter,
        }
    }

    /// State backed by fresh in-process stores
    pub fn in_memory(config: Config) -> Self {
        Self::new(
            config,
            Arc::new(InMemoryIdentityStore::new()),
            Arc::new(InMemorySessionStore::new()),
        )
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.auth_service.clone()
    }
}

impl FromRef<AppState> for Arc<Config> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.config.clone()
    }
}
