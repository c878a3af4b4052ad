//! Per-request session context
//!
//! The session cookie is resolved once, by [`resolve_session`], and the
//! result travels in request extensions. Handlers take [`SessionContext`] as
//! an extractor argument instead of consulting any ambient "current user".

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::convert::Infallible;

use crate::app_state::AppState;
use crate::auth::is_well_formed_token;

/// Authentication state of the current request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionContext {
    #[default]
    Anonymous,
    Authenticated {
        username: String,
        session_hash: String,
    },
}

impl SessionContext {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionContext::Authenticated { .. })
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            SessionContext::Authenticated { username, .. } => Some(username),
            SessionContext::Anonymous => None,
        }
    }

    pub fn session_hash(&self) -> Option<&str> {
        match self {
            SessionContext::Authenticated { session_hash, .. } => Some(session_hash),
            SessionContext::Anonymous => None,
        }
    }
}

/// Resolve the session cookie through the session store
///
/// Never rejects: an unknown, expired, or malformed cookie, and a store
/// failure, all leave the request anonymous.
pub async fn resolve_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let token = jar
        .get(&state.config.session_cookie_name)
        .map(|cookie| cookie.value().to_string());

    let context = match token {
        Some(token) if is_well_formed_token(&token) => {
            match state.auth_service.resolve_session(&token).await {
                Ok(Some(session)) => SessionContext::Authenticated {
                    username: session.username,
                    session_hash: session.session_hash,
                },
                Ok(None) => SessionContext::Anonymous,
                Err(e) => {
                    tracing::warn!(error = %e, "Session lookup failed, treating request as anonymous");
                    SessionContext::Anonymous
                }
            }
        }
        _ => SessionContext::Anonymous,
    };

    request.extensions_mut().insert(context);
    next.run(request).await
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .unwrap_or_default())
    }
}
