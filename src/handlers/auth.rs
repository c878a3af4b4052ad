//! Authentication HTTP handlers
//!
//! Endpoints for session-based username/password authentication.

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::cookie::CookieJar;

use crate::app_state::AppState;
use crate::cookies;
use crate::error::ApiError;
use crate::middleware::SessionContext;
use crate::models::{AuthStatusResponse, CredentialsRequest, DetailResponse, MessageResponse};

/// JSON body of signup and login
///
/// An empty body reads as `{}` so it fails field validation with the usual
/// message rather than as a parse error.
#[derive(Debug)]
pub struct CredentialsPayload(pub CredentialsRequest);

#[async_trait]
impl<S> FromRequest<S> for CredentialsPayload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e.body_text())))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(CredentialsPayload(CredentialsRequest::default()));
        }

        serde_json::from_slice(&bytes)
            .map(CredentialsPayload)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))
    }
}

/// GET /api/csrf/ - Set the CSRF cookie
pub async fn csrf_token(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<DetailResponse>) {
    let jar = cookies::ensure_csrf(jar, &state.config);

    (
        jar,
        Json(DetailResponse {
            detail: "CSRF cookie set".to_string(),
        }),
    )
}

/// POST /api/signup/ - Register a new user and log them in
pub async fn signup(
    State(state): State<AppState>,
    session: SessionContext,
    jar: CookieJar,
    CredentialsPayload(req): CredentialsPayload,
) -> Result<(StatusCode, CookieJar, Json<MessageResponse>), ApiError> {
    let credentials = req.into_credentials()?;

    let new_session = state
        .auth_service
        .signup(&credentials, session.session_hash())
        .await
        .map_err(|e| e.into_api_error(state.config.expose_internal_errors()))?;

    let jar = cookies::with_session(jar, &state.config, new_session.token);
    let jar = cookies::rotate_csrf(jar, &state.config);

    Ok((
        StatusCode::CREATED,
        jar,
        Json(MessageResponse::for_user(
            "User created successfully",
            credentials.username,
        )),
    ))
}

/// POST /api/login/ - Verify credentials and open a session
pub async fn login(
    State(state): State<AppState>,
    session: SessionContext,
    jar: CookieJar,
    CredentialsPayload(req): CredentialsPayload,
) -> Result<(CookieJar, Json<MessageResponse>), ApiError> {
    let credentials = req.into_credentials()?;

    let new_session = state
        .auth_service
        .login(&credentials, session.session_hash())
        .await
        .map_err(|e| e.into_api_error(state.config.expose_internal_errors()))?;

    let jar = cookies::with_session(jar, &state.config, new_session.token);
    let jar = cookies::rotate_csrf(jar, &state.config);

    Ok((
        jar,
        Json(MessageResponse::for_user(
            "Login successful",
            credentials.username,
        )),
    ))
}

/// POST /api/logout/ - End the current session, if any
pub async fn logout(
    State(state): State<AppState>,
    session: SessionContext,
    jar: CookieJar,
) -> (CookieJar, Json<MessageResponse>) {
    if let Err(e) = state.auth_service.logout(session.session_hash()).await {
        tracing::warn!(error = %e, "Failed to invalidate session on logout");
    }

    if let Some(username) = session.username() {
        tracing::info!(username = %username, "User logged out");
    }

    let jar = cookies::without_session(jar, &state.config);

    (jar, Json(MessageResponse::new("Logout successful")))
}

/// GET /api/check-auth/ - Report whether the request carries a live session
pub async fn check_auth(session: SessionContext) -> Json<AuthStatusResponse> {
    Json(AuthStatusResponse {
        authenticated: session.is_authenticated(),
        username: session.username().map(String::from),
    })
}
