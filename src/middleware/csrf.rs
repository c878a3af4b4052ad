//! Double-submit CSRF protection
//!
//! Unsafe requests must echo the CSRF cookie in the `X-CSRFToken` header.
//! Which requests are checked depends on [`CsrfMode`]; in the default
//! `Session` mode only requests carrying a live session are checked, so an
//! anonymous browser can log in before it has fetched a token.

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use super::session::SessionContext;
use crate::app_state::AppState;
use crate::auth::tokens_match;
use crate::config::CsrfMode;
use crate::error::ApiError;

pub const CSRF_HEADER: &str = "x-csrftoken";

const REASON_NO_COOKIE: &str = "CSRF Failed: CSRF cookie not set.";
const REASON_BAD_TOKEN: &str = "CSRF Failed: CSRF token missing or incorrect.";

/// Methods that must not change state
pub fn is_safe_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

/// Must run after [`super::resolve_session`]
pub async fn csrf_protect(
    State(state): State<AppState>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if is_safe_method(request.method()) {
        return Ok(next.run(request).await);
    }

    let applies = match state.config.csrf_mode {
        CsrfMode::Off => false,
        CsrfMode::Always => true,
        CsrfMode::Session => request
            .extensions()
            .get::<SessionContext>()
            .is_some_and(SessionContext::is_authenticated),
    };

    if applies {
        check_token(&jar, &state.config.csrf_cookie_name, &request)?;
    }

    Ok(next.run(request).await)
}

fn check_token(jar: &CookieJar, cookie_name: &str, request: &Request) -> Result<(), ApiError> {
    let cookie = jar
        .get(cookie_name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            tracing::warn!(path = %request.uri().path(), "CSRF cookie missing");
            ApiError::Forbidden(REASON_NO_COOKIE.to_string())
        })?;

    let header = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();

    if !tokens_match(header, &cookie) {
        tracing::warn!(path = %request.uri().path(), "CSRF token mismatch");
        return Err(ApiError::Forbidden(REASON_BAD_TOKEN.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::header;

    fn request_with(header_value: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/api/logout/");
        if let Some(value) = header_value {
            builder = builder.header(CSRF_HEADER, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn jar_with(cookie: Option<&str>) -> CookieJar {
        let mut headers = axum::http::HeaderMap::new();
        if let Some(value) = cookie {
            headers.insert(header::COOKIE, format!("csrftoken={value}").parse().unwrap());
        }
        CookieJar::from_headers(&headers)
    }

    #[test]
    fn test_safe_methods() {
        assert!(is_safe_method(&Method::GET));
        assert!(is_safe_method(&Method::OPTIONS));
        assert!(!is_safe_method(&Method::POST));
        assert!(!is_safe_method(&Method::DELETE));
    }

    #[test]
    fn test_matching_token_passes() {
        let result = check_token(&jar_with(Some("tok")), "csrftoken", &request_with(Some("tok")));
        assert!(result.is_ok());
    }

    #[test]
    fn test_missing_cookie_rejected() {
        let err = check_token(&jar_with(None), "csrftoken", &request_with(Some("tok"))).unwrap_err();
        assert_eq!(err, ApiError::Forbidden(REASON_NO_COOKIE.to_string()));
    }

    #[test]
    fn test_missing_or_wrong_header_rejected() {
        let err = check_token(&jar_with(Some("tok")), "csrftoken", &request_with(None)).unwrap_err();
        assert_eq!(err, ApiError::Forbidden(REASON_BAD_TOKEN.to_string()));

        let err =
            check_token(&jar_with(Some("tok")), "csrftoken", &request_with(Some("other"))).unwrap_err();
        assert_eq!(err, ApiError::Forbidden(REASON_BAD_TOKEN.to_string()));
    }
}
