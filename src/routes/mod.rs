//! Route definitions and middleware stack for the auth gateway

mod auth;

pub use auth::{
    auth_routes, mount, service_routes, Endpoint, CHECK_AUTH, CSRF, HEALTH, INDEX, LOGIN,
    LOGOUT, SIGNUP,
};

use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::app_state::AppState;
use crate::config::Config;
use crate::middleware::{
    csrf_protect, hsts_header, rate_limit, request_tracing, resolve_session, security_headers,
    CSRF_HEADER,
};

/// Build the complete application router
///
/// Layers, outermost first: CORS, rate limit, request tracing, security
/// headers (plus HSTS in production), session resolution, CSRF check. Each
/// route additionally carries its endpoint policy layer.
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    let router = Router::new()
        .merge(service_routes())
        .merge(auth_routes())
        .layer(from_fn_with_state(state.clone(), csrf_protect))
        .layer(from_fn_with_state(state.clone(), resolve_session))
        .layer(from_fn(security_headers));

    let router = if config.environment.is_production() {
        router.layer(from_fn(hsts_header))
    } else {
        router
    };

    router
        .layer(from_fn(request_tracing))
        .layer(from_fn_with_state(state.rate_limiter.clone(), rate_limit))
        .layer(configure_cors(&config))
        .with_state(state)
}

/// CORS for the browser client. Cookies require explicit origins.
pub fn configure_cors(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "*")
        .filter_map(|s| s.parse().ok())
        .collect();

    if origins.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS has no usable origins, allowing all origins without credentials");
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(CSRF_HEADER)])
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    async fn status_of(app: &Router, method: Method, path: &str) -> StatusCode {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .unwrap();
        app.clone().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn test_router_serves_every_endpoint() {
        let app = create_router(AppState::in_memory(Config::default()));

        let cases = [
            (Method::GET, INDEX.path, StatusCode::OK),
            (Method::GET, HEALTH.path, StatusCode::OK),
            (Method::GET, CSRF.path, StatusCode::OK),
            (Method::GET, CHECK_AUTH.path, StatusCode::OK),
            (Method::POST, LOGOUT.path, StatusCode::OK),
            // Empty bodies fail field validation
            (Method::POST, SIGNUP.path, StatusCode::BAD_REQUEST),
            (Method::POST, LOGIN.path, StatusCode::BAD_REQUEST),
        ];

        for (method, path, expected) in cases {
            assert_eq!(status_of(&app, method.clone(), path).await, expected, "{method} {path}");
        }
    }

    #[tokio::test]
    async fn test_router_rejects_wrong_methods() {
        let app = create_router(AppState::in_memory(Config::default()));

        assert_eq!(
            status_of(&app, Method::GET, SIGNUP.path).await,
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            status_of(&app, Method::DELETE, CHECK_AUTH.path).await,
            StatusCode::METHOD_NOT_ALLOWED
        );
    }
}
