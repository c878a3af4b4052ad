//! Authentication routes

use axum::{
    handler::Handler,
    http::Method,
    middleware,
    routing::any,
    Router,
};

use crate::app_state::AppState;
use crate::handlers;
use crate::middleware::{enforce_endpoint_policy, EndpointPolicy};

const GET: &[Method] = &[Method::GET];
const POST: &[Method] = &[Method::POST];

/// A mounted path and its access policy
#[derive(Debug, Clone, Copy)]
pub struct Endpoint {
    pub path: &'static str,
    pub policy: EndpointPolicy,
}

pub const INDEX: Endpoint = Endpoint {
    path: "/",
    policy: EndpointPolicy::public(GET),
};

pub const HEALTH: Endpoint = Endpoint {
    path: "/health",
    policy: EndpointPolicy::public(GET),
};

pub const CSRF: Endpoint = Endpoint {
    path: "/api/csrf/",
    policy: EndpointPolicy::public(GET),
};

pub const SIGNUP: Endpoint = Endpoint {
    path: "/api/signup/",
    policy: EndpointPolicy::public(POST),
};

pub const LOGIN: Endpoint = Endpoint {
    path: "/api/login/",
    policy: EndpointPolicy::public(POST),
};

// Anonymous callers get the same 200 as logged-in ones
pub const LOGOUT: Endpoint = Endpoint {
    path: "/api/logout/",
    policy: EndpointPolicy::public(POST),
};

pub const CHECK_AUTH: Endpoint = Endpoint {
    path: "/api/check-auth/",
    policy: EndpointPolicy::public(GET),
};

/// Route `endpoint` to `handler` behind its policy check
///
/// The handler is registered for every method so that method filtering is
/// done by the policy layer, with a JSON 405, rather than by the router.
/// `any` fills only the fallback slot, so the policy goes on with `layer`.
pub fn mount<H, T>(router: Router<AppState>, endpoint: Endpoint, handler: H) -> Router<AppState>
where
    H: Handler<T, AppState>,
    T: 'static,
{
    router.route(
        endpoint.path,
        any(handler).layer(middleware::from_fn_with_state(
            endpoint.policy,
            enforce_endpoint_policy,
        )),
    )
}

/// Create authentication routes
pub fn auth_routes() -> Router<AppState> {
    let router = Router::new();
    let router = mount(router, CSRF, handlers::csrf_token);
    let router = mount(router, SIGNUP, handlers::signup);
    let router = mount(router, LOGIN, handlers::login);
    let router = mount(router, LOGOUT, handlers::logout);
    mount(router, CHECK_AUTH, handlers::check_auth)
}

/// Index and health probe
pub fn service_routes() -> Router<AppState> {
    let router = mount(Router::new(), INDEX, handlers::index);
    mount(router, HEALTH, handlers::health_check)
}
