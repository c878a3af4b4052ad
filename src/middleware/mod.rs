//! Middleware for the auth gateway
//!
//! This module provides middleware for request tracing, rate limiting,
//! security headers, session resolution, CSRF protection, and per-endpoint
//! access policy.

mod csrf;
mod policy;
mod rate_limiter;
mod security;
mod session;
mod tracing;

pub use csrf::{csrf_protect, is_safe_method, CSRF_HEADER};
pub use policy::{enforce_endpoint_policy, EndpointPolicy};
pub use rate_limiter::{client_ip, rate_limit, RateLimiter};
pub use security::{hsts_header, security_headers};
pub use session::{resolve_session, SessionContext};
pub use self::tracing::request_tracing;
