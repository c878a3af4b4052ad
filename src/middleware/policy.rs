//! Per-endpoint access policy
//!
//! Every route is mounted with an [`EndpointPolicy`] naming the methods it
//! accepts and whether anonymous callers may reach it. The check runs as a
//! route layer, before the handler body.

use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};

use super::session::SessionContext;
use crate::error::ApiError;

#[derive(Debug, Clone, Copy)]
pub struct EndpointPolicy {
    pub methods: &'static [Method],
    pub allow_anonymous: bool,
}

impl EndpointPolicy {
    pub const fn public(methods: &'static [Method]) -> Self {
        Self {
            methods,
            allow_anonymous: true,
        }
    }

    pub const fn authenticated(methods: &'static [Method]) -> Self {
        Self {
            methods,
            allow_anonymous: false,
        }
    }

    pub fn allows_method(&self, method: &Method) -> bool {
        self.methods.contains(method)
            || (*method == Method::HEAD && self.methods.contains(&Method::GET))
    }

    /// Value for the `Allow` header
    pub fn allow_header(&self) -> String {
        self.methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Decide whether a request may proceed to the handler
    pub fn check(&self, method: &Method, context: &SessionContext) -> Result<(), ApiError> {
        if !self.allows_method(method) {
            return Err(ApiError::MethodNotAllowed {
                method: method.to_string(),
                allow: self.allow_header(),
            });
        }

        if !self.allow_anonymous && !context.is_authenticated() {
            return Err(ApiError::Unauthorized(
                "Authentication credentials were not provided.".to_string(),
            ));
        }

        Ok(())
    }
}

pub async fn enforce_endpoint_policy(
    State(policy): State<EndpointPolicy>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let context = request
        .extensions()
        .get::<SessionContext>()
        .cloned()
        .unwrap_or_default();

    policy.check(request.method(), &context)?;

    Ok(next.run(request).await)
}
