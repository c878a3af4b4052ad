//! Rate limiting middleware

use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Instant};
use tokio::sync::RwLock;

use crate::error::ApiError;

/// Token bucket for rate limiting
#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(max_tokens: f64) -> Self {
        Self {
            tokens: max_tokens,
            last_update: Instant::now(),
        }
    }

    fn try_consume(&mut self, tokens_per_second: f64, max_tokens: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * tokens_per_second).min(max_tokens);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Per-client token bucket limiter. A rate of zero disables limiting.
///
/// Clients are keyed by socket peer unless proxy headers are trusted.
#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<RwLock<HashMap<String, TokenBucket>>>,
    tokens_per_second: f64,
    max_tokens: f64,
    trust_proxy_headers: bool,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            buckets: Arc::new(RwLock::new(HashMap::new())),
            tokens_per_second: f64::from(requests_per_second),
            max_tokens: f64::from(requests_per_second) * 2.0, // Allow burst of 2x
            trust_proxy_headers: false,
        }
    }

    pub fn trust_proxy_headers(mut self, trust: bool) -> Self {
        self.trust_proxy_headers = trust;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.tokens_per_second > 0.0
    }

    /// Check if a request is allowed
    pub async fn check(&self, key: &str) -> bool {
        if !self.is_enabled() {
            return true;
        }

        let mut buckets = self.buckets.write().await;

        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(self.max_tokens));

        bucket.try_consume(self.tokens_per_second, self.max_tokens)
    }

    /// Drop buckets idle for longer than `max_age`
    pub async fn cleanup(&self, max_age: std::time::Duration) -> usize {
        let mut buckets = self.buckets.write().await;
        let before = buckets.len();
        let now = Instant::now();

        buckets.retain(|_, bucket| now.duration_since(bucket.last_update) < max_age);
        before - buckets.len()
    }
}

/// Reject clients that exceed their bucket
pub async fn rate_limit(
    State(rate_limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let connect_info = request.extensions().get::<ConnectInfo<SocketAddr>>();
    let client_key = client_ip(
        request.headers(),
        connect_info,
        rate_limiter.trust_proxy_headers,
    );

    if !rate_limiter.check(&client_key).await {
        tracing::warn!(client = %client_key, "Rate limit exceeded");
        return Err(ApiError::TooManyRequests);
    }

    Ok(next.run(request).await)
}

/// Client address for keying and logs
///
/// `X-Forwarded-For` and `X-Real-IP` are client-controlled unless a proxy
/// rewrites them, so they are read only when `trust_proxy_headers` is set.
pub fn client_ip(
    headers: &HeaderMap,
    connect_info: Option<&ConnectInfo<SocketAddr>>,
    trust_proxy_headers: bool,
) -> String {
    if trust_proxy_headers {
        if let Some(ip) = forwarded_ip(headers) {
            return ip;
        }
    }

    connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
    };

    forwarded.or_else(real_ip).map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[tokio::test]
    async fn test_rate_limiter() {
        let limiter = RateLimiter::new(5); // 5 requests per second

        // Should allow first 10 requests (burst capacity = 2x)
        for _ in 0..10 {
            assert!(limiter.check("test-client").await);
        }

        // Next request should be denied (bucket empty)
        assert!(!limiter.check("test-client").await);
    }

    #[tokio::test]
    async fn test_rate_limiter_different_clients() {
        let limiter = RateLimiter::new(1);

        assert!(limiter.check("client-a").await);
        assert!(limiter.check("client-a").await);
        assert!(!limiter.check("client-a").await);

        // Separate bucket
        assert!(limiter.check("client-b").await);
    }

    #[tokio::test]
    async fn test_zero_rate_disables_limiting() {
        let limiter = RateLimiter::new(0);
        for _ in 0..100 {
            assert!(limiter.check("client").await);
        }
    }

    #[tokio::test]
    async fn test_cleanup_drops_idle_buckets() {
        let limiter = RateLimiter::new(5);
        limiter.check("a").await;
        limiter.check("b").await;

        assert_eq!(limiter.cleanup(std::time::Duration::from_secs(3600)).await, 0);
        assert_eq!(limiter.cleanup(std::time::Duration::ZERO).await, 2);
    }

    #[test]
    fn test_rate_limiter_huge_rate() {
        let limiter = RateLimiter::new(u32::MAX);
        assert_eq!(limiter.max_tokens, f64::from(u32::MAX) * 2.0);
    }

    #[test]
    fn test_client_ip_ignores_proxy_headers_by_default() {
        let peer = ConnectInfo(SocketAddr::from(([10, 0, 0, 9], 4000)));

        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("192.168.1.2"));
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );

        assert_eq!(client_ip(&headers, Some(&peer), false), "10.0.0.9");
        assert_eq!(client_ip(&headers, None, false), "unknown");
    }

    #[test]
    fn test_client_ip_trusted_proxy_precedence() {
        let peer = ConnectInfo(SocketAddr::from(([10, 0, 0, 9], 4000)));

        let mut headers = HeaderMap::new();
        assert_eq!(client_ip(&headers, Some(&peer), true), "10.0.0.9");

        headers.insert("x-real-ip", HeaderValue::from_static("192.168.1.2"));
        assert_eq!(client_ip(&headers, Some(&peer), true), "192.168.1.2");

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers, Some(&peer), true), "203.0.113.7");
    }
}
