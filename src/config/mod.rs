//! Configuration management for the Robo Pilot auth gateway
//!
//! This module handles loading and validating configuration from environment variables,
//! with support for different environments (development, staging, production).

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Application environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Parse environment from string
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }

    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Get the environment name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

/// When the double-submit CSRF check applies to unsafe requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CsrfMode {
    Off,
    /// Only requests that carry a live session
    #[default]
    Session,
    Always,
}

impl CsrfMode {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "off" | "disabled" => Ok(CsrfMode::Off),
            "session" => Ok(CsrfMode::Session),
            "always" => Ok(CsrfMode::Always),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid CSRF_MODE: '{}'. Expected: off, session, or always",
                s
            ))),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Current environment
    pub environment: Environment,

    /// Bind address
    pub host: IpAddr,

    /// Server port
    pub port: u16,

    /// PostgreSQL connection URL. In-memory stores are used when unset.
    pub database_url: Option<String>,

    /// Maximum database connections
    pub db_max_connections: u32,

    /// Rate limit: requests per second per client
    pub rate_limit_rps: u32,

    /// Key rate limiting on `X-Forwarded-For`/`X-Real-IP` instead of the
    /// socket peer. Only safe behind a proxy that overwrites them.
    pub trust_proxy_headers: bool,

    /// CORS allowed origins (comma separated)
    pub cors_allowed_origins: String,

    /// Log level (RUST_LOG)
    pub log_level: String,

    /// Name of the cookie carrying the session token
    pub session_cookie_name: String,

    /// Name of the cookie carrying the CSRF token
    pub csrf_cookie_name: String,

    /// Session lifetime in seconds (default: 1209600 = two weeks)
    pub session_ttl_seconds: i64,

    /// How often expired sessions are purged
    pub session_cleanup_interval_seconds: u64,

    /// Mark cookies `Secure`
    pub cookie_secure: bool,

    pub csrf_mode: CsrfMode,

    /// bcrypt work factor
    pub bcrypt_cost: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8000,
            database_url: None,
            db_max_connections: 5,
            rate_limit_rps: 20,
            trust_proxy_headers: false,
            cors_allowed_origins: "http://localhost:5173".to_string(),
            log_level: "info".to_string(),
            session_cookie_name: "sessionid".to_string(),
            csrf_cookie_name: "csrftoken".to_string(),
            session_ttl_seconds: 1_209_600,
            session_cleanup_interval_seconds: 300,
            cookie_secure: false,
            csrf_mode: CsrfMode::Session,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let environment = env::var("ENVIRONMENT")
            .map(|s| Environment::parse(&s))
            .unwrap_or(Ok(Environment::Development))?;

        let host = match env::var("HOST") {
            Ok(raw) => raw
                .parse::<IpAddr>()
                .map_err(|_| ConfigError::InvalidValue(format!("HOST is not an IP: {}", raw)))?,
            Err(_) => defaults.host,
        };

        let port = env::var("PORT")
            .unwrap_or_else(|_| defaults.port.to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?;

        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());

        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .unwrap_or(defaults.db_max_connections);

        let rate_limit_rps = env::var("RATE_LIMIT_RPS")
            .unwrap_or_else(|_| "20".to_string())
            .parse::<u32>()
            .unwrap_or(defaults.rate_limit_rps);

        let trust_proxy_headers = env::var("TRUST_PROXY_HEADERS")
            .ok()
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(defaults.trust_proxy_headers);

        let cors_allowed_origins =
            env::var("CORS_ALLOWED_ORIGINS").unwrap_or(defaults.cors_allowed_origins);

        let log_level = env::var("RUST_LOG").unwrap_or(defaults.log_level);

        let session_cookie_name =
            env::var("SESSION_COOKIE_NAME").unwrap_or(defaults.session_cookie_name);

        let csrf_cookie_name = env::var("CSRF_COOKIE_NAME").unwrap_or(defaults.csrf_cookie_name);

        let session_ttl_seconds = env::var("SESSION_TTL_SECONDS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults.session_ttl_seconds);

        let session_cleanup_interval_seconds = env::var("SESSION_CLEANUP_INTERVAL_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults.session_cleanup_interval_seconds);

        let cookie_secure = env::var("COOKIE_SECURE")
            .ok()
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or_else(|| environment.is_production());

        let csrf_mode = env::var("CSRF_MODE")
            .map(|s| CsrfMode::parse(&s))
            .unwrap_or(Ok(defaults.csrf_mode))?;

        let bcrypt_cost = match env::var("BCRYPT_COST") {
            Ok(raw) => {
                let cost = raw
                    .parse::<u32>()
                    .map_err(|_| ConfigError::InvalidValue(format!("BCRYPT_COST: {}", raw)))?;
                if !(4..=31).contains(&cost) {
                    return Err(ConfigError::InvalidValue(
                        "BCRYPT_COST must be between 4 and 31".to_string(),
                    ));
                }
                cost
            }
            Err(_) => defaults.bcrypt_cost,
        };

        Ok(Config {
            environment,
            host,
            port,
            database_url,
            db_max_connections,
            rate_limit_rps,
            trust_proxy_headers,
            cors_allowed_origins,
            log_level,
            session_cookie_name,
            csrf_cookie_name,
            session_ttl_seconds,
            session_cleanup_interval_seconds,
            cookie_secure,
            csrf_mode,
            bcrypt_cost,
        })
    }

    /// Socket address the server binds to
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether 500 responses carry the underlying error message
    pub fn expose_internal_errors(&self) -> bool {
        !self.environment.is_production()
    }

    /// Get database URL with the password masked, for logging
    pub fn database_url_masked(&self) -> Option<String> {
        let url = self.database_url.as_ref()?;
        if let Some(at_pos) = url.find('@') {
            if let Some(colon_pos) = url[..at_pos].rfind(':') {
                let prefix = &url[..colon_pos + 1];
                let suffix = &url[at_pos..];
                return Some(format!("{}****{}", prefix, suffix));
            }
        }
        Some(url.clone())
    }
}
