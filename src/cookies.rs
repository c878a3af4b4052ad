//! Session and CSRF cookie construction

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::auth::{generate_token, is_well_formed_token};
use crate::config::Config;

const CSRF_COOKIE_MAX_AGE_SECONDS: i64 = 31_449_600; // one year

/// Add the session cookie for a freshly issued token
pub fn with_session(jar: CookieJar, config: &Config, token: String) -> CookieJar {
    let cookie = Cookie::build((config.session_cookie_name.clone(), token))
        .path("/")
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(config.session_ttl_seconds));

    jar.add(cookie)
}

/// Instruct the client to drop its session cookie
pub fn without_session(jar: CookieJar, config: &Config) -> CookieJar {
    jar.remove(Cookie::build((config.session_cookie_name.clone(), "")).path("/"))
}

/// Current CSRF token from the request, if it looks like one we minted
pub fn current_csrf_token(jar: &CookieJar, config: &Config) -> Option<String> {
    jar.get(&config.csrf_cookie_name)
        .map(|c| c.value().to_string())
        .filter(|v| is_well_formed_token(v))
}

/// Add a CSRF cookie. Readable from script so the client can echo it.
pub fn with_csrf(jar: CookieJar, config: &Config, token: String) -> CookieJar {
    let cookie = Cookie::build((config.csrf_cookie_name.clone(), token))
        .path("/")
        .http_only(false)
        .secure(config.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(CSRF_COOKIE_MAX_AGE_SECONDS));

    jar.add(cookie)
}

/// Keep the request's CSRF token, or mint one
pub fn ensure_csrf(jar: CookieJar, config: &Config) -> CookieJar {
    let token = current_csrf_token(&jar, config).unwrap_or_else(generate_token);
    with_csrf(jar, config, token)
}

/// Replace the CSRF token, done whenever the session changes hands
pub fn rotate_csrf(jar: CookieJar, config: &Config) -> CookieJar {
    with_csrf(jar, config, generate_token())
}
