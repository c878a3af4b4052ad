//! Cookie-aware client for driving the router in integration tests

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use axum_extra::extract::cookie::Cookie;
use serde_json::Value;
use std::collections::HashMap;
use tower::ServiceExt;

use robo_pilot_auth::{create_router, AppState, Config};

/// Fast hashing, no rate limiting
pub fn test_config() -> Config {
    Config {
        bcrypt_cost: 4,
        rate_limit_rps: 0,
        ..Config::default()
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub text: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.text)
            .unwrap_or_else(|e| panic!("response is not JSON ({e}): {}", self.text))
    }

    /// Parsed `Set-Cookie` headers
    pub fn set_cookies(&self) -> Vec<Cookie<'static>> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| Cookie::parse(v.to_str().unwrap().to_string()).unwrap())
            .collect()
    }

    pub fn set_cookie(&self, name: &str) -> Option<Cookie<'static>> {
        self.set_cookies().into_iter().find(|c| c.name() == name)
    }
}

/// One browser: a cookie jar in front of a shared router
pub struct TestClient {
    app: Router,
    cookies: HashMap<String, String>,
    /// Echo the CSRF cookie in `X-CSRFToken` on unsafe requests
    pub echo_csrf: bool,
}

impl TestClient {
    pub fn new(config: Config) -> Self {
        Self::from_state(AppState::in_memory(config))
    }

    pub fn from_state(state: AppState) -> Self {
        Self {
            app: create_router(state),
            cookies: HashMap::new(),
            echo_csrf: true,
        }
    }

    /// A second browser against the same server
    pub fn fork(&self) -> Self {
        Self {
            app: self.app.clone(),
            cookies: HashMap::new(),
            echo_csrf: true,
        }
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn set_cookie(&mut self, name: &str, value: &str) {
        self.cookies.insert(name.to_string(), value.to_string());
    }

    pub async fn get(&mut self, path: &str) -> TestResponse {
        self.send(Method::GET, path, None, &[]).await
    }

    pub async fn post_json(&mut self, path: &str, body: Value) -> TestResponse {
        self.send(Method::POST, path, Some(body.to_string()), &[])
            .await
    }

    pub async fn post_raw(&mut self, path: &str, body: &str) -> TestResponse {
        self.send(Method::POST, path, Some(body.to_string()), &[])
            .await
    }

    pub async fn post_empty(&mut self, path: &str) -> TestResponse {
        self.send(Method::POST, path, None, &[]).await
    }

    pub async fn signup(&mut self, username: &str, password: &str) -> TestResponse {
        self.post_json(
            "/api/signup/",
            serde_json::json!({ "username": username, "password": password }),
        )
        .await
    }

    pub async fn login(&mut self, username: &str, password: &str) -> TestResponse {
        self.post_json(
            "/api/login/",
            serde_json::json!({ "username": username, "password": password }),
        )
        .await
    }

    pub async fn send(
        &mut self,
        method: Method,
        path: &str,
        body: Option<String>,
        extra_headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method(method.clone()).uri(path);

        if !self.cookies.is_empty() {
            let cookie_header = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(header::COOKIE, cookie_header);
        }

        let unsafe_method = !matches!(method, Method::GET | Method::HEAD | Method::OPTIONS);
        if self.echo_csrf && unsafe_method {
            if let Some(token) = self.cookies.get("csrftoken") {
                builder = builder.header("X-CSRFToken", token.as_str());
            }
        }

        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        for (name, value) in extra_headers {
            builder = builder.header(*name, *value);
        }

        let request = builder
            .body(body.map(Body::from).unwrap_or_else(Body::empty))
            .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();

        let response = TestResponse {
            status,
            headers,
            text,
        };

        for cookie in response.set_cookies() {
            let removed = cookie.value().is_empty()
                || cookie.max_age() == Some(time::Duration::ZERO);
            if removed {
                self.cookies.remove(cookie.name());
            } else {
                self.cookies
                    .insert(cookie.name().to_string(), cookie.value().to_string());
            }
        }

        response
    }
}
