//! API handlers for the auth gateway

pub mod auth;

pub use auth::{check_auth, csrf_token, login, logout, signup, CredentialsPayload};

use axum::{extract::State, Json};

use crate::app_state::AppState;
use crate::models::HealthResponse;

pub async fn index() -> &'static str {
    "Welcome to the Robot Manager!"
}

/// GET /health - Report whether the stores answer
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let store_status = match state.auth_service.check_stores().await {
        Ok(()) => "connected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    let status = if store_status == "connected" {
        "healthy"
    } else {
        "unhealthy"
    };

    Json(HealthResponse {
        status: status.to_string(),
        store: store_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
