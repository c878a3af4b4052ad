//! Robo Pilot Auth Gateway Library
//!
//! Session-based signup, login, logout, CSRF-token issuance, and
//! authentication-status endpoints for the Robo Pilot control application.

pub mod app_state;
pub mod auth;
pub mod config;
pub mod cookies;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod store;

pub use app_state::AppState;
pub use config::Config;
pub use error::ApiError;
pub use routes::create_router;
