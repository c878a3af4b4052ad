//! Authentication module for the auth gateway
//!
//! Provides username/password authentication backed by server-side sessions.
//! - bcrypt password hashing
//! - Opaque session tokens, stored only as SHA-256 digests
//! - CSRF token minting and double-submit comparison

mod password;
mod service;
mod token;

pub use password::{hash_password, verify_password, PasswordError};
pub use service::{AuthError, AuthService, NewSession};
pub use token::{generate_token, hash_token, is_well_formed_token, tokens_match};
