//! Request and response bodies for the auth endpoints

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::ApiError;

pub const MISSING_CREDENTIALS: &str = "Username and password are required";
pub const USERNAME_TOO_LONG: &str = "Username must be at most 150 characters";

/// Matches the `auth_users.username` column width
pub const USERNAME_MAX_CHARS: usize = 150;

/// Body of signup and login requests
///
/// Both fields are optional at the serde level so that an absent field, a
/// `null`, and an empty string all fail validation the same way.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CredentialsRequest {
    #[validate(required, length(min = 1, max = 150))]
    pub username: Option<String>,

    #[validate(required, length(min = 1))]
    pub password: Option<String>,
}

/// Credentials that passed validation
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"****")
            .finish()
    }
}

impl CredentialsRequest {
    /// Validate and unwrap into [`Credentials`]
    pub fn into_credentials(self) -> Result<Credentials, ApiError> {
        self.validate().map_err(|_| {
            // Missing fields are reported first
            let complete = self.username.as_deref().is_some_and(|u| !u.is_empty())
                && self.password.as_deref().is_some_and(|p| !p.is_empty());
            if complete {
                ApiError::Validation(USERNAME_TOO_LONG.to_string())
            } else {
                ApiError::Validation(MISSING_CREDENTIALS.to_string())
            }
        })?;

        match (self.username, self.password) {
            (Some(username), Some(password)) => Ok(Credentials { username, password }),
            _ => Err(ApiError::Validation(MISSING_CREDENTIALS.to_string())),
        }
    }
}

/// `{"detail": ...}` body of the CSRF endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct DetailResponse {
    pub detail: String,
}

/// `{"message": ...}` body, optionally naming the user
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            username: None,
        }
    }

    pub fn for_user(message: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            username: Some(username.into()),
        }
    }
}

/// Body of the check-auth endpoint
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthStatusResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub store: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(username: Option<&str>, password: Option<&str>) -> CredentialsRequest {
        CredentialsRequest {
            username: username.map(String::from),
            password: password.map(String::from),
        }
    }

    #[test]
    fn test_valid_credentials() {
        let creds = request(Some("ada"), Some("hunter2")).into_credentials().unwrap();
        assert_eq!(creds.username, "ada");
        assert_eq!(creds.password, "hunter2");
    }

    #[test]
    fn test_missing_or_empty_fields_rejected() {
        let cases = [
            request(None, Some("pw")),
            request(Some("ada"), None),
            request(Some(""), Some("pw")),
            request(Some("ada"), Some("")),
            request(None, None),
        ];

        for case in cases {
            assert_eq!(
                case.into_credentials().unwrap_err(),
                ApiError::Validation(MISSING_CREDENTIALS.to_string())
            );
        }
    }

    #[test]
    fn test_username_length_limit() {
        let longest = "a".repeat(USERNAME_MAX_CHARS);
        assert!(request(Some(&longest), Some("pw")).into_credentials().is_ok());

        // Counted in characters, like the VARCHAR column
        let wide = "é".repeat(USERNAME_MAX_CHARS);
        assert!(request(Some(&wide), Some("pw")).into_credentials().is_ok());

        let too_long = "a".repeat(USERNAME_MAX_CHARS + 1);
        assert_eq!(
            request(Some(&too_long), Some("pw")).into_credentials().unwrap_err(),
            ApiError::Validation(USERNAME_TOO_LONG.to_string())
        );
        assert_eq!(
            request(Some(&too_long), Some("")).into_credentials().unwrap_err(),
            ApiError::Validation(MISSING_CREDENTIALS.to_string())
        );
    }

    #[test]
    fn test_whitespace_is_not_empty() {
        assert!(request(Some(" "), Some(" ")).into_credentials().is_ok());
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = request(Some("ada"), Some("hunter2")).into_credentials().unwrap();
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }

    #[test]
    fn test_auth_status_omits_username_when_anonymous() {
        let body = serde_json::to_value(AuthStatusResponse {
            authenticated: false,
            username: None,
        })
        .unwrap();

        assert_eq!(body, serde_json::json!({ "authenticated": false }));
    }
}
