//! Session token claims and authentication payload types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by a session token.
///
/// The token is self-contained: validity is determined entirely by the
/// signature and the `exp` timestamp, never by server-side state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the username the token was issued to.
    pub sub: String,
    /// Issued-at timestamp (unix seconds).
    pub iat: i64,
    /// Expiration timestamp (unix seconds).
    pub exp: i64,
}

impl Claims {
    /// Creates claims for a subject expiring at the given instant.
    #[must_use]
    pub fn new(subject: &str, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: subject.to_string(),
            iat: Utc::now().timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the subject (username) the token asserts.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.sub
    }
}

/// Registration request payload.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    /// Desired username (becomes the token subject).
    pub username: String,
    /// User email.
    pub email: String,
    /// Plaintext password; hashed before it ever reaches the store.
    pub password: String,
}

/// Login request payload.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

/// Login response payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// The signed session token.
    pub token: String,
    /// Seconds until the token expires.
    pub expires_in: i64,
    /// The authenticated user.
    pub user: UserInfo,
}

/// User info returned in auth responses. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    /// User ID.
    pub id: Uuid,
    /// Username.
    pub username: String,
    /// Email.
    pub email: String,
}
