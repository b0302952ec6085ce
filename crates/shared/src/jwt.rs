//! Session token issuance and verification.
//!
//! Tokens are signed JWTs (HS256) carrying the username as subject. There is
//! no server-side session store: a token stays valid until its expiry, and a
//! still-unexpired token cannot be proactively invalidated.

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use crate::auth::Claims;

/// Token service configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens. Must be non-empty.
    pub secret: String,
    /// Token time-to-live in seconds.
    pub token_ttl_secs: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: "change-me-in-production".to_string(),
            token_ttl_secs: 3600,
        }
    }
}

/// Errors that can occur during token operations.
#[derive(Debug, Error)]
pub enum JwtError {
    /// No signing secret was configured.
    #[error("no signing secret configured")]
    MissingSecret,

    /// Token encoding failed.
    #[error("failed to encode token: {0}")]
    EncodingError(String),

    /// Token has expired.
    #[error("token has expired")]
    Expired,

    /// Token cannot be parsed or its signature does not verify.
    #[error("malformed token: {0}")]
    Malformed(String),
}

/// Issues and verifies session tokens.
///
/// Construct once at startup from process-wide configuration; the signing
/// secret is immutable afterwards.
#[derive(Clone)]
pub struct JwtService {
    token_ttl_secs: i64,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("token_ttl_secs", &self.token_ttl_secs)
            .field("encoding_key", &"[hidden]")
            .field("decoding_key", &"[hidden]")
            .finish()
    }
}

impl JwtService {
    /// Creates a token service from configuration.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::MissingSecret` when the configured secret is empty.
    pub fn from_config(config: &JwtConfig) -> Result<Self, JwtError> {
        if config.secret.is_empty() {
            return Err(JwtError::MissingSecret);
        }

        Ok(Self {
            token_ttl_secs: config.token_ttl_secs,
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
        })
    }

    /// Issues a signed token for a subject (username).
    ///
    /// # Errors
    ///
    /// Returns `JwtError::EncodingError` if signing fails.
    pub fn issue(&self, subject: &str) -> Result<String, JwtError> {
        let expires_at = Utc::now() + Duration::seconds(self.token_ttl_secs);
        let claims = Claims::new(subject, expires_at);

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::EncodingError(e.to_string()))
    }

    /// Verifies a token's signature and expiry, returning its claims.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::Expired` if the token's expiry has passed.
    /// Returns `JwtError::Malformed` if it cannot be parsed or the signature
    /// does not verify. Callers treat both as unauthenticated; the variants
    /// exist for diagnostics.
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let validation = Validation::default();

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Malformed(e.to_string()),
            })
    }

    /// Returns the token time-to-live in seconds.
    #[must_use]
    pub const fn expires_in(&self) -> i64 {
        self.token_ttl_secs
    }
}
