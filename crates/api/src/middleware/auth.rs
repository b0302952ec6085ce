//! Session middleware for bearer-token authentication.
//!
//! Per request the middleware moves through a two-state machine:
//! unauthenticated, or authenticated with a resolved identity. It never
//! rejects a request itself; it only attaches `CurrentUser` when a valid
//! token resolves to a known user. Rejection is the `CurrentUser`
//! extractor's job, so unauthenticated requests still reach handlers that
//! choose to allow them.

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use serde_json::json;
use tracing::{debug, error};

use crate::AppState;
use spendtrack_db::entities::users;
use spendtrack_shared::AppError;

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

/// Session middleware.
///
/// 1. Extracts the Bearer token from the Authorization header
/// 2. Verifies it with the token service
/// 3. Re-resolves the subject to a user on every request (tokens can
///    outlive user-store changes)
/// 4. On success, stores `CurrentUser` in request extensions
///
/// Each failure path leaves the request unauthenticated and lets it
/// proceed; the reasons stay visible in debug logs only.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    if let Some(token) = auth_header.and_then(extract_bearer_token) {
        match state.jwt_service.verify(token) {
            Ok(claims) => match state.users.find_by_username(claims.subject()).await {
                Ok(Some(user)) => {
                    request.extensions_mut().insert(CurrentUser(user));
                }
                Ok(None) => {
                    debug!(subject = %claims.subject(), "token subject no longer resolves to a user");
                }
                Err(e) => {
                    error!(error = %e, "identity lookup failed");
                }
            },
            // Expired vs malformed stays distinguishable here via Display.
            Err(e) => {
                debug!(reason = %e, "session token rejected");
            }
        }
    }

    next.run(request).await
}

/// The authenticated user attached to a request by the session middleware.
///
/// Use as a handler argument to require authentication:
///
/// ```ignore
/// async fn handler(user: CurrentUser) -> impl IntoResponse {
///     let owner_id = user.id();
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub users::Model);

impl CurrentUser {
    /// Returns the user's ID.
    #[must_use]
    pub fn id(&self) -> uuid::Uuid {
        self.0.id
    }

    /// Returns the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.0.username
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Self>().cloned().ok_or_else(|| {
            let error = AppError::Unauthorized("Authentication required".to_string());
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": error.error_code(),
                    "message": error.message()
                })),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_standard_bearer_prefix() {
        assert_eq!(extract_bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
    }

    #[test]
    fn test_accepts_lowercase_scheme() {
        assert_eq!(extract_bearer_token("bearer tok"), Some("tok"));
    }

    #[test]
    fn test_rejects_other_schemes() {
        assert_eq!(extract_bearer_token("Basic dXNlcjpwdw=="), None);
        assert_eq!(extract_bearer_token("Token abc"), None);
        assert_eq!(extract_bearer_token("abc.def.ghi"), None);
    }

    #[test]
    fn test_rejects_scheme_without_token_separator() {
        assert_eq!(extract_bearer_token("Bearer"), None);
    }
}
