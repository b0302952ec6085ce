//! Registration and login routes.

use axum::{Json, Router, extract::State, http::StatusCode, response::IntoResponse, routing::post};
use serde_json::json;
use tracing::{error, info};

use crate::AppState;
use spendtrack_core::auth::{hash_password, verify_password};
use spendtrack_shared::AppError;
use spendtrack_shared::auth::{LoginRequest, LoginResponse, RegisterRequest, UserInfo};

/// Creates the auth router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// POST /register - Create a new user account.
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> impl IntoResponse {
    // Check if the username is taken
    match state.users.username_exists(&payload.username).await {
        Ok(true) => {
            return (
                StatusCode::CONFLICT,
                Json(json!({
                    "error": "username_exists",
                    "message": "An account with this username already exists"
                })),
            )
                .into_response();
        }
        Ok(false) => {}
        Err(e) => {
            error!(error = %e, "Database error checking username");
            return internal_error("An error occurred during registration");
        }
    }

    // Hash password; the plaintext goes no further than this handler
    let password_hash = match hash_password(&payload.password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "Failed to hash password");
            return internal_error("An error occurred during registration");
        }
    };

    match state
        .users
        .create(&payload.username, &payload.email, &password_hash)
        .await
    {
        Ok(user) => {
            info!(user_id = %user.id, username = %user.username, "User registered");

            (
                StatusCode::CREATED,
                Json(UserInfo {
                    id: user.id,
                    username: user.username,
                    email: user.email,
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to create user");
            internal_error("An error occurred during registration")
        }
    }
}

/// POST /login - Authenticate and return a session token.
///
/// Unknown username and wrong password produce the same 401 body; the
/// difference is only visible in logs.
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> impl IntoResponse {
    let user = match state.users.find_by_username(&payload.username).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            info!(username = %payload.username, "Login attempt for non-existent user");
            return invalid_credentials();
        }
        Err(e) => {
            error!(error = %e, "Database error during login");
            return internal_error("An error occurred during login");
        }
    };

    match verify_password(&payload.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            info!(user_id = %user.id, "Failed login attempt - invalid password");
            return invalid_credentials();
        }
        Err(e) => {
            error!(error = %e, "Password verification error");
            return internal_error("An error occurred during login");
        }
    }

    let token = match state.jwt_service.issue(&user.username) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "Failed to issue session token");
            return internal_error("An error occurred during login");
        }
    };

    info!(user_id = %user.id, "User logged in successfully");

    let response = LoginResponse {
        token,
        expires_in: state.jwt_service.expires_in(),
        user: UserInfo {
            id: user.id,
            username: user.username,
            email: user.email,
        },
    };

    (StatusCode::OK, Json(response)).into_response()
}

fn invalid_credentials() -> axum::response::Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "invalid_credentials",
            "message": "Invalid username or password"
        })),
    )
        .into_response()
}

fn internal_error(message: &str) -> axum::response::Response {
    let error = AppError::Internal(message.to_string());
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": error.error_code(),
            "message": error.message()
        })),
    )
        .into_response()
}
