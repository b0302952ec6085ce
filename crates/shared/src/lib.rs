//! Shared types, errors, and configuration for Spendtrack.
//!
//! This crate provides common pieces used across all other crates:
//! - Session token claims and auth request/response types
//! - The token service (issue/verify)
//! - Application-wide error types
//! - Configuration management

pub mod auth;
pub mod config;
pub mod error;
pub mod jwt;

pub use auth::Claims;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use jwt::{JwtConfig, JwtError, JwtService};
