//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] shoplite_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// Email or username already registered.
    #[error("{0}")]
    UserAlreadyExists(&'static str),

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Username outside the allowed length.
    #[error("invalid username: {0}")]
    InvalidUsername(String),

    /// Account is inactive or suspended.
    #[error("account is not active")]
    AccountDisabled,

    /// No bearer token on a request that needs one.
    #[error("authentication required")]
    MissingToken,

    /// Token failed signature, expiry, or claim checks.
    #[error("invalid or expired token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),

    /// Token was valid but its account no longer matches.
    #[error("token no longer matches an active account")]
    StaleToken,

    /// Signing a token failed.
    #[error("token signing failed")]
    TokenCreation(#[source] jsonwebtoken::errors::Error),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
