//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] scatch_core::EmailError),

    /// Wrong password or unknown email. The two are never told apart.
    #[error("Email or Password is incorrect!")]
    InvalidCredentials,

    #[error("You already have an account, please login!")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("{0}")]
    WeakPassword(String),

    #[error("Age must be between 13 and 120.")]
    InvalidAge,

    #[error("Please enter your full name.")]
    MissingName,

    /// Token could not be signed.
    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Whether the caller did something wrong, as opposed to a server fault.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Self::Token(_) | Self::Repository(_) | Self::PasswordHash
        )
    }
}
