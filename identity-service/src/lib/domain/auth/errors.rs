use thiserror::Error;

use crate::user::errors::EmailError;
use crate::user::errors::StoreError;
use crate::user::errors::UsernameError;

/// Input validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid username: {0}")]
    Username(#[from] UsernameError),

    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("Password must be between {min} and {max} characters, got {actual}")]
    PasswordLength {
        min: usize,
        max: usize,
        actual: usize,
    },
}

/// Error for notification delivery
#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    #[error("Mail provider rejected the message with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Mail provider unreachable: {0}")]
    Transport(String),
}

/// Error for bearer token operations
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token is not valid")]
    Unauthenticated,

    #[error("Token could not be issued: {0}")]
    IssueFailed(String),
}

/// Top-level error for authentication and onboarding operations
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(#[from] ValidationError),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthenticated")]
    Unauthenticated,

    #[error("Email already exists")]
    DuplicateEmail,

    #[error("Username already exists")]
    DuplicateUsername,

    #[error("Not found")]
    NotFound,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => AuthError::DuplicateEmail,
            StoreError::DuplicateUsername => AuthError::DuplicateUsername,
            StoreError::NotFound => AuthError::NotFound,
            other => AuthError::Internal(other.to_string()),
        }
    }
}
