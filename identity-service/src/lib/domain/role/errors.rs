use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoleError {
    #[error("Unknown role: {0}")]
    UnknownRole(String),
}

/// Outcome of a failed authorization check
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("Insufficient privileges")]
    Forbidden,

    #[error("Authorization could not be evaluated: {0}")]
    Internal(String),
}
