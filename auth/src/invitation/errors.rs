use thiserror::Error;

/// Error type for invitation token operations.
#[derive(Debug, Clone, Error)]
pub enum InvitationError {
    #[error("Failed to generate invitation token: {0}")]
    GenerationFailed(String),
}
