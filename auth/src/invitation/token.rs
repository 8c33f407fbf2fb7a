use std::fmt;

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Digest;
use sha2::Sha256;

use super::errors::InvitationError;

/// Opaque one-time invitation token.
///
/// The plaintext is handed to the invitee exactly once; only its
/// [`TokenHash`] is ever stored.
#[derive(Clone, PartialEq, Eq)]
pub struct InvitationToken(String);

impl InvitationToken {
    const BYTES: usize = 32;

    /// Generate a fresh token from the OS random number generator.
    ///
    /// # Returns
    /// Hex-encoded 256-bit random token
    ///
    /// # Errors
    /// * `GenerationFailed` - The OS random source is unavailable
    pub fn generate() -> Result<Self, InvitationError> {
        let mut bytes = [0u8; Self::BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| InvitationError::GenerationFailed(e.to_string()))?;

        Ok(Self(hex::encode(bytes)))
    }

    /// Wrap a plaintext token received from a caller.
    pub fn from_plaintext(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive the persisted lookup hash for this token.
    pub fn hash(&self) -> TokenHash {
        InvitationTokenHasher.hash(&self.0)
    }
}

impl fmt::Debug for InvitationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InvitationToken(<redacted>)")
    }
}

/// Deterministic, non-reversible lookup key for an invitation token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenHash(String);

impl TokenHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TokenHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Turns plaintext invitation tokens into SHA-256 lookup hashes.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvitationTokenHasher;

impl InvitationTokenHasher {
    /// Hash a plaintext token.
    ///
    /// # Returns
    /// Lowercase hex SHA-256 digest of the token text
    pub fn hash(&self, token: &str) -> TokenHash {
        let digest = Sha256::digest(token.as_bytes());
        TokenHash(hex::encode(digest))
    }
}
