use std::fmt;
use std::str::FromStr;

use auth::PasswordError;
use auth::PasswordHasher;
use auth::TokenHash;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::role::models::Role;
use crate::user::errors::EmailError;
use crate::user::errors::UserIdError;
use crate::user::errors::UsernameError;

/// User aggregate entity.
///
/// Inactive until its invitation is consumed.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub email: EmailAddress,
    pub password: PasswordCredential,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A user under construction, before storage has assigned its identifier.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: Username,
    pub email: EmailAddress,
    pub password: PasswordCredential,
    pub role: Role,
}

/// Persisted form of an invitation: the token hash and its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invitation {
    pub token_hash: TokenHash,
    pub expires_at: DateTime<Utc>,
}

/// User unique identifier, assigned by storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

impl UserId {
    /// Parse a user ID from its decimal representation.
    ///
    /// # Errors
    /// * `InvalidFormat` - String is not a positive integer
    pub fn from_string(s: &str) -> Result<Self, UserIdError> {
        match s.parse::<i64>() {
            Ok(id) if id > 0 => Ok(UserId(id)),
            Ok(id) => Err(UserIdError::InvalidFormat(id.to_string())),
            Err(e) => Err(UserIdError::InvalidFormat(e.to_string())),
        }
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Username value type
///
/// 1-100 characters, no whitespace or control characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Username(String);

impl Username {
    const MIN_LENGTH: usize = 1;
    const MAX_LENGTH: usize = 100;

    /// Create a new valid username.
    ///
    /// # Errors
    /// * `TooShort` - Empty username
    /// * `TooLong` - Longer than 100 characters
    /// * `InvalidCharacters` - Contains whitespace or control characters
    pub fn new(username: String) -> Result<Self, UsernameError> {
        let username = Self::with_valid_length(username)?;
        let username = Self::with_valid_chars(username)?;
        Ok(Self(username))
    }

    fn with_valid_length(username: String) -> Result<String, UsernameError> {
        let length = username.chars().count();
        if length < Self::MIN_LENGTH {
            Err(UsernameError::TooShort {
                min: Self::MIN_LENGTH,
                actual: length,
            })
        } else if length > Self::MAX_LENGTH {
            Err(UsernameError::TooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            })
        } else {
            Ok(username)
        }
    }

    fn with_valid_chars(username: String) -> Result<String, UsernameError> {
        if username
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            Err(UsernameError::InvalidCharacters)
        } else {
            Ok(username)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Email address type
///
/// RFC 5322 format, at most 255 characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress(String);

impl EmailAddress {
    const MAX_LENGTH: usize = 255;

    /// Create a new validated email address.
    ///
    /// # Errors
    /// * `TooLong` - Longer than 255 characters
    /// * `InvalidFormat` - Email does not conform to RFC 5322
    pub fn new(email: String) -> Result<Self, EmailError> {
        let length = email.chars().count();
        if length > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
                actual: length,
            });
        }

        email_address::EmailAddress::from_str(&email)
            .map(|_| EmailAddress(email))
            .map_err(|e| EmailError::InvalidFormat(e.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A password's salted, irreversible hash.
///
/// The plaintext that produced the hash is kept only on a freshly set
/// credential and is dropped by [`PasswordCredential::into_persisted`]. It is
/// never part of `Debug` output.
#[derive(Clone)]
pub struct PasswordCredential {
    hash: String,
    plaintext: Option<String>,
}

impl PasswordCredential {
    /// Hash `plaintext` into a new credential.
    ///
    /// # Errors
    /// * `HashingFailed` - The hasher could not produce a hash
    pub fn set(hasher: &PasswordHasher, plaintext: &str) -> Result<Self, PasswordError> {
        Ok(Self {
            hash: hasher.hash(plaintext)?,
            plaintext: Some(plaintext.to_string()),
        })
    }

    /// Rehydrate a credential from a stored hash.
    pub fn from_hash(hash: String) -> Self {
        Self {
            hash,
            plaintext: None,
        }
    }

    /// Check `plaintext` against the stored hash.
    ///
    /// # Errors
    /// * `VerificationFailed` - Stored hash is malformed
    pub fn verify(&self, hasher: &PasswordHasher, plaintext: &str) -> Result<bool, PasswordError> {
        hasher.verify(plaintext, &self.hash)
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    /// Plaintext, only while still inside the request that set it.
    pub fn plaintext(&self) -> Option<&str> {
        self.plaintext.as_deref()
    }

    /// Drop the transient plaintext, keeping only the hash.
    pub fn into_persisted(self) -> Self {
        Self::from_hash(self.hash)
    }
}

impl fmt::Debug for PasswordCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordCredential")
            .field("hash", &"<redacted>")
            .finish()
    }
}
