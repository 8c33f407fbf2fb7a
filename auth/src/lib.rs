//! Authentication utilities library
//!
//! Provides reusable authentication infrastructure for services:
//! - Password hashing (Argon2id)
//! - JWT issuance and strict validation (HS256, mandatory `exp`/`nbf`/`iss`/`aud`)
//! - One-time invitation tokens and their SHA-256 lookup hashes
//! - Access token issuance bound to one issuer and audience
//!
//! # Examples
//!
//! ## Password Hashing
//! ```
//! use auth::PasswordHasher;
//!
//! let hasher = PasswordHasher::new();
//! let hash = hasher.hash("my_password").unwrap();
//! assert!(hasher.verify("my_password", &hash).unwrap());
//! ```
//!
//! ## Invitation Tokens
//! ```
//! use auth::InvitationToken;
//!
//! let token = InvitationToken::generate().unwrap();
//! let stored = token.hash();
//! assert_eq!(InvitationToken::from_plaintext(token.as_str()).hash(), stored);
//! ```
//!
//! ## Access Tokens
//! ```
//! use auth::Authenticator;
//! use chrono::Duration;
//!
//! let auth = Authenticator::new(
//!     b"secret_key_at_least_32_bytes_long!",
//!     "social",
//!     "social",
//!     Duration::hours(24),
//! );
//!
//! let result = auth.issue_token(42).unwrap();
//! let claims = auth.validate_token(&result.access_token).unwrap();
//! assert_eq!(claims.sub, "42");
//! ```

pub mod authenticator;
pub mod invitation;
pub mod jwt;
pub mod password;

// Re-export commonly used items
pub use authenticator::AuthenticationResult;
pub use authenticator::Authenticator;
pub use invitation::InvitationError;
pub use invitation::InvitationToken;
pub use invitation::InvitationTokenHasher;
pub use invitation::TokenHash;
pub use jwt::Claims;
pub use jwt::JwtError;
pub use jwt::JwtHandler;
pub use password::PasswordError;
pub use password::PasswordHasher;
