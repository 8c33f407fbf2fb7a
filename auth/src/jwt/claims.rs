use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Registered JWT claims carried by every access token.
///
/// All fields are mandatory. A token whose payload lacks any of them fails
/// deserialization and is therefore rejected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject (user identifier)
    pub sub: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,
}

impl Claims {
    /// Create claims valid from `now` for `lifetime`.
    ///
    /// # Arguments
    /// * `subject` - Subject identifier
    /// * `issuer` - Token issuer
    /// * `audience` - Intended audience
    /// * `now` - Issuance instant (also used as not-before)
    /// * `lifetime` - Validity window
    pub fn new(
        subject: impl ToString,
        issuer: impl ToString,
        audience: impl ToString,
        now: DateTime<Utc>,
        lifetime: Duration,
    ) -> Self {
        Self {
            sub: subject.to_string(),
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            iss: issuer.to_string(),
            aud: audience.to_string(),
        }
    }
}
