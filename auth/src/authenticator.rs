use chrono::DateTime;
use chrono::Duration;
use chrono::TimeZone;
use chrono::Utc;

use crate::jwt::Claims;
use crate::jwt::JwtError;
use crate::jwt::JwtHandler;

/// Issues and validates access tokens for one issuer, audience and lifetime.
pub struct Authenticator {
    jwt_handler: JwtHandler,
    issuer: String,
    audience: String,
    token_lifetime: Duration,
}

/// A freshly issued access token.
#[derive(Debug, Clone)]
pub struct AuthenticationResult {
    /// JWT access token
    pub access_token: String,
    /// Instant after which the token is rejected
    pub expires_at: DateTime<Utc>,
}

impl Authenticator {
    /// Create a new authenticator.
    ///
    /// # Arguments
    /// * `jwt_secret` - Secret key for JWT signing
    /// * `issuer` - Issuer claim written to and required from tokens
    /// * `audience` - Audience claim written to and required from tokens
    /// * `token_lifetime` - Validity window of issued tokens
    pub fn new(jwt_secret: &[u8], issuer: &str, audience: &str, token_lifetime: Duration) -> Self {
        Self {
            jwt_handler: JwtHandler::new(jwt_secret, issuer, audience),
            issuer: issuer.to_string(),
            audience: audience.to_string(),
            token_lifetime,
        }
    }

    /// Issue a token for `subject`.
    ///
    /// # Errors
    /// * `JwtError` - Token generation failed
    pub fn issue_token(&self, subject: impl ToString) -> Result<AuthenticationResult, JwtError> {
        let claims = Claims::new(
            subject,
            &self.issuer,
            &self.audience,
            Utc::now(),
            self.token_lifetime,
        );
        let access_token = self.jwt_handler.encode(&claims)?;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .ok_or_else(|| JwtError::EncodingFailed("expiry out of range".to_string()))?;

        Ok(AuthenticationResult {
            access_token,
            expires_at,
        })
    }

    /// Validate and decode a token.
    ///
    /// # Errors
    /// * `JwtError` - Token validation or decoding failed
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        self.jwt_handler.decode(token)
    }
}
