use std::sync::Arc;

use auth::Authenticator;
use chrono::DateTime;
use chrono::TimeZone;
use chrono::Utc;

use crate::domain::auth::errors::TokenError;
use crate::domain::auth::models::AccessClaims;
use crate::domain::auth::models::AccessToken;
use crate::domain::auth::ports::TokenCodec;
use crate::domain::user::models::UserId;

/// HS256 bearer tokens bound to a user id.
///
/// Validation failures of every kind collapse into `Unauthenticated`; the
/// specific cause is only visible at debug level.
pub struct JwtTokenCodec {
    authenticator: Arc<Authenticator>,
}

impl JwtTokenCodec {
    pub fn new(authenticator: Arc<Authenticator>) -> Self {
        Self { authenticator }
    }
}

impl TokenCodec for JwtTokenCodec {
    fn issue(&self, user_id: &UserId) -> Result<AccessToken, TokenError> {
        self.authenticator
            .issue_token(user_id)
            .map(|result| AccessToken {
                token: result.access_token,
                expires_at: result.expires_at,
            })
            .map_err(|e| TokenError::IssueFailed(e.to_string()))
    }

    fn validate(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let claims = self.authenticator.validate_token(token).map_err(|e| {
            tracing::debug!(error = %e, "Bearer token rejected");
            TokenError::Unauthenticated
        })?;

        let user_id = UserId::from_string(&claims.sub).map_err(|e| {
            tracing::debug!(error = %e, "Bearer token subject is not a user id");
            TokenError::Unauthenticated
        })?;

        Ok(AccessClaims {
            user_id,
            issued_at: timestamp(claims.iat)?,
            expires_at: timestamp(claims.exp)?,
        })
    }
}

fn timestamp(seconds: i64) -> Result<DateTime<Utc>, TokenError> {
    Utc.timestamp_opt(seconds, 0)
        .single()
        .ok_or(TokenError::Unauthenticated)
}
