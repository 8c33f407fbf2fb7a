use std::fmt;

use auth::InvitationToken;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::UserId;
use crate::domain::user::models::Username;

/// Plaintext password as received from a caller.
///
/// Lives only for the duration of one request and never appears in `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct PlaintextPassword(String);

impl PlaintextPassword {
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PlaintextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PlaintextPassword(<redacted>)")
    }
}

/// Unvalidated registration input.
#[derive(Debug, Clone)]
pub struct RegisterUserPayload {
    pub username: String,
    pub email: String,
    pub password: PlaintextPassword,
}

/// Registration input that passed validation.
#[derive(Debug, Clone)]
pub struct RegisterUserCommand {
    pub username: Username,
    pub email: EmailAddress,
    pub password: PlaintextPassword,
}

/// Unvalidated login input.
#[derive(Debug, Clone)]
pub struct CreateTokenPayload {
    pub email: String,
    pub password: PlaintextPassword,
}

#[derive(Debug, Clone)]
pub struct CreateTokenCommand {
    pub email: EmailAddress,
    pub password: PlaintextPassword,
}

/// What the caller receives once a registration is committed.
///
/// The token is exposed here and nowhere else.
#[derive(Debug, Clone)]
pub struct RegistrationReceipt {
    pub token: InvitationToken,
    pub invitation_url: String,
}

/// Signed bearer token and the instant it stops being accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Verified contents of a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    pub user_id: UserId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Templates known to the notification gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailTemplate {
    UserInvitation,
}

impl MailTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            MailTemplate::UserInvitation => "user_invitation",
        }
    }
}

/// Addressee of a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub name: String,
    pub email: String,
}
