use async_trait::async_trait;
use auth::InvitationToken;

use crate::domain::auth::errors::AuthError;
use crate::domain::auth::errors::NotificationError;
use crate::domain::auth::errors::TokenError;
use crate::domain::auth::models::AccessClaims;
use crate::domain::auth::models::AccessToken;
use crate::domain::auth::models::CreateTokenPayload;
use crate::domain::auth::models::MailTemplate;
use crate::domain::auth::models::Recipient;
use crate::domain::auth::models::RegisterUserPayload;
use crate::domain::auth::models::RegistrationReceipt;
use crate::domain::user::models::UserId;

/// Port for onboarding and authentication operations.
#[async_trait]
pub trait AuthServicePort: Send + Sync + 'static {
    /// Register an inactive user and issue its invitation.
    ///
    /// Returns once the user and invitation are committed; the invitation
    /// email is delivered in the background.
    ///
    /// # Errors
    /// * `InvalidArgument` - Payload failed validation
    /// * `DuplicateEmail` / `DuplicateUsername` - Identity already taken
    /// * `Configuration` - Default role is missing
    /// * `Internal` - Hashing, storage or queueing failed
    async fn register_user(
        &self,
        payload: RegisterUserPayload,
    ) -> Result<RegistrationReceipt, AuthError>;

    /// Consume an invitation and activate its user.
    ///
    /// # Errors
    /// * `NotFound` - Token unknown, expired or already consumed
    /// * `Internal` - Storage failed
    async fn activate_user(&self, token: &InvitationToken) -> Result<(), AuthError>;

    /// Exchange credentials for a bearer token.
    ///
    /// # Errors
    /// * `InvalidArgument` - Payload failed validation
    /// * `InvalidCredentials` - Unknown email or wrong password
    /// * `Internal` - Storage or signing failed
    async fn create_token(&self, payload: CreateTokenPayload) -> Result<AccessToken, AuthError>;

    /// Verify a bearer token.
    ///
    /// # Errors
    /// * `Unauthenticated` - Any validation failure
    fn validate_token(&self, token: &str) -> Result<AccessClaims, AuthError>;
}

/// Issues and verifies signed bearer tokens.
pub trait TokenCodec: Send + Sync + 'static {
    fn issue(&self, user_id: &UserId) -> Result<AccessToken, TokenError>;

    fn validate(&self, token: &str) -> Result<AccessClaims, TokenError>;
}

/// Outbound email delivery. Failures may be transient.
#[async_trait]
pub trait NotificationGateway: Send + Sync + 'static {
    async fn send(
        &self,
        template: MailTemplate,
        recipient: &Recipient,
        data: &serde_json::Value,
    ) -> Result<(), NotificationError>;
}
