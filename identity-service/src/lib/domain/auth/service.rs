use std::sync::Arc;

use async_trait::async_trait;
use auth::InvitationToken;
use auth::PasswordHasher;
use chrono::Duration;
use chrono::Utc;

use crate::domain::auth::delivery::InvitationJob;
use crate::domain::auth::delivery::InvitationQueue;
use crate::domain::auth::errors::AuthError;
use crate::domain::auth::models::AccessClaims;
use crate::domain::auth::models::AccessToken;
use crate::domain::auth::models::CreateTokenPayload;
use crate::domain::auth::models::Recipient;
use crate::domain::auth::models::RegisterUserPayload;
use crate::domain::auth::models::RegistrationReceipt;
use crate::domain::auth::ports::AuthServicePort;
use crate::domain::auth::ports::TokenCodec;
use crate::domain::auth::validation::RegistrationValidator;
use crate::domain::role::models::RoleName;
use crate::domain::role::ports::RoleRepository;
use crate::domain::user::models::Invitation;
use crate::domain::user::models::NewUser;
use crate::domain::user::models::PasswordCredential;
use crate::domain::user::models::UserId;
use crate::user::ports::IdentityStore;

/// Registration parameters that come from configuration.
#[derive(Debug, Clone)]
pub struct RegistrationSettings {
    pub invitation_ttl: Duration,
    pub frontend_url: String,
}

impl RegistrationSettings {
    fn invitation_url(&self, token: &InvitationToken) -> String {
        format!(
            "{}/confirm/{}",
            self.frontend_url.trim_end_matches('/'),
            token.as_str()
        )
    }
}

/// Domain service for onboarding and authentication.
///
/// Owns the registration saga: the user and invitation are committed in one
/// store transaction, the invitation email is handed to the delivery worker,
/// and a registration that cannot reach the worker is reverted before the
/// caller sees an error.
pub struct AuthService<S, R, T>
where
    S: IdentityStore,
    R: RoleRepository,
    T: TokenCodec,
{
    store: Arc<S>,
    roles: Arc<R>,
    tokens: Arc<T>,
    validator: RegistrationValidator,
    invitations: InvitationQueue,
    settings: RegistrationSettings,
    password_hasher: PasswordHasher,
}

impl<S, R, T> AuthService<S, R, T>
where
    S: IdentityStore,
    R: RoleRepository,
    T: TokenCodec,
{
    /// Create a new auth service with injected dependencies.
    ///
    /// # Arguments
    /// * `store` - User and invitation persistence
    /// * `roles` - Role catalog
    /// * `tokens` - Bearer token codec
    /// * `validator` - Input validation rules
    /// * `invitations` - Queue feeding the invitation delivery worker
    /// * `settings` - Invitation lifetime and confirmation URL base
    pub fn new(
        store: Arc<S>,
        roles: Arc<R>,
        tokens: Arc<T>,
        validator: RegistrationValidator,
        invitations: InvitationQueue,
        settings: RegistrationSettings,
    ) -> Self {
        Self {
            store,
            roles,
            tokens,
            validator,
            invitations,
            settings,
            password_hasher: PasswordHasher::new(),
        }
    }

    pub fn with_password_hasher(mut self, password_hasher: PasswordHasher) -> Self {
        self.password_hasher = password_hasher;
        self
    }

    /// Undo a committed registration whose invitation could not be queued.
    ///
    /// The revert runs on its own task so it completes even when the caller
    /// stops polling the request.
    async fn revert_inline(&self, user_id: UserId) {
        let store = Arc::clone(&self.store);
        let revert =
            tokio::spawn(async move { store.revert_create_and_invite(&user_id).await });

        match revert.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!(
                user_id = %user_id,
                error = %e,
                "Failed to revert registration after queue rejection"
            ),
            Err(e) => tracing::error!(
                user_id = %user_id,
                error = %e,
                "Registration revert task failed"
            ),
        }
    }
}

#[async_trait]
impl<S, R, T> AuthServicePort for AuthService<S, R, T>
where
    S: IdentityStore,
    R: RoleRepository,
    T: TokenCodec,
{
    async fn register_user(
        &self,
        payload: RegisterUserPayload,
    ) -> Result<RegistrationReceipt, AuthError> {
        let command = self.validator.validate_registration(payload)?;

        let role = self
            .roles
            .find_by_name(RoleName::User)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .ok_or_else(|| {
                AuthError::Configuration(format!("default role `{}` is not defined", RoleName::User))
            })?;

        let password = PasswordCredential::set(&self.password_hasher, command.password.as_str())
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let token = InvitationToken::generate().map_err(|e| AuthError::Internal(e.to_string()))?;
        let invitation = Invitation {
            token_hash: token.hash(),
            expires_at: Utc::now() + self.settings.invitation_ttl,
        };
        let invitation_url = self.settings.invitation_url(&token);

        let new_user = NewUser {
            username: command.username,
            email: command.email,
            password: password.into_persisted(),
            role,
        };

        let user = self
            .store
            .create_and_invite(new_user, &invitation)
            .await
            .map_err(|e| {
                tracing::debug!(error = %e, "Registration rejected by store");
                AuthError::from(e)
            })?;

        tracing::info!(user_id = %user.id, "User registered, invitation pending");

        let job = InvitationJob {
            user_id: user.id,
            recipient: Recipient {
                name: user.username.to_string(),
                email: user.email.to_string(),
            },
            activation_url: invitation_url.clone(),
        };

        if let Err(e) = self.invitations.enqueue(job) {
            tracing::error!(user_id = %user.id, error = %e, "Invitation not queued, reverting registration");
            self.revert_inline(user.id).await;
            return Err(AuthError::Internal(e.to_string()));
        }

        Ok(RegistrationReceipt {
            token,
            invitation_url,
        })
    }

    async fn activate_user(&self, token: &InvitationToken) -> Result<(), AuthError> {
        let user_id = self.store.activate(&token.hash()).await?;
        tracing::info!(user_id = %user_id, "User activated");
        Ok(())
    }

    async fn create_token(&self, payload: CreateTokenPayload) -> Result<AccessToken, AuthError> {
        let command = self.validator.validate_login(payload)?;

        let user = self
            .store
            .find_by_email(&command.email)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?
            .ok_or(AuthError::InvalidCredentials)?;

        let matches = user
            .password
            .verify(&self.password_hasher, command.password.as_str())
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        if !matches {
            tracing::debug!(user_id = %user.id, "Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        self.tokens
            .issue(&user.id)
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    fn validate_token(&self, token: &str) -> Result<AccessClaims, AuthError> {
        self.tokens
            .validate(token)
            .map_err(|_| AuthError::Unauthenticated)
    }
}
