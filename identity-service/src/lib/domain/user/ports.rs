use async_trait::async_trait;
use auth::TokenHash;

use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::Invitation;
use crate::domain::user::models::NewUser;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::user::errors::CacheError;
use crate::user::errors::StoreError;
use crate::user::errors::UserError;

/// Port for user lookups used by authenticated request paths.
#[async_trait]
pub trait UserServicePort: Send + Sync + 'static {
    /// Retrieve user by unique identifier.
    ///
    /// # Errors
    /// * `NotFound` - User does not exist
    /// * `Internal` - Storage failed
    async fn get_user(&self, id: &UserId) -> Result<User, UserError>;
}

/// Durable storage for users and their invitations.
///
/// Every multi-row operation is a single transaction: it either fully
/// applies or leaves no trace.
#[async_trait]
pub trait IdentityStore: Send + Sync + 'static {
    /// Insert a user without an invitation.
    ///
    /// # Errors
    /// * `DuplicateEmail` / `DuplicateUsername` - Unique constraint violated
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    /// Insert a user and its invitation atomically.
    ///
    /// # Errors
    /// * `DuplicateEmail` / `DuplicateUsername` - Unique constraint violated
    /// * `Timeout` / `Database` - Nothing was written
    async fn create_and_invite(
        &self,
        user: NewUser,
        invitation: &Invitation,
    ) -> Result<User, StoreError>;

    /// Compensate a registration: delete the user's invitations and the user.
    ///
    /// Deleting an already absent user is not an error.
    async fn revert_create_and_invite(&self, id: &UserId) -> Result<(), StoreError>;

    /// Consume an unexpired invitation: mark its user active and delete it.
    ///
    /// # Errors
    /// * `NotFound` - No unexpired invitation matches the hash
    async fn activate(&self, token_hash: &TokenHash) -> Result<UserId, StoreError>;

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, StoreError>;
}

/// Best-effort read-through cache keyed by user id.
///
/// Non-authoritative: the store always wins.
#[async_trait]
pub trait IdentityCache: Send + Sync + 'static {
    async fn get(&self, id: &UserId) -> Result<Option<User>, CacheError>;

    async fn set(&self, user: &User) -> Result<(), CacheError>;
}
