use async_trait::async_trait;

use crate::domain::role::errors::AccessError;
use crate::domain::role::models::Role;
use crate::domain::role::models::RoleName;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::user::errors::StoreError;

/// Role catalog lookups.
#[async_trait]
pub trait RoleRepository: Send + Sync + 'static {
    async fn find_by_name(&self, name: RoleName) -> Result<Option<Role>, StoreError>;
}

/// Decides whether an actor may act on a resource owned by `owner_id`.
#[async_trait]
pub trait AccessControl: Send + Sync + 'static {
    /// # Errors
    /// * `Forbidden` - Actor is neither the owner nor ranked at least `required`
    /// * `Internal` - The required role could not be resolved
    async fn authorize(
        &self,
        actor: &User,
        owner_id: &UserId,
        required: RoleName,
    ) -> Result<(), AccessError>;
}
