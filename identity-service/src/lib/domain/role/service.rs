use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::role::errors::AccessError;
use crate::domain::role::models::RoleName;
use crate::domain::role::ports::AccessControl;
use crate::domain::role::ports::RoleRepository;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;

/// Owner-or-precedence access check.
pub struct AccessPolicy<R>
where
    R: RoleRepository,
{
    roles: Arc<R>,
}

impl<R> AccessPolicy<R>
where
    R: RoleRepository,
{
    pub fn new(roles: Arc<R>) -> Self {
        Self { roles }
    }
}

#[async_trait]
impl<R> AccessControl for AccessPolicy<R>
where
    R: RoleRepository,
{
    async fn authorize(
        &self,
        actor: &User,
        owner_id: &UserId,
        required: RoleName,
    ) -> Result<(), AccessError> {
        if actor.id == *owner_id {
            return Ok(());
        }

        let required_role = self
            .roles
            .find_by_name(required)
            .await
            .map_err(|e| AccessError::Internal(e.to_string()))?
            .ok_or_else(|| AccessError::Internal(format!("role {} is not defined", required)))?;

        if actor.role.outranks_or_equals(&required_role) {
            Ok(())
        } else {
            tracing::debug!(
                actor_id = %actor.id,
                actor_role = %actor.role.name,
                required_role = %required,
                "Access denied"
            );
            Err(AccessError::Forbidden)
        }
    }
}
