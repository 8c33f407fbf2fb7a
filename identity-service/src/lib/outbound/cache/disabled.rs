use async_trait::async_trait;

use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::user::errors::CacheError;
use crate::user::ports::IdentityCache;

/// Always misses. Used when Redis is turned off or unreachable at startup.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledIdentityCache;

#[async_trait]
impl IdentityCache for DisabledIdentityCache {
    async fn get(&self, _id: &UserId) -> Result<Option<User>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _user: &User) -> Result<(), CacheError> {
        Ok(())
    }
}
