use async_trait::async_trait;

use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::user::errors::CacheError;
use crate::user::ports::IdentityCache;

pub mod disabled;
pub mod messages;
pub mod redis;

pub use disabled::DisabledIdentityCache;
pub use self::redis::RedisIdentityCache;

/// Cache implementation chosen at startup.
pub enum IdentityCacheBackend {
    Redis(RedisIdentityCache),
    Disabled(DisabledIdentityCache),
}

#[async_trait]
impl IdentityCache for IdentityCacheBackend {
    async fn get(&self, id: &UserId) -> Result<Option<User>, CacheError> {
        match self {
            IdentityCacheBackend::Redis(cache) => cache.get(id).await,
            IdentityCacheBackend::Disabled(cache) => cache.get(id).await,
        }
    }

    async fn set(&self, user: &User) -> Result<(), CacheError> {
        match self {
            IdentityCacheBackend::Redis(cache) => cache.set(user).await,
            IdentityCacheBackend::Disabled(cache) => cache.set(user).await,
        }
    }
}
