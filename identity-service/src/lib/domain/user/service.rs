use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::user::errors::CacheError;
use crate::user::errors::UserError;
use crate::user::ports::IdentityCache;
use crate::user::ports::IdentityStore;
use crate::user::ports::UserServicePort;

/// Cache-aside user lookup.
///
/// Reads the cache first and falls back to the store on a miss or on any cache
/// failure. Store hits are written back to the cache. The cache can never fail
/// a lookup: each cache call is bounded by `cache_timeout` and its errors are
/// logged and dropped.
pub struct IdentityResolver<S, C>
where
    S: IdentityStore,
    C: IdentityCache,
{
    store: Arc<S>,
    cache: Arc<C>,
    cache_timeout: Duration,
}

impl<S, C> IdentityResolver<S, C>
where
    S: IdentityStore,
    C: IdentityCache,
{
    pub fn new(store: Arc<S>, cache: Arc<C>, cache_timeout: Duration) -> Self {
        Self {
            store,
            cache,
            cache_timeout,
        }
    }

    async fn cached(&self, id: &UserId) -> Option<User> {
        let lookup = tokio::time::timeout(self.cache_timeout, self.cache.get(id))
            .await
            .unwrap_or(Err(CacheError::Timeout));

        match lookup {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(user_id = %id, error = %e, "Cache read failed, falling back to store");
                None
            }
        }
    }

    async fn write_back(&self, user: &User) {
        let write = tokio::time::timeout(self.cache_timeout, self.cache.set(user))
            .await
            .unwrap_or(Err(CacheError::Timeout));

        if let Err(e) = write {
            tracing::warn!(user_id = %user.id, error = %e, "Cache write failed");
        }
    }
}

#[async_trait]
impl<S, C> UserServicePort for IdentityResolver<S, C>
where
    S: IdentityStore,
    C: IdentityCache,
{
    async fn get_user(&self, id: &UserId) -> Result<User, UserError> {
        if let Some(user) = self.cached(id).await {
            tracing::debug!(user_id = %id, "Cache hit");
            return Ok(user);
        }

        let user = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id.to_string()))?;

        self.write_back(&user).await;

        Ok(user)
    }
}
