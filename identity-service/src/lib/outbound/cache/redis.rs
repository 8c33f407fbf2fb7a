use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::messages::CachedUser;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::user::errors::CacheError;
use crate::user::ports::IdentityCache;

/// Redis-backed identity cache storing JSON under `user-{id}`.
#[derive(Clone)]
pub struct RedisIdentityCache {
    connection: ConnectionManager,
    ttl: Duration,
}

impl RedisIdentityCache {
    /// Connect to Redis.
    ///
    /// # Errors
    /// * `Unavailable` - URL is invalid or the server cannot be reached
    pub async fn connect(url: &str, ttl: Duration) -> Result<Self, CacheError> {
        let client =
            redis::Client::open(url).map_err(|e| CacheError::Unavailable(e.to_string()))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;

        Ok(Self { connection, ttl })
    }

    fn key(id: &UserId) -> String {
        format!("user-{}", id)
    }
}

#[async_trait]
impl IdentityCache for RedisIdentityCache {
    async fn get(&self, id: &UserId) -> Result<Option<User>, CacheError> {
        let mut connection = self.connection.clone();
        let payload: Option<String> = connection
            .get(Self::key(id))
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;

        payload
            .map(|json| {
                serde_json::from_str::<CachedUser>(&json)
                    .map_err(|e| CacheError::Serialization(e.to_string()))
                    .and_then(User::try_from)
            })
            .transpose()
    }

    async fn set(&self, user: &User) -> Result<(), CacheError> {
        let json = serde_json::to_string(&CachedUser::from(user))
            .map_err(|e| CacheError::Serialization(e.to_string()))?;

        let mut connection = self.connection.clone();
        connection
            .set_ex::<_, _, ()>(Self::key(&user.id), json, self.ttl.as_secs().max(1))
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))
    }
}
