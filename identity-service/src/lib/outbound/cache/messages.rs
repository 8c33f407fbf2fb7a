use std::str::FromStr;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::domain::role::models::Role;
use crate::domain::role::models::RoleId;
use crate::domain::role::models::RoleName;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::PasswordCredential;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::Username;
use crate::user::errors::CacheError;

/// Cached representation of a user.
///
/// The password field is the stored PHC hash; plaintext never reaches the
/// cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: CachedRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedRole {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub level: i64,
}

impl From<&User> for CachedUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.as_i64(),
            username: user.username.as_str().to_string(),
            email: user.email.as_str().to_string(),
            password_hash: user.password.hash().to_string(),
            role: CachedRole {
                id: user.role.id.0,
                name: user.role.name.as_str().to_string(),
                description: user.role.description.clone(),
                level: user.role.level,
            },
            is_active: user.is_active,
            created_at: user.created_at,
        }
    }
}

impl TryFrom<CachedUser> for User {
    type Error = CacheError;

    fn try_from(cached: CachedUser) -> Result<Self, Self::Error> {
        Ok(User {
            id: UserId(cached.id),
            username: Username::new(cached.username)
                .map_err(|e| CacheError::Serialization(e.to_string()))?,
            email: EmailAddress::new(cached.email)
                .map_err(|e| CacheError::Serialization(e.to_string()))?,
            password: PasswordCredential::from_hash(cached.password_hash),
            role: Role {
                id: RoleId(cached.role.id),
                name: RoleName::from_str(&cached.role.name)
                    .map_err(|e| CacheError::Serialization(e.to_string()))?,
                description: cached.role.description,
                level: cached.role.level,
            },
            is_active: cached.is_active,
            created_at: cached.created_at,
        })
    }
}
