use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use auth::TokenHash;
use chrono::DateTime;
use chrono::Utc;
use sqlx::PgPool;
use sqlx::Postgres;
use sqlx::Transaction;

use crate::domain::role::models::Role;
use crate::domain::role::models::RoleId;
use crate::domain::role::models::RoleName;
use crate::domain::role::ports::RoleRepository;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::Invitation;
use crate::domain::user::models::NewUser;
use crate::domain::user::models::PasswordCredential;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::Username;
use crate::user::errors::StoreError;
use crate::user::ports::IdentityStore;

const SELECT_USER: &str = r#"
    SELECT u.id, u.username, u.email, u.password_hash, u.is_active, u.created_at,
           r.id AS role_id, r.name AS role_name, r.description AS role_description,
           r.level AS role_level
    FROM users u
    JOIN roles r ON r.id = u.role_id
"#;

/// PostgreSQL-backed identity store and role catalog.
///
/// Every call runs under `query_timeout`. A timed-out transaction is dropped
/// before commit and therefore rolled back.
pub struct PostgresIdentityStore {
    pool: PgPool,
    query_timeout: Duration,
}

impl PostgresIdentityStore {
    pub fn new(pool: PgPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    async fn timed<T, F>(&self, operation: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.query_timeout, operation)
            .await
            .map_err(|_| StoreError::Timeout(self.query_timeout))?
    }

    async fn insert_user(
        tx: &mut Transaction<'_, Postgres>,
        user: NewUser,
    ) -> Result<User, StoreError> {
        let (id, created_at): (i64, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO users (username, email, password_hash, role_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, created_at
            "#,
        )
        .bind(user.username.as_str())
        .bind(user.email.as_str())
        .bind(user.password.hash())
        .bind(user.role.id.0)
        .fetch_one(&mut **tx)
        .await
        .map_err(classify)?;

        Ok(User {
            id: UserId(id),
            username: user.username,
            email: user.email,
            password: user.password,
            role: user.role,
            is_active: false,
            created_at,
        })
    }

    async fn find_one(&self, clause: &str, value: UserLookup<'_>) -> Result<Option<User>, StoreError> {
        let query = format!("{} WHERE {}", SELECT_USER, clause);
        let row = match value {
            UserLookup::Id(id) => {
                sqlx::query_as::<_, UserRow>(&query)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await
            }
            UserLookup::Email(email) => {
                sqlx::query_as::<_, UserRow>(&query)
                    .bind(email)
                    .fetch_optional(&self.pool)
                    .await
            }
        }
        .map_err(classify)?;

        row.map(User::try_from).transpose()
    }
}

enum UserLookup<'a> {
    Id(i64),
    Email(&'a str),
}

#[async_trait]
impl IdentityStore for PostgresIdentityStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        self.timed(async {
            let mut tx = self.pool.begin().await.map_err(classify)?;
            let created = Self::insert_user(&mut tx, user).await?;
            tx.commit().await.map_err(classify)?;
            Ok(created)
        })
        .await
    }

    async fn create_and_invite(
        &self,
        user: NewUser,
        invitation: &Invitation,
    ) -> Result<User, StoreError> {
        self.timed(async {
            let mut tx = self.pool.begin().await.map_err(classify)?;
            let created = Self::insert_user(&mut tx, user).await?;

            sqlx::query(
                r#"
                INSERT INTO user_invitations (token_hash, user_id, expiry)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(invitation.token_hash.as_str())
            .bind(created.id.0)
            .bind(invitation.expires_at)
            .execute(&mut *tx)
            .await
            .map_err(classify)?;

            tx.commit().await.map_err(classify)?;
            Ok(created)
        })
        .await
    }

    async fn revert_create_and_invite(&self, id: &UserId) -> Result<(), StoreError> {
        self.timed(async {
            let mut tx = self.pool.begin().await.map_err(classify)?;

            sqlx::query("DELETE FROM user_invitations WHERE user_id = $1")
                .bind(id.0)
                .execute(&mut *tx)
                .await
                .map_err(classify)?;

            sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(id.0)
                .execute(&mut *tx)
                .await
                .map_err(classify)?;

            tx.commit().await.map_err(classify)
        })
        .await
    }

    async fn activate(&self, token_hash: &TokenHash) -> Result<UserId, StoreError> {
        self.timed(async {
            let mut tx = self.pool.begin().await.map_err(classify)?;

            let activated: Option<(i64,)> = sqlx::query_as(
                r#"
                UPDATE users
                SET is_active = TRUE
                FROM user_invitations ui
                WHERE ui.user_id = users.id
                  AND ui.token_hash = $1
                  AND ui.expiry > $2
                RETURNING users.id
                "#,
            )
            .bind(token_hash.as_str())
            .bind(Utc::now())
            .fetch_optional(&mut *tx)
            .await
            .map_err(classify)?;

            let (user_id,) = activated.ok_or(StoreError::NotFound)?;

            sqlx::query("DELETE FROM user_invitations WHERE user_id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await
                .map_err(classify)?;

            tx.commit().await.map_err(classify)?;
            Ok(UserId(user_id))
        })
        .await
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        self.timed(self.find_one("u.id = $1", UserLookup::Id(id.0)))
            .await
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, StoreError> {
        self.timed(self.find_one("u.email = $1", UserLookup::Email(email.as_str())))
            .await
    }
}

#[async_trait]
impl RoleRepository for PostgresIdentityStore {
    async fn find_by_name(&self, name: RoleName) -> Result<Option<Role>, StoreError> {
        self.timed(async {
            let row = sqlx::query_as::<_, RoleRow>(
                r#"
                SELECT id, name, description, level
                FROM roles
                WHERE name = $1
                "#,
            )
            .bind(name.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(classify)?;

            row.map(Role::try_from).transpose()
        })
        .await
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    role_id: i64,
    role_name: String,
    role_description: String,
    role_level: i64,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::try_from(RoleRow {
            id: row.role_id,
            name: row.role_name,
            description: row.role_description,
            level: row.role_level,
        })?;

        Ok(User {
            id: UserId(row.id),
            username: Username::new(row.username)
                .map_err(|e| StoreError::Corrupted(e.to_string()))?,
            email: EmailAddress::new(row.email).map_err(|e| StoreError::Corrupted(e.to_string()))?,
            password: PasswordCredential::from_hash(row.password_hash),
            role,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RoleRow {
    id: i64,
    name: String,
    description: String,
    level: i64,
}

impl TryFrom<RoleRow> for Role {
    type Error = StoreError;

    fn try_from(row: RoleRow) -> Result<Self, Self::Error> {
        Ok(Role {
            id: RoleId(row.id),
            name: RoleName::from_str(&row.name).map_err(|e| StoreError::Corrupted(e.to_string()))?,
            description: row.description,
            level: row.level,
        })
    }
}

/// Map a driver error onto the store taxonomy, naming unique violations.
fn classify(e: sqlx::Error) -> StoreError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some("users_email_key") => return StoreError::DuplicateEmail,
                Some("users_username_key") => return StoreError::DuplicateUsername,
                _ => {}
            }
        }
    }
    StoreError::Database(e.to_string())
}
