#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use auth::Authenticator;
use auth::PasswordHasher;
use auth::TokenHash;
use chrono::DateTime;
use chrono::Utc;
use identity_service::domain::auth::delivery::DeliveryStats;
use identity_service::domain::auth::delivery::InvitationWorker;
use identity_service::domain::auth::delivery::RetryPolicy;
use identity_service::domain::auth::delivery::WorkerHandle;
use identity_service::domain::auth::errors::NotificationError;
use identity_service::domain::auth::models::MailTemplate;
use identity_service::domain::auth::models::Recipient;
use identity_service::domain::auth::ports::NotificationGateway;
use identity_service::domain::auth::service::AuthService;
use identity_service::domain::auth::service::RegistrationSettings;
use identity_service::domain::auth::token::JwtTokenCodec;
use identity_service::domain::auth::validation::RegistrationValidator;
use identity_service::domain::role::models::Role;
use identity_service::domain::role::models::RoleId;
use identity_service::domain::role::models::RoleName;
use identity_service::domain::role::ports::RoleRepository;
use identity_service::domain::role::service::AccessPolicy;
use identity_service::domain::user::models::EmailAddress;
use identity_service::domain::user::models::Invitation;
use identity_service::domain::user::models::NewUser;
use identity_service::domain::user::models::User;
use identity_service::domain::user::models::UserId;
use identity_service::domain::user::service::IdentityResolver;
use identity_service::inbound::http::router::create_router;
use identity_service::user::errors::CacheError;
use identity_service::user::errors::StoreError;
use identity_service::user::ports::IdentityCache;
use identity_service::user::ports::IdentityStore;

pub const JWT_SECRET: &[u8] = b"test-secret-key-for-jwt-signing-at-least-32-bytes";
pub const FRONTEND_URL: &str = "http://localhost:4000";

/// In-memory identity store with the same atomicity and uniqueness rules as
/// the PostgreSQL schema.
pub struct InMemoryIdentityStore {
    state: Mutex<StoreState>,
    roles: HashMap<RoleName, Role>,
}

#[derive(Default)]
struct StoreState {
    next_id: i64,
    users: HashMap<i64, User>,
    invitations: HashMap<TokenHash, (UserId, DateTime<Utc>)>,
}

impl InMemoryIdentityStore {
    pub fn new() -> Self {
        let roles = [
            (RoleName::User, 1, 1),
            (RoleName::Moderator, 2, 5),
            (RoleName::Admin, 3, 10),
        ]
        .into_iter()
        .map(|(name, id, level)| {
            (
                name,
                Role {
                    id: RoleId(id),
                    name,
                    description: name.as_str().to_string(),
                    level,
                },
            )
        })
        .collect();

        Self {
            state: Mutex::new(StoreState::default()),
            roles,
        }
    }

    pub fn without_roles() -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            roles: HashMap::new(),
        }
    }

    pub fn user_count(&self) -> usize {
        self.state.lock().unwrap().users.len()
    }

    pub fn invitation_count(&self) -> usize {
        self.state.lock().unwrap().invitations.len()
    }

    pub fn user_by_email(&self, email: &str) -> Option<User> {
        self.state
            .lock()
            .unwrap()
            .users
            .values()
            .find(|user| user.email.as_str() == email)
            .cloned()
    }

    pub fn assign_role(&self, id: UserId, name: RoleName) {
        let role = self.roles[&name].clone();
        if let Some(user) = self.state.lock().unwrap().users.get_mut(&id.0) {
            user.role = role;
        }
    }

    pub fn expire_invitations(&self) {
        let past = Utc::now() - chrono::Duration::seconds(1);
        for (_, expiry) in self.state.lock().unwrap().invitations.values_mut() {
            *expiry = past;
        }
    }

    fn insert(state: &mut StoreState, user: NewUser) -> Result<User, StoreError> {
        if state.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        if state.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::DuplicateUsername);
        }

        state.next_id += 1;
        let created = User {
            id: UserId(state.next_id),
            username: user.username,
            email: user.email,
            password: user.password,
            role: user.role,
            is_active: false,
            created_at: Utc::now(),
        };
        state.users.insert(created.id.0, created.clone());
        Ok(created)
    }
}

#[async_trait]
impl IdentityStore for InMemoryIdentityStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut state = self.state.lock().unwrap();
        Self::insert(&mut state, user)
    }

    async fn create_and_invite(
        &self,
        user: NewUser,
        invitation: &Invitation,
    ) -> Result<User, StoreError> {
        let mut state = self.state.lock().unwrap();
        let created = Self::insert(&mut state, user)?;
        state.invitations.insert(
            invitation.token_hash.clone(),
            (created.id, invitation.expires_at),
        );
        Ok(created)
    }

    async fn revert_create_and_invite(&self, id: &UserId) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        state.invitations.retain(|_, (user_id, _)| user_id != id);
        state.users.remove(&id.0);
        Ok(())
    }

    async fn activate(&self, token_hash: &TokenHash) -> Result<UserId, StoreError> {
        let mut state = self.state.lock().unwrap();
        let (user_id, expiry) = state
            .invitations
            .get(token_hash)
            .copied()
            .ok_or(StoreError::NotFound)?;
        if expiry <= Utc::now() {
            return Err(StoreError::NotFound);
        }

        let user = state.users.get_mut(&user_id.0).ok_or(StoreError::NotFound)?;
        user.is_active = true;
        state.invitations.retain(|_, (owner, _)| *owner != user_id);
        Ok(user_id)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        Ok(self.state.lock().unwrap().users.get(&id.0).cloned())
    }

    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<User>, StoreError> {
        Ok(self.user_by_email(email.as_str()))
    }
}

#[async_trait]
impl RoleRepository for InMemoryIdentityStore {
    async fn find_by_name(&self, name: RoleName) -> Result<Option<Role>, StoreError> {
        Ok(self.roles.get(&name).cloned())
    }
}

/// Map-backed cache that can be switched into an unavailable state.
#[derive(Default)]
pub struct FakeIdentityCache {
    entries: Mutex<HashMap<i64, User>>,
    unavailable: AtomicBool,
    reads: AtomicUsize,
}

impl FakeIdentityCache {
    pub fn unavailable() -> Self {
        let cache = Self::default();
        cache.unavailable.store(true, Ordering::SeqCst);
        cache
    }

    pub fn contains(&self, id: UserId) -> bool {
        self.entries.lock().unwrap().contains_key(&id.0)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityCache for FakeIdentityCache {
    async fn get(&self, id: &UserId) -> Result<Option<User>, CacheError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("connection refused".to_string()));
        }
        Ok(self.entries.lock().unwrap().get(&id.0).cloned())
    }

    async fn set(&self, user: &User) -> Result<(), CacheError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(CacheError::Unavailable("connection refused".to_string()));
        }
        self.entries.lock().unwrap().insert(user.id.0, user.clone());
        Ok(())
    }
}

/// Records delivered notifications. Can be told to fail every send, or to
/// never answer at all.
#[derive(Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<(Recipient, serde_json::Value)>>,
    failing: AtomicBool,
    stalled: AtomicBool,
    attempts: AtomicUsize,
}

impl RecordingGateway {
    pub fn failing() -> Self {
        let gateway = Self::default();
        gateway.failing.store(true, Ordering::SeqCst);
        gateway
    }

    pub fn stalled() -> Self {
        let gateway = Self::default();
        gateway.stalled.store(true, Ordering::SeqCst);
        gateway
    }

    pub fn sent(&self) -> Vec<(Recipient, serde_json::Value)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationGateway for RecordingGateway {
    async fn send(
        &self,
        template: MailTemplate,
        recipient: &Recipient,
        data: &serde_json::Value,
    ) -> Result<(), NotificationError> {
        assert_eq!(template, MailTemplate::UserInvitation);
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotificationError::Rejected {
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.clone(), data.clone()));
        Ok(())
    }
}

/// Collaborators a test can swap before the app starts.
pub struct TestAppOptions {
    pub store: InMemoryIdentityStore,
    pub cache: FakeIdentityCache,
    pub gateway: RecordingGateway,
    pub queue_capacity: usize,
}

impl Default for TestAppOptions {
    fn default() -> Self {
        Self {
            store: InMemoryIdentityStore::new(),
            cache: FakeIdentityCache::default(),
            gateway: RecordingGateway::default(),
            queue_capacity: 16,
        }
    }
}

/// Test application that spawns the real router over in-memory ports
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub store: Arc<InMemoryIdentityStore>,
    pub cache: Arc<FakeIdentityCache>,
    pub gateway: Arc<RecordingGateway>,
    pub delivery: Arc<DeliveryStats>,
    pub worker: Option<WorkerHandle>,
    pub authenticator: Arc<Authenticator>,
    pub api_client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(TestAppOptions::default()).await
    }

    /// Spawn the application in a background task and return TestApp
    pub async fn spawn_with(options: TestAppOptions) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let store = Arc::new(options.store);
        let cache = Arc::new(options.cache);
        let gateway = Arc::new(options.gateway);

        let worker = InvitationWorker::new(
            Arc::clone(&store),
            Arc::clone(&gateway),
            RetryPolicy::new(4, Duration::from_millis(1), Duration::from_millis(4)),
        );
        let delivery = worker.stats();
        let (invitations, worker) = worker.spawn(options.queue_capacity);

        let authenticator = Arc::new(Authenticator::new(
            JWT_SECRET,
            "social",
            "social",
            chrono::Duration::hours(168),
        ));

        let auth_service = Arc::new(
            AuthService::new(
                Arc::clone(&store),
                Arc::clone(&store),
                Arc::new(JwtTokenCodec::new(Arc::clone(&authenticator))),
                RegistrationValidator::new(),
                invitations,
                RegistrationSettings {
                    invitation_ttl: chrono::Duration::days(3),
                    frontend_url: FRONTEND_URL.to_string(),
                },
            )
            .with_password_hasher(
                PasswordHasher::with_params(1024, 1, 1).expect("Invalid Argon2 parameters"),
            ),
        );
        let user_service = Arc::new(IdentityResolver::new(
            Arc::clone(&store),
            Arc::clone(&cache),
            Duration::from_millis(200),
        ));
        let access_control = Arc::new(AccessPolicy::new(Arc::clone(&store)));

        let router = create_router(auth_service, user_service, access_control);

        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server error");
        });

        Self {
            address,
            port,
            store,
            cache,
            gateway,
            delivery,
            worker: Some(worker),
            authenticator,
            api_client: reqwest::Client::new(),
        }
    }

    /// Wait until every queued invitation has been delivered or compensated.
    pub async fn wait_for_deliveries(&self) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while self.delivery.pending() > 0 {
            assert!(
                tokio::time::Instant::now() < deadline,
                "invitation worker did not go idle"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> reqwest::Response {
        self.post("/v1/authentication/user")
            .json(&serde_json::json!({
                "username": username,
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn login(&self, email: &str, password: &str) -> reqwest::Response {
        self.post("/v1/authentication/token")
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Register and log in, returning the user id and bearer token.
    pub async fn registered_user(&self, username: &str, email: &str) -> (UserId, String) {
        let response = self.register(username, email, "password123").await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);

        let body: serde_json::Value = self
            .login(email, "password123")
            .await
            .json()
            .await
            .expect("Failed to parse response");
        let token = body["data"]["token"]
            .as_str()
            .expect("token missing")
            .to_string();
        let user = self.store.user_by_email(email).expect("user missing");

        (user.id, token)
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(&format!("{}{}", self.address, path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(&format!("{}{}", self.address, path))
    }

    /// Helper to make PUT request
    pub fn put(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.put(&format!("{}{}", self.address, path))
    }

    /// Helper to make GET request with Bearer token
    pub fn get_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.get(path).bearer_auth(token)
    }
}
