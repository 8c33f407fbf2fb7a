mod shutdown;

use std::sync::Arc;

use auth::Authenticator;
use identity_service::config::Config;
use identity_service::config::MailConfig;
use identity_service::config::MailProvider;
use identity_service::config::RedisConfig;
use identity_service::domain::auth::delivery::InvitationWorker;
use identity_service::domain::auth::delivery::RetryPolicy;
use identity_service::domain::auth::models::Recipient;
use identity_service::domain::auth::service::AuthService;
use identity_service::domain::auth::service::RegistrationSettings;
use identity_service::domain::auth::token::JwtTokenCodec;
use identity_service::domain::auth::validation::RegistrationValidator;
use identity_service::domain::role::service::AccessPolicy;
use identity_service::domain::user::service::IdentityResolver;
use identity_service::inbound::http::router::create_router;
use identity_service::outbound::cache::DisabledIdentityCache;
use identity_service::outbound::cache::IdentityCacheBackend;
use identity_service::outbound::cache::RedisIdentityCache;
use identity_service::outbound::notifications::LogNotificationGateway;
use identity_service::outbound::notifications::NotificationBackend;
use identity_service::outbound::notifications::SendgridNotificationGateway;
use identity_service::outbound::repositories::PostgresIdentityStore;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::shutdown::shutdown_signal;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "identity_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "identity-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        redis_enabled = config.redis.enabled,
        mail_provider = ?config.mail.provider,
        jwt = ?config.jwt,
        "Configuration loaded"
    );

    let pg_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.query_timeout())
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = config.database.max_connections,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;
    tracing::info!(database = "postgresql", "Database migrations completed");

    let store = Arc::new(PostgresIdentityStore::new(
        pg_pool,
        config.database.query_timeout(),
    ));
    let cache = Arc::new(build_cache(&config.redis).await);
    let gateway = Arc::new(build_gateway(&config.mail)?);

    let worker = InvitationWorker::new(
        Arc::clone(&store),
        gateway,
        RetryPolicy::new(
            config.mail.max_attempts,
            config.mail.backoff_base(),
            config.mail.backoff_max(),
        ),
    );
    let (invitations, worker_handle) = worker.spawn(config.mail.queue_capacity);
    tracing::info!(
        queue_capacity = config.mail.queue_capacity,
        max_attempts = config.mail.max_attempts,
        "Invitation worker spawned"
    );

    let authenticator = Arc::new(Authenticator::new(
        config.jwt.secret.as_bytes(),
        &config.jwt.issuer,
        &config.jwt.audience,
        config.jwt.lifetime(),
    ));

    let auth_service = Arc::new(AuthService::new(
        Arc::clone(&store),
        Arc::clone(&store),
        Arc::new(JwtTokenCodec::new(authenticator)),
        RegistrationValidator::new(),
        invitations,
        RegistrationSettings {
            invitation_ttl: config.mail.invitation_ttl(),
            frontend_url: config.frontend.url.clone(),
        },
    ));
    let user_service = Arc::new(IdentityResolver::new(
        Arc::clone(&store),
        cache,
        config.redis.timeout(),
    ));
    let access_control = Arc::new(AccessPolicy::new(Arc::clone(&store)));

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let http_application = create_router(auth_service, user_service, access_control);
    axum::serve(http_listener, http_application)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Http server stopped, draining invitation worker");

    let grace = config.server.shutdown_grace();
    let drained = worker_handle.shutdown(grace).await;
    tracing::info!(drained, "Service stopped");

    Ok(())
}

async fn build_cache(config: &RedisConfig) -> IdentityCacheBackend {
    if !config.enabled {
        tracing::info!("Identity cache disabled");
        return IdentityCacheBackend::Disabled(DisabledIdentityCache);
    }

    match RedisIdentityCache::connect(&config.url, config.ttl()).await {
        Ok(cache) => {
            tracing::info!(ttl_seconds = config.ttl_seconds, "Redis identity cache connected");
            IdentityCacheBackend::Redis(cache)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Redis unavailable, running without identity cache");
            IdentityCacheBackend::Disabled(DisabledIdentityCache)
        }
    }
}

fn build_gateway(config: &MailConfig) -> Result<NotificationBackend, anyhow::Error> {
    match config.provider {
        MailProvider::Log => Ok(NotificationBackend::Log(LogNotificationGateway)),
        MailProvider::Sendgrid => Ok(NotificationBackend::Sendgrid(
            SendgridNotificationGateway::new(
                config.api_url.clone(),
                config.api_key.clone(),
                Recipient {
                    name: config.from_name.clone(),
                    email: config.from_email.clone(),
                },
                config.invitation_template_id.clone(),
            )?,
        )),
    }
}
