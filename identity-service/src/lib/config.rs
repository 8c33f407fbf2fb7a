use std::env;
use std::time::Duration;

use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub redis: RedisConfig,
    pub mail: MailConfig,
    pub frontend: FrontendConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub query_timeout_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
    pub shutdown_grace_seconds: u64,
}

#[derive(Deserialize, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: i64,
    pub issuer: String,
    pub audience: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
    pub enabled: bool,
    pub ttl_seconds: u64,
    pub timeout_millis: u64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MailProvider {
    Sendgrid,
    Log,
}

#[derive(Deserialize, Clone)]
pub struct MailConfig {
    pub provider: MailProvider,
    pub api_key: String,
    pub api_url: String,
    pub from_email: String,
    pub from_name: String,
    pub invitation_template_id: String,
    pub invitation_expiration_hours: i64,
    pub max_attempts: u32,
    pub backoff_base_millis: u64,
    pub backoff_max_millis: u64,
    pub queue_capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FrontendConfig {
    pub url: String,
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (DATABASE__URL, JWT__SECRET, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Example: MAIL__API_KEY=... overrides mail.api_key
            .add_source(Environment::with_prefix("").separator("__"))
            .build()?;

        let config: Config = configuration.try_deserialize()?;
        config.validate()?;

        Ok(config)
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.len() < 32 {
            return Err(ConfigError::Message(
                "jwt.secret must be at least 32 bytes".to_string(),
            ));
        }
        if self.jwt.expiration_hours <= 0 || self.mail.invitation_expiration_hours <= 0 {
            return Err(ConfigError::Message(
                "token and invitation lifetimes must be positive".to_string(),
            ));
        }
        if self.mail.provider == MailProvider::Sendgrid && self.mail.api_key.is_empty() {
            return Err(ConfigError::Message(
                "mail.api_key is required for the sendgrid provider".to_string(),
            ));
        }
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_seconds)
    }
}

impl ServerConfig {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_seconds)
    }
}

impl JwtConfig {
    pub fn lifetime(&self) -> chrono::Duration {
        chrono::Duration::hours(self.expiration_hours)
    }
}

impl RedisConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_millis)
    }
}

impl MailConfig {
    pub fn invitation_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.invitation_expiration_hours)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_millis)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_millis)
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("expiration_hours", &self.expiration_hours)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("from_email", &self.from_email)
            .field("invitation_template_id", &self.invitation_template_id)
            .field("max_attempts", &self.max_attempts)
            .field("queue_capacity", &self.queue_capacity)
            .finish()
    }
}
