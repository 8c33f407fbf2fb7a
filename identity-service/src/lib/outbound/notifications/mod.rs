use async_trait::async_trait;

use crate::domain::auth::errors::NotificationError;
use crate::domain::auth::models::MailTemplate;
use crate::domain::auth::models::Recipient;
use crate::domain::auth::ports::NotificationGateway;

pub mod log;
pub mod sendgrid;

pub use self::log::LogNotificationGateway;
pub use sendgrid::SendgridNotificationGateway;

/// Notification gateway chosen at startup.
pub enum NotificationBackend {
    Sendgrid(SendgridNotificationGateway),
    Log(LogNotificationGateway),
}

#[async_trait]
impl NotificationGateway for NotificationBackend {
    async fn send(
        &self,
        template: MailTemplate,
        recipient: &Recipient,
        data: &serde_json::Value,
    ) -> Result<(), NotificationError> {
        match self {
            NotificationBackend::Sendgrid(gateway) => gateway.send(template, recipient, data).await,
            NotificationBackend::Log(gateway) => gateway.send(template, recipient, data).await,
        }
    }
}
