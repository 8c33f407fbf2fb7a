use async_trait::async_trait;

use crate::domain::auth::errors::NotificationError;
use crate::domain::auth::models::MailTemplate;
use crate::domain::auth::models::Recipient;
use crate::domain::auth::ports::NotificationGateway;

/// Local development gateway: logs the message and reports success.
///
/// Template data can carry activation links, so only its field names are
/// logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotificationGateway;

#[async_trait]
impl NotificationGateway for LogNotificationGateway {
    async fn send(
        &self,
        template: MailTemplate,
        recipient: &Recipient,
        data: &serde_json::Value,
    ) -> Result<(), NotificationError> {
        let fields: Vec<&str> = data
            .as_object()
            .map(|object| object.keys().map(String::as_str).collect())
            .unwrap_or_default();

        tracing::info!(
            template = template.as_str(),
            to_name = %recipient.name,
            to_email = %recipient.email,
            fields = ?fields,
            "Notification send stub"
        );
        Ok(())
    }
}
