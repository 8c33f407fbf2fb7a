use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::domain::auth::errors::NotificationError;
use crate::domain::auth::models::MailTemplate;
use crate::domain::auth::models::Recipient;
use crate::domain::auth::ports::NotificationGateway;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// SendGrid v3 `mail/send` with dynamic templates.
pub struct SendgridNotificationGateway {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    from: Recipient,
    invitation_template_id: String,
}

impl SendgridNotificationGateway {
    /// # Errors
    /// * `Transport` - HTTP client could not be built
    pub fn new(
        api_url: String,
        api_key: String,
        from: Recipient,
        invitation_template_id: String,
    ) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("identity-service/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_url,
            api_key,
            from,
            invitation_template_id,
        })
    }

    fn template_id(&self, template: MailTemplate) -> &str {
        match template {
            MailTemplate::UserInvitation => &self.invitation_template_id,
        }
    }

    fn message(
        &self,
        template: MailTemplate,
        recipient: &Recipient,
        data: &serde_json::Value,
    ) -> serde_json::Value {
        json!({
            "personalizations": [{
                "to": [{ "email": recipient.email, "name": recipient.name }],
                "dynamic_template_data": data,
            }],
            "from": { "email": self.from.email, "name": self.from.name },
            "template_id": self.template_id(template),
        })
    }
}

#[async_trait]
impl NotificationGateway for SendgridNotificationGateway {
    async fn send(
        &self,
        template: MailTemplate,
        recipient: &Recipient,
        data: &serde_json::Value,
    ) -> Result<(), NotificationError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&self.message(template, recipient, data))
            .send()
            .await
            .map_err(|e| NotificationError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(status = status.as_u16(), template = template.as_str(), "Mail accepted");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(NotificationError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
