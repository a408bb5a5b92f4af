//! Slack direct-message notifier

use super::{DeniedAccessAlert, NotificationSink};
use crate::error::{AppError, Result};
use crate::slack::SlackClient;
use async_trait::async_trait;

/// Sends each denial alert as a direct message to every recipient
pub struct SlackNotifier {
    client: SlackClient,
}

impl SlackNotifier {
    pub fn new(client: SlackClient) -> Self {
        Self { client }
    }

    /// Handle of the denied identity for the message, or the raw ID
    async fn identity_label(&self, identity: &str) -> String {
        match self.client.users_info(identity).await {
            Ok(Some(user)) if !user.name.is_empty() => user.name,
            Ok(_) => identity.to_string(),
            Err(e) => {
                tracing::debug!(identity, error = %e, "Could not look up denied identity");
                identity.to_string()
            }
        }
    }
}

#[async_trait]
impl NotificationSink for SlackNotifier {
    async fn notify_denied(&self, alert: &DeniedAccessAlert) -> Result<()> {
        let text = alert.message(&self.identity_label(&alert.identity).await);

        let mut failed = Vec::new();
        for recipient in &alert.recipients {
            if let Err(e) = self.client.chat_post_message(recipient, &text).await {
                tracing::error!(recipient = %recipient, error = %e, "Failed to notify admin");
                failed.push(recipient.as_str());
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(AppError::Notification(format!(
                "{} of {} recipients not notified: {}",
                failed.len(),
                alert.recipients.len(),
                failed.join(", ")
            )))
        }
    }
}
