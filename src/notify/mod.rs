//! Denied-access alerts
//!
//! The engine hands a [`DeniedAccessAlert`] to a [`NotificationSink`] from a
//! spawned task; nothing a sink does can change a decision already returned.

pub mod slack;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use slack::SlackNotifier;

/// An admin-only operation was refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeniedAccessAlert {
    /// Identity that was refused
    pub identity: String,
    pub operation: String,
    pub timestamp: DateTime<Utc>,
    /// Canonical IDs of the admins to alert
    pub recipients: Vec<String>,
}

impl DeniedAccessAlert {
    pub fn new(identity: &str, operation: &str, recipients: Vec<String>) -> Self {
        Self {
            identity: identity.to_string(),
            operation: operation.to_string(),
            timestamp: Utc::now(),
            recipients,
        }
    }

    /// Message body sent to each recipient
    pub fn message(&self, identity_label: &str) -> String {
        format!(
            "*Access Denied Alert*\n\n\
             User: @{} ({})\n\
             Attempted Operation: `{}`\n\
             Time: {}\n\n\
             This user attempted to perform an admin-only operation.",
            identity_label,
            self.identity,
            self.operation,
            self.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        )
    }
}

/// Best-effort delivery of denial alerts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify_denied(&self, alert: &DeniedAccessAlert) -> Result<()>;
}

/// Sink that only writes the alert to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn notify_denied(&self, alert: &DeniedAccessAlert) -> Result<()> {
        tracing::warn!(
            identity = %alert.identity,
            operation = %alert.operation,
            timestamp = %alert.timestamp.to_rfc3339(),
            recipients = ?alert.recipients,
            "Admin operation denied"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_message() {
        let alert = DeniedAccessAlert::new(
            "U0000000009",
            "drop_database",
            vec!["U0000000001".to_string()],
        );

        let message = alert.message("mallory");

        assert!(message.contains("User: @mallory (U0000000009)"));
        assert!(message.contains("`drop_database`"));
        assert!(message.contains("admin-only operation"));
    }

    #[tokio::test]
    async fn test_log_notifier_never_fails() {
        let alert = DeniedAccessAlert::new("U0000000009", "create_user", vec![]);
        assert!(LogNotifier.notify_denied(&alert).await.is_ok());
    }
}
