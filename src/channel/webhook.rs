//! Generic webhook channel

use super::{post_json, NotificationChannel};
use crate::config::WebhookConfig;
use crate::error::ChannelError;
use crate::types::{Ack, Alert, ChannelKind};
use async_trait::async_trait;

/// Posts `{"subject", "message", "severity"}` to a configured endpoint
pub struct WebhookChannel {
    config: Option<WebhookConfig>,
    client: reqwest::Client,
}

impl WebhookChannel {
    /// Create a webhook channel; `None` leaves it unconfigured
    pub fn new(config: Option<WebhookConfig>, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// JSON body posted for an alert
    pub fn payload(alert: &Alert) -> serde_json::Value {
        serde_json::json!({
            "subject": alert.subject,
            "message": alert.message,
            "severity": alert.severity,
        })
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Webhook
    }

    fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    async fn deliver(&self, alert: &Alert) -> Result<Ack, ChannelError> {
        let config = self.config.as_ref().ok_or(ChannelError::Unconfigured)?;

        let status = post_json(&self.client, &config.url, &Self::payload(alert)).await?;

        tracing::debug!(channel = "webhook", status = %status, "Webhook alert sent");
        Ok(Ack::new(ChannelKind::Webhook).with_reference(status.as_u16().to_string()))
    }
}
