//! Chat channel (Slack-compatible incoming webhook)

use super::{post_json, NotificationChannel};
use crate::config::ChatConfig;
use crate::error::ChannelError;
use crate::types::{Ack, Alert, ChannelKind};
use async_trait::async_trait;

/// Posts `{"text": ...}` to a chat incoming webhook
pub struct ChatChannel {
    config: Option<ChatConfig>,
    client: reqwest::Client,
}

impl ChatChannel {
    /// Create a chat channel; `None` leaves it unconfigured
    pub fn new(config: Option<ChatConfig>, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Chat text, prefixed with the severity (e.g. `*CRITICAL ALERT*: ...`)
    pub fn format_text(alert: &Alert) -> String {
        format!("*{} ALERT*: {}", alert.severity, alert.message)
    }
}

#[async_trait]
impl NotificationChannel for ChatChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Chat
    }

    fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    async fn deliver(&self, alert: &Alert) -> Result<Ack, ChannelError> {
        let config = self.config.as_ref().ok_or(ChannelError::Unconfigured)?;

        let payload = serde_json::json!({ "text": Self::format_text(alert) });
        let status = post_json(&self.client, &config.webhook_url, &payload).await?;

        tracing::debug!(channel = "chat", status = %status, "Chat alert sent");
        Ok(Ack::new(ChannelKind::Chat).with_reference(status.as_u16().to_string()))
    }
}
