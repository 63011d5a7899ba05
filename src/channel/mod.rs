//! Notification channels: the outbound transports alerts are delivered over
//!
//! Every transport (email, chat, SMS, webhook) implements
//! `NotificationChannel`, so the dispatcher treats them uniformly.
//! Channels attempt delivery once and never retry.

use crate::error::ChannelError;
use crate::types::{Ack, Alert, ChannelKind};
use async_trait::async_trait;

pub mod chat;
pub mod email;
pub mod memory;
pub mod sms;
pub mod webhook;

pub use chat::ChatChannel;
pub use email::EmailChannel;
pub use memory::{CallLog, MemoryChannel};
pub use sms::SmsChannel;
pub use webhook::WebhookChannel;

/// Core trait for notification transports
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Which variant this channel is
    fn kind(&self) -> ChannelKind;

    /// Whether the required configuration is present
    ///
    /// The dispatcher skips unconfigured channels without calling `deliver`.
    fn is_configured(&self) -> bool;

    /// Deliver one alert
    async fn deliver(&self, alert: &Alert) -> Result<Ack, ChannelError>;

    /// Channel name (e.g., "email", "chat")
    fn name(&self) -> &'static str {
        self.kind().name()
    }
}

/// POST a JSON payload and require a 2xx answer
pub(crate) async fn post_json(
    client: &reqwest::Client,
    url: &str,
    payload: &serde_json::Value,
) -> Result<reqwest::StatusCode, ChannelError> {
    let response = client
        .post(url)
        .json(payload)
        .send()
        .await
        .map_err(ChannelError::transport)?;

    let response = require_success(response).await?;
    Ok(response.status())
}

/// Map a non-2xx response to a transport error carrying the status and body
pub(crate) async fn require_success(
    response: reqwest::Response,
) -> Result<reqwest::Response, ChannelError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ChannelError::Transport(format!(
        "endpoint returned {}: {}",
        status,
        body.trim()
    )))
}
