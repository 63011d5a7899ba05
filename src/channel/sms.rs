//! SMS channel backed by the Twilio Messages REST API

use super::{require_success, NotificationChannel};
use crate::config::SmsConfig;
use crate::error::ChannelError;
use crate::types::{Ack, Alert, ChannelKind};
use async_trait::async_trait;
use serde::Deserialize;

/// Sends one SMS from a fixed sender to a fixed recipient
pub struct SmsChannel {
    config: Option<SmsConfig>,
    client: reqwest::Client,
}

/// Subset of the provider's message resource we read back
#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: Option<String>,
}

impl SmsChannel {
    /// Create an SMS channel; `None` leaves it unconfigured
    pub fn new(config: Option<SmsConfig>, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn messages_url(config: &SmsConfig) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            config.api_base.trim_end_matches('/'),
            config.account_sid
        )
    }

    fn form_body(config: &SmsConfig, text: &str) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair("To", &config.to_number)
            .append_pair("From", &config.from_number)
            .append_pair("Body", text)
            .finish()
    }
}

#[async_trait]
impl NotificationChannel for SmsChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    async fn deliver(&self, alert: &Alert) -> Result<Ack, ChannelError> {
        let config = self.config.as_ref().ok_or(ChannelError::Unconfigured)?;

        let response = self
            .client
            .post(Self::messages_url(config))
            .basic_auth(&config.account_sid, Some(&config.auth_token))
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(Self::form_body(config, &alert.message))
            .send()
            .await
            .map_err(ChannelError::transport)?;

        let response = require_success(response).await?;

        let ack = Ack::new(ChannelKind::Sms);
        let ack = match response.json::<MessageResource>().await {
            Ok(MessageResource { sid: Some(sid) }) => ack.with_reference(sid),
            _ => ack,
        };

        tracing::debug!(channel = "sms", to = %config.to_number, "SMS alert sent");
        Ok(ack)
    }
}
