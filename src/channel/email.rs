//! Email channel over an authenticated STARTTLS SMTP relay

use super::NotificationChannel;
use crate::config::EmailConfig;
use crate::error::ChannelError;
use crate::types::{Ack, Alert, ChannelKind};
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

/// Sends one plain-text message per alert to a fixed recipient
pub struct EmailChannel {
    config: Option<EmailConfig>,
    timeout: Duration,
}

impl EmailChannel {
    /// Create an email channel; `None` leaves it unconfigured
    ///
    /// `timeout` bounds each SMTP command, including the connect.
    pub fn new(config: Option<EmailConfig>, timeout: Duration) -> Self {
        Self { config, timeout }
    }

    /// Build the message for an alert, sent from the login user
    pub fn build_message(config: &EmailConfig, alert: &Alert) -> Result<Message, ChannelError> {
        let from: Mailbox = config
            .username
            .parse()
            .map_err(|e| ChannelError::Transport(format!("invalid sender address: {}", e)))?;
        let to: Mailbox = config
            .recipient
            .parse()
            .map_err(|e| ChannelError::Transport(format!("invalid recipient address: {}", e)))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(alert.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(alert.message.clone())
            .map_err(ChannelError::transport)
    }

    fn transport(
        &self,
        config: &EmailConfig,
    ) -> Result<AsyncSmtpTransport<Tokio1Executor>, ChannelError> {
        let builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(ChannelError::transport)?;

        Ok(builder
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .timeout(Some(self.timeout))
            .build())
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    fn is_configured(&self) -> bool {
        self.config.is_some()
    }

    async fn deliver(&self, alert: &Alert) -> Result<Ack, ChannelError> {
        let config = self.config.as_ref().ok_or(ChannelError::Unconfigured)?;

        let message = Self::build_message(config, alert)?;
        let response = self
            .transport(config)?
            .send(message)
            .await
            .map_err(ChannelError::transport)?;

        tracing::debug!(
            channel = "email",
            recipient = %config.recipient,
            code = %response.code(),
            "Email alert sent"
        );
        Ok(Ack::new(ChannelKind::Email).with_reference(response.code().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;

    fn config(host: &str, port: u16) -> EmailConfig {
        EmailConfig {
            host: host.to_string(),
            port,
            username: "monitoring@example.com".to_string(),
            password: "secret".to_string(),
            recipient: "alerts@example.com".to_string(),
        }
    }

    #[test]
    fn test_build_message_headers() {
        let alert = Alert::new("Database down", "connection lost", Severity::Critical);
        let message = EmailChannel::build_message(&config("smtp.example.com", 587), &alert).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("From: monitoring@example.com"));
        assert!(raw.contains("To: alerts@example.com"));
        assert!(raw.contains("Subject: Database down"));
        assert!(raw.contains("connection lost"));
    }

    #[test]
    fn test_invalid_recipient_is_transport_error() {
        let mut bad = config("smtp.example.com", 587);
        bad.recipient = "not an address".to_string();
        let alert = Alert::new("s", "m", Severity::Warning);

        let err = EmailChannel::build_message(&bad, &alert).unwrap_err();
        assert!(matches!(err, ChannelError::Transport(ref msg) if msg.contains("recipient")));
    }

    #[tokio::test]
    async fn test_unconfigured() {
        let channel = EmailChannel::new(None, Duration::from_secs(1));
        assert!(!channel.is_configured());
        let alert = Alert::new("s", "m", Severity::Critical);
        assert_eq!(channel.deliver(&alert).await, Err(ChannelError::Unconfigured));
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let channel = EmailChannel::new(Some(config("127.0.0.1", 1)), Duration::from_secs(2));
        let alert = Alert::new("s", "m", Severity::Critical);
        assert!(matches!(
            channel.deliver(&alert).await,
            Err(ChannelError::Transport(_))
        ));
    }
}
