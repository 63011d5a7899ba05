//! Alert dispatcher: severity routing and best-effort fan-out
//!
//! `AlertDispatcher` resolves the channel set for an alert's severity,
//! starts every channel in routing order, bounds each with its own timeout,
//! and collects one `DispatchOutcome` per channel. A failing, slow, or
//! unconfigured channel never affects its siblings or the caller.

use crate::channel::{ChatChannel, EmailChannel, NotificationChannel, SmsChannel, WebhookChannel};
use crate::config::GuardConfig;
use crate::error::{ChannelError, ConfigError};
use crate::types::{Alert, ChannelKind, DispatchOutcome, FailureEvent, Severity};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Severity → ordered channel set
///
/// The webhook channel is appended to every resolved set if absent, so
/// every alert reaches it exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingTable {
    routes: HashMap<Severity, Vec<ChannelKind>>,
}

impl Default for RoutingTable {
    fn default() -> Self {
        let mut routes = HashMap::new();
        routes.insert(
            Severity::Critical,
            vec![
                ChannelKind::Email,
                ChannelKind::Chat,
                ChannelKind::Sms,
                ChannelKind::Webhook,
            ],
        );
        routes.insert(
            Severity::Warning,
            vec![ChannelKind::Email, ChannelKind::Chat, ChannelKind::Webhook],
        );
        routes.insert(Severity::Info, vec![ChannelKind::Chat, ChannelKind::Webhook]);
        Self { routes }
    }
}

impl RoutingTable {
    /// Replace the channel set for one severity
    pub fn with_route(mut self, severity: Severity, channels: Vec<ChannelKind>) -> Self {
        self.routes.insert(severity, channels);
        self
    }

    /// Ordered, duplicate-free channel set for a severity, webhook included
    pub fn resolve(&self, severity: Severity) -> Vec<ChannelKind> {
        let mut resolved: Vec<ChannelKind> = Vec::new();
        for kind in self.routes.get(&severity).into_iter().flatten() {
            if !resolved.contains(kind) {
                resolved.push(*kind);
            }
        }
        if !resolved.contains(&ChannelKind::Webhook) {
            resolved.push(ChannelKind::Webhook);
        }
        resolved
    }
}

/// Fans alerts out to notification channels by severity
pub struct AlertDispatcher {
    channels: HashMap<ChannelKind, Arc<dyn NotificationChannel>>,
    routing: RoutingTable,
    channel_timeout: Duration,
}

impl AlertDispatcher {
    /// Create a dispatcher with no channels and the default routing table
    pub fn new(channel_timeout: Duration) -> Self {
        Self {
            channels: HashMap::new(),
            routing: RoutingTable::default(),
            channel_timeout,
        }
    }

    /// Build the four production channels from configuration
    ///
    /// Absent sections produce unconfigured channels, not errors.
    pub fn from_config(config: &GuardConfig) -> Result<Self, ConfigError> {
        let timeout = config.dispatch.channel_timeout();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        let channels = &config.channels;
        let dispatcher = Self::new(timeout)
            .with_channel(Arc::new(EmailChannel::new(channels.email.clone(), timeout)))
            .with_channel(Arc::new(ChatChannel::new(
                channels.chat.clone(),
                client.clone(),
            )))
            .with_channel(Arc::new(SmsChannel::new(channels.sms.clone(), client.clone())))
            .with_channel(Arc::new(WebhookChannel::new(
                channels.webhook.clone(),
                client,
            )));

        let configured: Vec<&str> = ChannelKind::ALL
            .iter()
            .filter(|kind| dispatcher.is_configured(**kind))
            .map(|kind| kind.name())
            .collect();
        tracing::info!(
            configured = ?configured,
            timeout_secs = timeout.as_secs(),
            "Alert dispatcher initialized"
        );

        Ok(dispatcher)
    }

    /// Register a channel, replacing any existing channel of the same kind
    pub fn with_channel(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.channels.insert(channel.kind(), channel);
        self
    }

    /// Replace the routing table
    pub fn with_routing(mut self, routing: RoutingTable) -> Self {
        self.routing = routing;
        self
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    pub fn channel_timeout(&self) -> Duration {
        self.channel_timeout
    }

    /// Whether a channel of this kind is registered and configured
    pub fn is_configured(&self, kind: ChannelKind) -> bool {
        self.channels
            .get(&kind)
            .map(|c| c.is_configured())
            .unwrap_or(false)
    }

    /// Dispatch a failure event
    pub async fn dispatch(&self, event: &FailureEvent) -> Vec<DispatchOutcome> {
        tracing::info!(
            event_id = %event.id(),
            severity = %event.severity(),
            method = %event.request_method(),
            path = %event.request_path(),
            "Dispatching failure alert"
        );
        self.dispatch_alert(&Alert::from(event)).await
    }

    /// Dispatch an arbitrary alert through the same routing
    ///
    /// Channels are started in routing order and run concurrently; the
    /// returned outcomes are in routing order too. Never fails.
    pub async fn dispatch_alert(&self, alert: &Alert) -> Vec<DispatchOutcome> {
        let route = self.routing.resolve(alert.severity);

        let attempts = route.iter().map(|kind| self.attempt(*kind, alert));
        let outcomes = futures::future::join_all(attempts).await;

        let succeeded = outcomes.iter().filter(|o| o.succeeded).count();
        tracing::info!(
            severity = %alert.severity,
            subject = %alert.subject,
            attempted = outcomes.len(),
            succeeded,
            failed = outcomes.len() - succeeded,
            "Alert dispatch finished"
        );

        outcomes
    }

    async fn attempt(&self, kind: ChannelKind, alert: &Alert) -> DispatchOutcome {
        let channel = match self.channels.get(&kind) {
            Some(channel) if channel.is_configured() => channel,
            _ => {
                tracing::warn!(channel = %kind, "Channel not configured, skipping");
                return DispatchOutcome::failure(kind, ChannelError::Unconfigured);
            }
        };

        let result = match tokio::time::timeout(self.channel_timeout, channel.deliver(alert)).await
        {
            Ok(result) => result,
            Err(_) => Err(ChannelError::Timeout(self.channel_timeout)),
        };

        match result {
            Ok(ack) => {
                tracing::info!(
                    channel = %kind,
                    reference = ?ack.reference,
                    "Alert delivered"
                );
                DispatchOutcome::success(kind)
            }
            Err(e) => {
                tracing::error!(channel = %kind, error = %e, "Alert delivery failed");
                DispatchOutcome::failure(kind, e)
            }
        }
    }
}
