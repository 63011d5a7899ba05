//! Core types for the txguard pipeline
//!
//! Wire-facing types use camelCase JSON serialization; severities serialize
//! in upper case (`"CRITICAL"`) to match what alert consumers expect.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Body returned to the client whenever a database transaction fails
pub const TRANSACTION_FAILURE_BODY: &str =
    r#"{"status":"error","message":"Error interno en el sistema"}"#;

/// Alert severity, ordered from least to most urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    /// Upper-case name used in payloads and log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INFO" => Ok(Self::Info),
            "WARNING" | "WARN" => Ok(Self::Warning),
            "CRITICAL" => Ok(Self::Critical),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

/// The closed set of notification channel variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Email,
    Chat,
    Sms,
    Webhook,
}

impl ChannelKind {
    /// All variants in canonical routing order
    pub const ALL: [ChannelKind; 4] = [Self::Email, Self::Chat, Self::Sms, Self::Webhook];

    /// Channel name as reported in dispatch outcomes
    pub fn name(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Chat => "chat",
            Self::Sms => "sms",
            Self::Webhook => "webhook",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of failure recorded in a `FailureEvent`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Failure raised by the database transaction layer
    #[serde(rename = "DatabaseTransactionError")]
    DatabaseTransaction,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DatabaseTransaction => f.write_str("DatabaseTransactionError"),
        }
    }
}

/// Inbound request descriptor handed to the interceptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    pub method: String,
    pub path: String,
    pub client_addr: Option<SocketAddr>,
}

impl RequestInfo {
    /// Create a descriptor without a client address
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            client_addr: None,
        }
    }

    /// Attach the client address
    pub fn with_client_addr(mut self, addr: SocketAddr) -> Self {
        self.client_addr = Some(addr);
        self
    }
}

/// Framework-neutral response descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl Response {
    /// Create a response with an untyped body
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type: None,
            body: body.into(),
        }
    }

    /// Create an `application/json` response
    pub fn json(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type: Some("application/json".to_string()),
            body: body.into(),
        }
    }

    /// The fixed 500 response returned when a transaction fails
    pub fn transaction_failure() -> Self {
        Self::json(500, TRANSACTION_FAILURE_BODY)
    }
}

/// Immutable record of one detected failure
///
/// Built by the interceptor at the moment a database error is caught.
/// Fields are read-only once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureEvent {
    id: String,
    occurred_at: DateTime<Utc>,
    request_method: String,
    request_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_addr: Option<String>,
    error_kind: ErrorKind,
    error_detail: String,
    duration: Duration,
    severity: Severity,
}

impl FailureEvent {
    /// Record a database transaction failure for a request
    ///
    /// Severity is always `Critical` for this event source.
    pub fn transaction_failure(
        request: &RequestInfo,
        error_detail: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            id: format!("evt-{}", uuid::Uuid::new_v4()),
            occurred_at: Utc::now(),
            request_method: request.method.clone(),
            request_path: request.path.clone(),
            client_addr: request.client_addr.map(|addr| addr.to_string()),
            error_kind: ErrorKind::DatabaseTransaction,
            error_detail: error_detail.into(),
            duration,
            severity: Severity::Critical,
        }
    }

    /// Override the severity before the event is handed off
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn request_method(&self) -> &str {
        &self.request_method
    }

    pub fn request_path(&self) -> &str {
        &self.request_path
    }

    pub fn client_addr(&self) -> Option<&str> {
        self.client_addr.as_deref()
    }

    pub fn error_kind(&self) -> ErrorKind {
        self.error_kind
    }

    pub fn error_detail(&self) -> &str {
        &self.error_detail
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }
}

/// Channel-facing alert message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub subject: String,
    pub message: String,
    pub severity: Severity,
}

impl Alert {
    /// Create an alert
    pub fn new(subject: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            subject: subject.into(),
            message: message.into(),
            severity,
        }
    }
}

impl From<&FailureEvent> for Alert {
    fn from(event: &FailureEvent) -> Self {
        let subject = format!(
            "{} on {} {}",
            event.error_kind, event.request_method, event.request_path
        );
        let message = format!(
            "{} {} failed after {} ms: {} (event {}, at {})",
            event.request_method,
            event.request_path,
            event.duration.as_millis(),
            event.error_detail,
            event.id,
            event.occurred_at.to_rfc3339(),
        );
        Self::new(subject, message, event.severity)
    }
}

/// Successful delivery receipt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub channel: ChannelKind,

    /// Provider reference (SMTP reply code, message SID, HTTP status)
    pub reference: Option<String>,
}

impl Ack {
    /// Create an ack without a provider reference
    pub fn new(channel: ChannelKind) -> Self {
        Self {
            channel,
            reference: None,
        }
    }

    /// Attach a provider reference
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// Result of one delivery attempt on one channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub channel_name: String,
    pub succeeded: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchOutcome {
    /// Successful delivery
    pub fn success(channel: ChannelKind) -> Self {
        Self {
            channel_name: channel.name().to_string(),
            succeeded: true,
            error: None,
        }
    }

    /// Failed or skipped delivery
    pub fn failure(channel: ChannelKind, error: impl fmt::Display) -> Self {
        Self {
            channel_name: channel.name().to_string(),
            succeeded: false,
            error: Some(error.to_string()),
        }
    }
}
