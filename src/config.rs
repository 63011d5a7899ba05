//! Configuration for channels, dispatch, the event log, and logging
//!
//! Resolved once at process start and passed by reference afterwards.
//! A missing or empty value leaves the owning channel unconfigured; only
//! malformed values (e.g. a non-numeric port) are errors.

use crate::error::ConfigError;
use crate::logging::LogFormat;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default SMTP submission port (STARTTLS)
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Default Twilio REST API base URL
pub const DEFAULT_TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardConfig {
    #[serde(default)]
    pub channels: ChannelConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub event_log: EventLogConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GuardConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let email = match (
            get("SMTP_SERVER"),
            get("SMTP_USER"),
            get("SMTP_PASSWORD"),
            get("SMTP_RECEIVER"),
        ) {
            (Some(host), Some(username), Some(password), Some(recipient)) => Some(EmailConfig {
                host,
                port: parse_or(&get, "SMTP_PORT", DEFAULT_SMTP_PORT)?,
                username,
                password,
                recipient,
            }),
            _ => None,
        };

        let chat = get("SLACK_WEBHOOK_URL").map(|webhook_url| ChatConfig { webhook_url });

        let sms = match (
            get("TWILIO_ACCOUNT_SID"),
            get("TWILIO_AUTH_TOKEN"),
            get("TWILIO_PHONE_NUMBER"),
            get("ALERT_PHONE_NUMBER"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number), Some(to_number)) => {
                Some(SmsConfig {
                    account_sid,
                    auth_token,
                    from_number,
                    to_number,
                    api_base: get("TWILIO_API_BASE")
                        .unwrap_or_else(|| DEFAULT_TWILIO_API_BASE.to_string()),
                })
            }
            _ => None,
        };

        let webhook = get("WEBHOOK_URL").map(|url| WebhookConfig { url });

        let dispatch = DispatchConfig {
            channel_timeout_secs: parse_positive(
                &get,
                "TXGUARD_CHANNEL_TIMEOUT_SECS",
                default_channel_timeout_secs(),
            )?,
            queue_capacity: parse_positive(
                &get,
                "TXGUARD_QUEUE_CAPACITY",
                default_queue_capacity(),
            )?,
        };

        let event_log = EventLogConfig {
            capacity: parse_positive(&get, "TXGUARD_EVENT_LOG_CAPACITY", default_log_capacity())?,
            database_url: get("TXGUARD_EVENT_DATABASE_URL"),
            persist_completed: parse_or(&get, "TXGUARD_PERSIST_COMPLETED", false)?,
        };

        let logging = LoggingConfig {
            format: parse_or(&get, "TXGUARD_LOG_FORMAT", LogFormat::default())?,
            level: get("TXGUARD_LOG_LEVEL").unwrap_or_else(default_log_level),
        };

        Ok(Self {
            channels: ChannelConfig {
                email,
                chat,
                sms,
                webhook,
            },
            dispatch,
            event_log,
            logging,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key: key.to_string(),
            value,
            reason: e.to_string(),
        }),
    }
}

/// Like `parse_or`, but zero is rejected
fn parse_positive<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Default + PartialEq,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    let parsed = parse_or(get, key, default)?;
    if parsed == T::default() {
        return Err(ConfigError::Invalid {
            key: key.to_string(),
            value: get(key).unwrap_or_default(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(parsed)
}

/// Per-channel static configuration; `None` marks a channel unconfigured
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat: Option<ChatConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sms: Option<SmsConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<WebhookConfig>,
}

/// SMTP relay settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailConfig {
    pub host: String,

    #[serde(default = "default_smtp_port")]
    pub port: u16,

    /// Login user, also used as the sender address
    pub username: String,

    pub password: String,

    /// Fixed alert recipient
    pub recipient: String,
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("recipient", &self.recipient)
            .finish()
    }
}

/// Chat incoming-webhook settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatConfig {
    pub webhook_url: String,
}

/// SMS provider settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmsConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    pub to_number: String,

    #[serde(default = "default_twilio_api_base")]
    pub api_base: String,
}

impl fmt::Debug for SmsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmsConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[REDACTED]")
            .field("from_number", &self.from_number)
            .field("to_number", &self.to_number)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Generic webhook settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfig {
    pub url: String,
}

/// Alert dispatch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchConfig {
    /// Upper bound for a single channel call
    #[serde(default = "default_channel_timeout_secs")]
    pub channel_timeout_secs: u64,

    /// Pending events the alert queue holds before rejecting submissions
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl DispatchConfig {
    /// Per-channel timeout, never shorter than one second
    pub fn channel_timeout(&self) -> Duration {
        Duration::from_secs(self.channel_timeout_secs.max(1))
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            channel_timeout_secs: default_channel_timeout_secs(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Structured event log settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventLogConfig {
    /// Entries kept in memory for local diagnostics
    #[serde(default = "default_log_capacity")]
    pub capacity: usize,

    /// SQLite URL for the durable event table (no persistence if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    /// Persist successful requests too, not only failures
    #[serde(default)]
    pub persist_completed: bool,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        Self {
            capacity: default_log_capacity(),
            database_url: None,
            persist_completed: false,
        }
    }
}

/// Tracing subscriber settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,

    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: default_log_level(),
        }
    }
}

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

fn default_twilio_api_base() -> String {
    DEFAULT_TWILIO_API_BASE.to_string()
}

fn default_channel_timeout_secs() -> u64 {
    10
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_log_capacity() -> usize {
    10_000
}

fn default_log_level() -> String {
    "info".to_string()
}
