//! Error types for txguard
//!
//! Each component owns its error kind. Only database-layer failures ever
//! reach the interceptor's caller, and only as a generic response.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by a notification channel during one delivery attempt
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// Required configuration is absent; the channel skips delivery
    #[error("unconfigured")]
    Unconfigured,

    /// Connection, authentication, or provider rejection
    #[error("transport error: {0}")]
    Transport(String),

    /// The per-channel timeout elapsed before delivery finished
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

impl ChannelError {
    /// Shorthand for a transport failure
    pub fn transport(reason: impl std::fmt::Display) -> Self {
        Self::Transport(reason.to_string())
    }
}

/// Errors writing to or reading from the durable event table
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Underlying SQL driver failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Store-specific failure
    #[error("Store error: {0}")]
    Store(String),
}

/// Errors handing a failure event to the alert queue
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SubmitError {
    /// Queue is at capacity; the event was dropped
    #[error("alert queue is full")]
    QueueFull,

    /// The dispatch worker has shut down
    #[error("alert queue is closed")]
    QueueClosed,
}

/// Malformed configuration values
///
/// Missing values are never an error: they leave the channel unconfigured.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value was present but could not be parsed
    #[error("Invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },

    /// The shared HTTP client could not be built
    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

/// A failure originating in the database transaction layer
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct DatabaseError {
    message: String,
}

impl DatabaseError {
    /// Create a database error from its diagnostic text
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Diagnostic text (server-side only)
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error type for request handlers wrapped by the interceptor
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Database transaction failure; intercepted and replaced by a generic response
    #[error("Database transaction error: {0}")]
    Database(#[from] DatabaseError),

    /// Any other failure; propagated unchanged
    #[error("{0}")]
    Other(String),
}

impl HandlerError {
    /// Shorthand for a database transaction failure
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database(DatabaseError::new(message))
    }

    /// Shorthand for a non-database failure
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl From<sqlx::Error> for HandlerError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(DatabaseError::new(err.to_string()))
    }
}

/// Tells the interceptor whether an error comes from the database layer
///
/// Returns the server-side diagnostic text for database failures and
/// `None` for everything else, which the interceptor propagates untouched.
pub trait ClassifyFailure {
    /// Diagnostic detail if this is a database transaction failure
    fn database_failure(&self) -> Option<String>;
}

impl ClassifyFailure for HandlerError {
    fn database_failure(&self) -> Option<String> {
        match self {
            Self::Database(err) => Some(err.message().to_string()),
            Self::Other(_) => None,
        }
    }
}

impl ClassifyFailure for DatabaseError {
    fn database_failure(&self) -> Option<String> {
        Some(self.message.clone())
    }
}

impl ClassifyFailure for sqlx::Error {
    fn database_failure(&self) -> Option<String> {
        Some(self.to_string())
    }
}
