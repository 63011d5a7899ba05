//! # txguard
//!
//! Database transaction failure interception and multi-channel alerting
//! for HTTP services.
//!
//! ## Overview
//!
//! `txguard` wraps request handlers in a failure boundary. When a handler
//! fails in the database transaction layer, the client gets a fixed generic
//! 500 response, a structured error entry is logged, and an alert is fanned
//! out to email, chat, SMS and webhook channels in the background. Alert
//! delivery never delays the response.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use txguard::channel::MemoryChannel;
//! use txguard::{
//!     AlertDispatcher, AlertQueue, ChannelKind, EventLog, HandlerError, RequestInfo, Response,
//!     TransactionInterceptor,
//! };
//!
//! # async fn example() {
//! // Route alerts to an in-memory webhook
//! let dispatcher = AlertDispatcher::new(Duration::from_secs(10))
//!     .with_channel(Arc::new(MemoryChannel::new(ChannelKind::Webhook)));
//! let (queue, _worker) = AlertQueue::start(Arc::new(dispatcher), 1024);
//!
//! let interceptor = TransactionInterceptor::new(Arc::new(queue), Arc::new(EventLog::default()));
//!
//! // A database failure becomes the generic 500 response
//! let request = RequestInfo::new("POST", "/orders");
//! let response = interceptor
//!     .handle(&request, async {
//!         Err::<Response, _>(HandlerError::database("connection lost"))
//!     })
//!     .await;
//! assert_eq!(response.unwrap().status, 500);
//! # }
//! ```
//!
//! ## Channels
//!
//! - **email** - SMTP with STARTTLS
//! - **chat** - incoming-webhook chat messages
//! - **sms** - Twilio-compatible messaging API
//! - **webhook** - JSON POST to a generic endpoint
//! - **memory** - in-memory channel for testing
//!
//! ## Architecture
//!
//! - **TransactionInterceptor** - failure boundary around request handlers
//! - **AlertQueue** - bounded, non-blocking hand-off to the dispatcher
//! - **AlertDispatcher** - severity routing and concurrent channel fan-out
//! - **NotificationChannel** trait - one delivery attempt per alert
//! - **EventLog** / **EventStore** - structured request log and durable event table

pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event_log;
#[cfg(feature = "axum")]
pub mod http;
pub mod interceptor;
pub mod logging;
pub mod queue;
pub mod store;
pub mod types;

// Re-export core types
pub use channel::NotificationChannel;
pub use config::GuardConfig;
pub use dispatcher::{AlertDispatcher, RoutingTable};
pub use error::{
    ChannelError, ClassifyFailure, ConfigError, DatabaseError, HandlerError, PersistenceError,
    SubmitError,
};
pub use event_log::{EventLog, RequestLogEntry};
pub use interceptor::{InterceptedResponse, TransactionInterceptor};
pub use logging::{init_tracing, LogFormat};
pub use queue::{AlertQueue, AlertSink};
pub use store::{EventRecord, EventStore, MemoryEventStore, SqliteEventStore};
pub use types::{
    Ack, Alert, ChannelKind, DispatchOutcome, ErrorKind, FailureEvent, RequestInfo, Response,
    Severity, TRANSACTION_FAILURE_BODY,
};
