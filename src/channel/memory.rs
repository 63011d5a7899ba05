//! In-memory channel for development and testing
//!
//! Records every alert it is asked to deliver and can be told to fail,
//! stall, or report itself unconfigured.

use super::NotificationChannel;
use crate::error::ChannelError;
use crate::types::{Ack, Alert, ChannelKind};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared record of channel invocations, in the order they started
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<ChannelKind>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, kind: ChannelKind) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(kind);
        }
    }

    /// Snapshot of the invocation order
    pub fn calls(&self) -> Vec<ChannelKind> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

/// In-memory notification channel
pub struct MemoryChannel {
    kind: ChannelKind,
    configured: bool,
    failure: Option<String>,
    delay: Option<Duration>,
    received: Mutex<Vec<Alert>>,
    delivered: AtomicUsize,
    call_log: Option<CallLog>,
}

impl MemoryChannel {
    /// Create a configured channel that accepts every alert
    pub fn new(kind: ChannelKind) -> Self {
        Self {
            kind,
            configured: true,
            failure: None,
            delay: None,
            received: Mutex::new(Vec::new()),
            delivered: AtomicUsize::new(0),
            call_log: None,
        }
    }

    /// Create a channel that reports itself unconfigured
    pub fn unconfigured(kind: ChannelKind) -> Self {
        Self {
            configured: false,
            ..Self::new(kind)
        }
    }

    /// Fail every delivery with a transport error
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }

    /// Sleep before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Record invocations into a shared log
    pub fn with_call_log(mut self, log: CallLog) -> Self {
        self.call_log = Some(log);
        self
    }

    /// Number of times `deliver` was called
    pub fn call_count(&self) -> usize {
        self.received.lock().map(|r| r.len()).unwrap_or_default()
    }

    /// Number of deliveries that ran to completion and succeeded
    pub fn delivered_count(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    /// Alerts passed to `deliver`, oldest first
    pub fn received(&self) -> Vec<Alert> {
        self.received.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl NotificationChannel for MemoryChannel {
    fn kind(&self) -> ChannelKind {
        self.kind
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn deliver(&self, alert: &Alert) -> Result<Ack, ChannelError> {
        // Recorded before the first await so start order is observable
        if let Some(log) = &self.call_log {
            log.record(self.kind);
        }
        if let Ok(mut received) = self.received.lock() {
            received.push(alert.clone());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.failure {
            Some(reason) => Err(ChannelError::Transport(reason.clone())),
            None if !self.configured => Err(ChannelError::Unconfigured),
            None => {
                self.delivered.fetch_add(1, Ordering::SeqCst);
                Ok(Ack::new(self.kind).with_reference("memory"))
            }
        }
    }
}
