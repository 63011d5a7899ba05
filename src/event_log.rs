//! Structured event log: one machine-parsable entry per request
//!
//! Every entry is emitted as a tracing event with target `request_log`,
//! kept in a bounded in-memory ring for local diagnostics, and optionally
//! appended to a durable `EventStore` off the response path. Persistence
//! failures are logged at debug level and never propagate.

use crate::config::EventLogConfig;
use crate::error::PersistenceError;
use crate::store::{EventRecord, EventStore, SqliteEventStore};
use crate::types::{FailureEvent, RequestInfo};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Package name reported in every entry
pub const PACKAGE: &str = "middleware";

/// Module name reported in every entry
pub const MODULE: &str = "TransactionInterceptor";

/// Event name for requests that did not hit a transaction failure
pub const EVENT_COMPLETE: &str = "db_transaction_complete";

/// Event name for requests whose transaction failed
pub const EVENT_ERROR: &str = "db_transaction_error";

/// One request's log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestLogEntry {
    pub package: String,
    pub module: String,
    pub event: String,
    pub method: String,
    pub path: String,

    /// HTTP status for completed requests, error detail for failed ones
    pub status_or_error: String,

    /// Elapsed time in seconds
    pub response_time: f64,

    pub timestamp: DateTime<Utc>,
}

impl RequestLogEntry {
    /// Entry for a request that returned normally (or with a non-database error)
    pub fn completed(
        request: &RequestInfo,
        status_or_error: impl Into<String>,
        duration: Duration,
    ) -> Self {
        Self {
            package: PACKAGE.to_string(),
            module: MODULE.to_string(),
            event: EVENT_COMPLETE.to_string(),
            method: request.method.clone(),
            path: request.path.clone(),
            status_or_error: status_or_error.into(),
            response_time: duration.as_secs_f64(),
            timestamp: Utc::now(),
        }
    }

    /// Entry for a detected transaction failure
    pub fn failed(event: &FailureEvent) -> Self {
        Self {
            package: PACKAGE.to_string(),
            module: MODULE.to_string(),
            event: EVENT_ERROR.to_string(),
            method: event.request_method().to_string(),
            path: event.request_path().to_string(),
            status_or_error: event.error_detail().to_string(),
            response_time: event.duration().as_secs_f64(),
            timestamp: event.occurred_at(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.event == EVENT_ERROR
    }

    /// Durable row for this entry
    pub fn to_record(&self) -> EventRecord {
        EventRecord {
            event_type: self.event.clone(),
            description: format!("{} {}: {}", self.method, self.path, self.status_or_error),
            timestamp: self.timestamp,
        }
    }

    /// Single-line JSON rendering
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn emit(&self) {
        let response_time = format!("{:.3}s", self.response_time);
        let timestamp = self.timestamp.to_rfc3339();
        if self.is_error() {
            tracing::error!(
                target: "request_log",
                package = %self.package,
                module = %self.module,
                event = %self.event,
                method = %self.method,
                path = %self.path,
                status_or_error = %self.status_or_error,
                response_time = %response_time,
                timestamp = %timestamp,
                "Database transaction failed"
            );
        } else {
            tracing::info!(
                target: "request_log",
                package = %self.package,
                module = %self.module,
                event = %self.event,
                method = %self.method,
                path = %self.path,
                status_or_error = %self.status_or_error,
                response_time = %response_time,
                timestamp = %timestamp,
                "Request completed"
            );
        }
    }
}

/// Append-only request log with bounded in-memory history
///
/// Recording never awaits: the ring is guarded by a plain mutex held only
/// for the push and trim, and persistence runs in a detached task.
pub struct EventLog {
    entries: Mutex<VecDeque<RequestLogEntry>>,
    capacity: usize,
    store: Option<Arc<dyn EventStore>>,
    persist_completed: bool,
}

impl EventLog {
    /// Create a log keeping at most `capacity` entries in memory (at least one)
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            store: None,
            persist_completed: false,
        }
    }

    /// Build from configuration, connecting the SQLite store when a URL is set
    pub async fn from_config(config: &EventLogConfig) -> Result<Self, PersistenceError> {
        let log = Self::new(config.capacity);
        match &config.database_url {
            Some(url) => {
                let store = SqliteEventStore::connect(url).await?;
                Ok(log.with_store(Arc::new(store), config.persist_completed))
            }
            None => Ok(log),
        }
    }

    /// Persist entries to a durable store
    ///
    /// Failures are always persisted; completions only if `persist_completed`.
    pub fn with_store(mut self, store: Arc<dyn EventStore>, persist_completed: bool) -> Self {
        self.store = Some(store);
        self.persist_completed = persist_completed;
        self
    }

    /// Maximum number of entries held in memory
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record one entry
    pub fn record(&self, entry: RequestLogEntry) {
        entry.emit();

        if let Some(store) = &self.store {
            if entry.is_error() || self.persist_completed {
                let store = store.clone();
                let record = entry.to_record();
                tokio::spawn(async move {
                    if let Err(e) = store.append(&record).await {
                        tracing::debug!(
                            event_type = %record.event_type,
                            error = %e,
                            "Failed to persist event record"
                        );
                    }
                });
            }
        }

        if let Ok(mut entries) = self.entries.lock() {
            entries.push_back(entry);

            // Enforce max capacity
            while entries.len() > self.capacity {
                entries.pop_front();
            }
        }
    }

    /// Recent entries, most recent first
    pub fn recent(&self, limit: usize) -> Vec<RequestLogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    /// Entries currently held in memory
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(10_000)
    }
}
