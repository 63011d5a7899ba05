//! Durable event table
//!
//! Pluggable persistence for event log rows `(event_type, description,
//! timestamp)`. Writes are best effort: the event log catches every
//! `PersistenceError` and never lets it reach the request.

use crate::error::PersistenceError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tokio::sync::RwLock;

/// One row of the durable event table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub event_type: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

/// Storage backend for event records
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append one record
    async fn append(&self, record: &EventRecord) -> Result<(), PersistenceError>;

    /// Most recent records first
    async fn recent(&self, limit: usize) -> Result<Vec<EventRecord>, PersistenceError>;
}

// ============================================================================
// In-memory Store
// ============================================================================

/// In-memory event store for development and testing
#[derive(Default)]
pub struct MemoryEventStore {
    records: RwLock<Vec<EventRecord>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append(&self, record: &EventRecord) -> Result<(), PersistenceError> {
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<EventRecord>, PersistenceError> {
        let records = self.records.read().await;
        Ok(records.iter().rev().take(limit).cloned().collect())
    }
}

// ============================================================================
// SQLite Store
// ============================================================================

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS event_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    event_type TEXT NOT NULL,
    description TEXT NOT NULL,
    timestamp TEXT NOT NULL
)";

/// SQLite-backed event table
///
/// The table is created on connect if it does not exist. Timestamps are
/// stored as RFC 3339 text.
#[derive(Clone)]
pub struct SqliteEventStore {
    pool: SqlitePool,
}

impl SqliteEventStore {
    /// Connect to a SQLite URL (e.g. `sqlite://events.db`, `sqlite::memory:`)
    pub async fn connect(url: &str) -> Result<Self, PersistenceError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        // A single long-lived connection keeps `sqlite::memory:` databases alive
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Use an existing pool, creating the table if needed
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, PersistenceError> {
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        tracing::debug!("Event table ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn append(&self, record: &EventRecord) -> Result<(), PersistenceError> {
        sqlx::query("INSERT INTO event_log (event_type, description, timestamp) VALUES (?, ?, ?)")
            .bind(&record.event_type)
            .bind(&record.description)
            .bind(record.timestamp.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<EventRecord>, PersistenceError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            "SELECT event_type, description, timestamp FROM event_log ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|(event_type, description, timestamp)| {
                let timestamp = DateTime::parse_from_rfc3339(&timestamp)
                    .map_err(|e| {
                        PersistenceError::Store(format!("bad timestamp '{}': {}", timestamp, e))
                    })?
                    .with_timezone(&Utc);
                Ok(EventRecord {
                    event_type,
                    description,
                    timestamp,
                })
            })
            .collect()
    }
}
