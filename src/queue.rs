//! Fire-and-forget hand-off from the request path to the dispatcher
//!
//! `AlertQueue` is a bounded tokio channel drained by a worker task. The
//! worker spawns one detached task per event, so dispatch outlives the
//! request that produced the event and a slow dispatch never holds up the
//! next one.

use crate::dispatcher::AlertDispatcher;
use crate::error::SubmitError;
use crate::types::FailureEvent;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Non-blocking destination for failure events
pub trait AlertSink: Send + Sync {
    /// Hand off an event without waiting for delivery
    fn submit(&self, event: FailureEvent) -> Result<(), SubmitError>;
}

/// Bounded queue feeding a background dispatch worker
#[derive(Clone)]
pub struct AlertQueue {
    tx: mpsc::Sender<FailureEvent>,
}

impl AlertQueue {
    /// Spawn the dispatch worker and return the queue handle
    ///
    /// The worker stops once every `AlertQueue` clone is dropped and the
    /// queue is drained; dispatches already started keep running.
    pub fn start(dispatcher: Arc<AlertDispatcher>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(Self::run(dispatcher, rx));
        (Self { tx }, worker)
    }

    async fn run(dispatcher: Arc<AlertDispatcher>, mut rx: mpsc::Receiver<FailureEvent>) {
        tracing::debug!("Alert dispatch worker started");

        while let Some(event) = rx.recv().await {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                let outcomes = dispatcher.dispatch(&event).await;
                let failed: Vec<&str> = outcomes
                    .iter()
                    .filter(|o| !o.succeeded)
                    .map(|o| o.channel_name.as_str())
                    .collect();
                if failed.len() == outcomes.len() {
                    tracing::error!(
                        event_id = %event.id(),
                        "No channel accepted the failure alert"
                    );
                } else if !failed.is_empty() {
                    tracing::warn!(
                        event_id = %event.id(),
                        failed = ?failed,
                        "Failure alert partially delivered"
                    );
                }
            });
        }

        tracing::debug!("Alert dispatch worker stopped");
    }

    /// Free slots left in the queue
    pub fn remaining_capacity(&self) -> usize {
        self.tx.capacity()
    }
}

impl AlertSink for AlertQueue {
    fn submit(&self, event: FailureEvent) -> Result<(), SubmitError> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SubmitError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => SubmitError::QueueClosed,
        })
    }
}
