//! Transaction interceptor: wraps request handling in a failure boundary
//!
//! A handler result passes through untouched unless its error is a database
//! transaction failure. In that case the interceptor records an error entry,
//! hands a `FailureEvent` to the alert sink without waiting for delivery,
//! and answers with the generic failure response instead of the error.

use crate::error::ClassifyFailure;
use crate::event_log::{EventLog, RequestLogEntry};
use crate::queue::AlertSink;
use crate::types::{FailureEvent, RequestInfo, Response};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// Response types the interceptor can inspect and substitute
pub trait InterceptedResponse: Sized {
    /// HTTP status recorded in the completion entry
    fn status_code(&self) -> u16;

    /// Generic response returned in place of a transaction failure
    fn transaction_failure() -> Self;
}

impl InterceptedResponse for Response {
    fn status_code(&self) -> u16 {
        self.status
    }

    fn transaction_failure() -> Self {
        Response::transaction_failure()
    }
}

/// Failure boundary around request handlers
pub struct TransactionInterceptor {
    sink: Arc<dyn AlertSink>,
    event_log: Arc<EventLog>,
}

impl TransactionInterceptor {
    pub fn new(sink: Arc<dyn AlertSink>, event_log: Arc<EventLog>) -> Self {
        Self { sink, event_log }
    }

    /// The log receiving one entry per handled request
    pub fn event_log(&self) -> &Arc<EventLog> {
        &self.event_log
    }

    /// Run `next` and apply the failure policy to its result
    ///
    /// Nothing is awaited after `next` resolves, so once the handler has
    /// failed the alert submission cannot be cancelled by dropping this future.
    ///
    /// - `Ok` responses are logged as complete and returned unchanged
    /// - database failures are logged, submitted for alerting and replaced
    ///   by `R::transaction_failure()`
    /// - any other error is logged as complete with an `unhandled:` status
    ///   and returned unchanged
    pub async fn handle<R, E, F>(&self, request: &RequestInfo, next: F) -> Result<R, E>
    where
        R: InterceptedResponse,
        E: ClassifyFailure + Display,
        F: Future<Output = Result<R, E>>,
    {
        let start = Instant::now();
        let result = next.await;
        let elapsed = start.elapsed();

        match result {
            Ok(response) => {
                let status = response.status_code().to_string();
                self.event_log
                    .record(RequestLogEntry::completed(request, status, elapsed));
                Ok(response)
            }
            Err(err) => match err.database_failure() {
                Some(detail) => {
                    let event = FailureEvent::transaction_failure(request, detail, elapsed);
                    let entry = RequestLogEntry::failed(&event);

                    // Submitted before anything else so a dropped request cannot lose it
                    let event_id = event.id().to_string();
                    if let Err(e) = self.sink.submit(event) {
                        tracing::debug!(
                            event_id = %event_id,
                            error = %e,
                            "Failure alert not queued"
                        );
                    }
                    self.event_log.record(entry);

                    Ok(R::transaction_failure())
                }
                None => {
                    self.event_log.record(RequestLogEntry::completed(
                        request,
                        format!("unhandled: {}", err),
                        elapsed,
                    ));
                    Err(err)
                }
            },
        }
    }
}
