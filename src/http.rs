//! axum adapter for the transaction interceptor
//!
//! Handlers return `Result<_, HandlerError>` (or any error that converts
//! into a [`TransactionFailure`] response). The [`intercept`] middleware
//! spots the failure marker on the way out and routes it through
//! [`TransactionInterceptor::handle`].
//!
//! ```rust,ignore
//! let app = Router::new()
//!     .route("/orders", post(create_order))
//!     .layer(axum::middleware::from_fn_with_state(interceptor, txguard::http::intercept));
//! ```

use crate::error::{ClassifyFailure, HandlerError};
use crate::interceptor::{InterceptedResponse, TransactionInterceptor};
use crate::types::{RequestInfo, TRANSACTION_FAILURE_BODY};
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

/// Body for non-database handler errors; the message stays in the server log
pub const GENERIC_ERROR_BODY: &str = "Internal Server Error";

fn generic_failure() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(header::CONTENT_TYPE, "application/json")],
        TRANSACTION_FAILURE_BODY,
    )
        .into_response()
}

impl InterceptedResponse for Response {
    fn status_code(&self) -> u16 {
        self.status().as_u16()
    }

    fn transaction_failure() -> Self {
        generic_failure()
    }
}

/// Response extension marking a database transaction failure
///
/// Carries the diagnostic detail from the handler to the middleware. The
/// detail never reaches the client.
#[derive(Debug, Clone)]
pub struct TransactionFailure {
    detail: String,
}

impl TransactionFailure {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl fmt::Display for TransactionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Database transaction error: {}", self.detail)
    }
}

impl ClassifyFailure for TransactionFailure {
    fn database_failure(&self) -> Option<String> {
        Some(self.detail.clone())
    }
}

impl IntoResponse for TransactionFailure {
    fn into_response(self) -> Response {
        let mut response = generic_failure();
        response.extensions_mut().insert(self);
        response
    }
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        match self {
            HandlerError::Database(err) => TransactionFailure::new(err.message()).into_response(),
            HandlerError::Other(message) => {
                tracing::error!(error = %message, "Request handler failed");
                (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR_BODY).into_response()
            }
        }
    }
}

/// Middleware applying the transaction failure policy to every request
pub async fn intercept(
    State(interceptor): State<Arc<TransactionInterceptor>>,
    request: Request,
    next: Next,
) -> Response {
    let mut info = RequestInfo::new(request.method().as_str(), request.uri().path());
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        info = info.with_client_addr(*addr);
    }

    interceptor
        .handle(&info, async move {
            let mut response = next.run(request).await;
            match response.extensions_mut().remove::<TransactionFailure>() {
                Some(failure) => Err(failure),
                None => Ok(response),
            }
        })
        .await
        .unwrap_or_else(IntoResponse::into_response)
}
