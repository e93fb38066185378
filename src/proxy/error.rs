//! Edge failures and their HTTP mapping.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::envelope::EnvelopeError;
use crate::invoke::InvocationError;
use crate::lifecycle::ClientInitError;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("failed to read request body: {0}")]
    RequestBody(String),

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("failed to encode request: {0}")]
    Encode(#[source] EnvelopeError),

    #[error(transparent)]
    Invocation(#[from] InvocationError),

    #[error("invocation of {function} timed out after {timeout:?}")]
    Timeout { function: String, timeout: Duration },

    #[error(transparent)]
    Client(#[from] ClientInitError),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::RequestBody(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "Proxy request failed");
        } else {
            tracing::warn!(error = %self, status = %status, "Rejected proxy request");
        }
        (status, status.canonical_reason().unwrap_or_default()).into_response()
    }
}
