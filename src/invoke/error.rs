//! Invocation failures.

use serde_json::Value;
use thiserror::Error;

use crate::envelope::EnvelopeError;

#[derive(Debug, Error)]
pub enum InvocationError {
    /// The call itself failed: connect, I/O, timeout, or a non-success status.
    #[error("invocation transport failure: {0}")]
    Transport(String),

    #[error(transparent)]
    Function(#[from] FunctionError),

    #[error("malformed envelope: {0}")]
    Malformed(#[from] EnvelopeError),
}

/// A failure reported by the function itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FunctionError {
    pub message: String,
    pub error_type: Option<String>,
    /// The payload as returned.
    pub payload: String,
}

impl FunctionError {
    /// Parse an error payload of the form `{"errorMessage": ..., "errorType": ...}`.
    ///
    /// Without a string `errorMessage` the message is the raw payload text.
    pub fn from_payload(payload: &[u8]) -> Self {
        let raw = String::from_utf8_lossy(payload).into_owned();
        let parsed: Option<Value> = serde_json::from_slice(payload).ok();

        let field = |name: &str| {
            parsed
                .as_ref()
                .and_then(|v| v.get(name))
                .and_then(Value::as_str)
                .map(str::to_owned)
        };

        Self {
            message: field("errorMessage").unwrap_or_else(|| raw.clone()),
            error_type: field("errorType"),
            payload: raw,
        }
    }

    /// Error payload as the function host emits it.
    pub fn to_payload(message: &str, error_type: &str) -> Value {
        serde_json::json!({ "errorMessage": message, "errorType": error_type })
    }
}
