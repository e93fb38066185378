//! Invocation targets: where the edge sends request envelopes.
//!
//! # Data Flow
//! ```text
//! RequestEnvelope (JSON)
//!     → InvocationTarget::invoke (function name + payload)
//!     → InvokeOutput (payload + optional function error marker)
//!     → classify → ResponseEnvelope | InvocationError
//! ```

pub mod error;
pub mod http;

use async_trait::async_trait;
use axum::body::Bytes;

use crate::envelope::ResponseEnvelope;

pub use error::{FunctionError, InvocationError};
pub use http::HttpInvoker;

/// Path of the invoke call for `function`, relative to the endpoint root.
pub fn invocation_path(function: &str) -> String {
    format!("/2015-03-31/functions/{function}/invocations")
}

/// Header naming a function-reported failure on an otherwise successful invoke.
pub const FUNCTION_ERROR_HEADER: &str = "x-amz-function-error";

/// Raw result of an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeOutput {
    pub payload: Bytes,
    /// Set when the function reported a failure instead of a result.
    pub function_error: Option<String>,
}

impl InvokeOutput {
    pub fn success(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            function_error: None,
        }
    }

    pub fn failure(kind: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            function_error: Some(kind.into()),
        }
    }
}

/// A remote, named-function invocation service.
///
/// Dropping the returned future cancels the call.
#[async_trait]
pub trait InvocationTarget: Send + Sync {
    async fn invoke(&self, function: &str, payload: Bytes) -> Result<InvokeOutput, InvocationError>;
}

/// Turn an invocation result into a response envelope or a classified error.
pub fn classify(output: InvokeOutput) -> Result<ResponseEnvelope, InvocationError> {
    if output.function_error.is_some() {
        return Err(InvocationError::Function(FunctionError::from_payload(&output.payload)));
    }
    let envelope = serde_json::from_slice(&output.payload).map_err(crate::envelope::EnvelopeError::from)?;
    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_path() {
        assert_eq!(invocation_path("sign"), "/2015-03-31/functions/sign/invocations");
    }

    #[test]
    fn test_classify_success() {
        let output = InvokeOutput::success(r#"{"statusCode":204,"statusDescription":"204 No Content"}"#);
        let envelope = classify(output).unwrap();
        assert_eq!(envelope.status_code, 204);
    }

    #[test]
    fn test_classify_function_error() {
        let output = InvokeOutput::failure("Unhandled", r#"{"errorMessage":"boom","errorType":"X"}"#);
        match classify(output) {
            Err(InvocationError::Function(e)) => {
                assert_eq!(e.message, "boom");
                assert_eq!(e.error_type.as_deref(), Some("X"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_classify_malformed_success_payload() {
        let err = classify(InvokeOutput::success("not json")).unwrap_err();
        assert!(matches!(err, InvocationError::Malformed(_)));
    }
}
