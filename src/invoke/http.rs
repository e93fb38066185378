//! Invocation over the function host's HTTP interface.

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::invoke::{invocation_path, InvocationError, InvocationTarget, InvokeOutput, FUNCTION_ERROR_HEADER};

/// Upper bound on a buffered invocation response.
const MAX_RESPONSE_BYTES: usize = 64 * 1024 * 1024;

/// Posts envelopes to `<endpoint>/2015-03-31/functions/<name>/invocations`.
#[derive(Clone)]
pub struct HttpInvoker {
    endpoint: String,
    client: Client<HttpConnector, Body>,
}

impl HttpInvoker {
    /// `endpoint` is an `http://host:port` root, e.g. the function host's address.
    pub fn new(endpoint: &str) -> Result<Self, String> {
        let uri: Uri = endpoint
            .parse()
            .map_err(|e| format!("invalid function endpoint {endpoint:?}: {e}"))?;
        if uri.scheme_str() != Some("http") || uri.authority().is_none() {
            return Err(format!("function endpoint {endpoint:?} must be an http:// URL with a host"));
        }

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl InvocationTarget for HttpInvoker {
    async fn invoke(&self, function: &str, payload: Bytes) -> Result<InvokeOutput, InvocationError> {
        let uri = format!("{}{}", self.endpoint, invocation_path(function));
        let request = Request::builder()
            .method(Method::POST)
            .uri(&uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(payload))
            .map_err(|e| InvocationError::Transport(format!("cannot build invoke request for {uri}: {e}")))?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| InvocationError::Transport(e.to_string()))?;

        let status = response.status();
        let function_error = response
            .headers()
            .get(FUNCTION_ERROR_HEADER)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());
        let payload = axum::body::to_bytes(Body::new(response.into_body()), MAX_RESPONSE_BYTES)
            .await
            .map_err(|e| InvocationError::Transport(format!("reading invoke response: {e}")))?;

        if function_error.is_none() && !status.is_success() {
            return Err(InvocationError::Transport(format!(
                "function {function} returned {status}: {}",
                String::from_utf8_lossy(&payload)
            )));
        }

        Ok(InvokeOutput {
            payload,
            function_error,
        })
    }
}

impl std::fmt::Debug for HttpInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpInvoker").field("endpoint", &self.endpoint).finish()
    }
}
