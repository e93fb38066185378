//! The edge orchestrator.

use std::error::Error as _;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::header::HOST;
use axum::http::uri::Authority;
use axum::http::{HeaderValue, Request, Response};
use http_body_util::LengthLimitError;

use crate::envelope::{RequestEnvelope, ResponseEnvelope};
use crate::invoke::{classify, InvocationError, InvocationTarget, InvokeOutput};
use crate::lifecycle::LazyClient;
use crate::observability::metrics;
use crate::proxy::ProxyError;
use crate::security::headers::{append_forwarded_for, strip_hop_headers};

/// Shared handle to an invocation target.
pub type SharedTarget = Arc<dyn InvocationTarget>;

/// Converts inbound requests into function invocations. Cheap to clone.
#[derive(Clone)]
pub struct ForwardProxy {
    inner: Arc<Inner>,
}

struct Inner {
    function_name: String,
    target: LazyClient<SharedTarget>,
    invoke_timeout: Duration,
    body_limit: usize,
}

impl ForwardProxy {
    pub fn new(
        function_name: impl Into<String>,
        target: LazyClient<SharedTarget>,
        invoke_timeout: Duration,
        body_limit: usize,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                function_name: function_name.into(),
                target,
                invoke_timeout,
                body_limit,
            }),
        }
    }

    /// Proxy over an already constructed target.
    pub fn with_target(
        function_name: impl Into<String>,
        target: SharedTarget,
        invoke_timeout: Duration,
        body_limit: usize,
    ) -> Self {
        Self::new(
            function_name,
            LazyClient::ready("invocation target", target),
            invoke_timeout,
            body_limit,
        )
    }

    pub fn function_name(&self) -> &str {
        &self.inner.function_name
    }

    /// Handle one inbound proxy request from `client`.
    pub async fn handle(&self, client: SocketAddr, request: Request<Body>) -> Result<Response<Body>, ProxyError> {
        let (mut parts, body) = request.into_parts();

        strip_hop_headers(&mut parts.headers);
        append_forwarded_for(&mut parts.headers, client.ip());

        // Absolute-form targets name the origin; it wins over any Host header.
        if let Some(host) = parts.uri.authority().and_then(host_value) {
            parts.headers.insert(HOST, host);
        }

        let limit = self.inner.body_limit;
        let body = axum::body::to_bytes(body, limit).await.map_err(|e| {
            if exceeds_limit(&e) {
                ProxyError::PayloadTooLarge { limit }
            } else {
                ProxyError::RequestBody(e.to_string())
            }
        })?;

        let response = self.round_trip(Request::from_parts(parts, body)).await?;
        Ok(response.map(Body::from))
    }

    /// Send an already buffered request through the invocation target.
    ///
    /// No request header hygiene is applied; response hop-by-hop headers
    /// are still stripped.
    pub async fn round_trip(&self, request: Request<Bytes>) -> Result<Response<Bytes>, ProxyError> {
        let (parts, body) = request.into_parts();
        let envelope = RequestEnvelope::from_parts(&parts, &body);
        let payload = serde_json::to_vec(&envelope).map_err(|e| ProxyError::Encode(e.into()))?;

        let output = self.invoke(Bytes::from(payload)).await?;
        let envelope = classify(output).inspect_err(|e| metrics::record_invocation(outcome(e)))?;
        let mut response = envelope_response(envelope)?;
        metrics::record_invocation("ok");

        strip_hop_headers(response.headers_mut());
        Ok(response)
    }

    async fn invoke(&self, payload: Bytes) -> Result<InvokeOutput, ProxyError> {
        let target = self.inner.target.get().await?;
        let function = self.inner.function_name.as_str();

        tracing::debug!(function = %function, bytes = payload.len(), "Invoking function");
        match tokio::time::timeout(self.inner.invoke_timeout, target.invoke(function, payload)).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => {
                metrics::record_invocation(outcome(&e));
                Err(e.into())
            }
            Err(_) => {
                metrics::record_invocation("timeout");
                Err(ProxyError::Timeout {
                    function: function.to_string(),
                    timeout: self.inner.invoke_timeout,
                })
            }
        }
    }
}

impl std::fmt::Debug for ForwardProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardProxy")
            .field("function_name", &self.inner.function_name)
            .field("invoke_timeout", &self.inner.invoke_timeout)
            .field("body_limit", &self.inner.body_limit)
            .finish()
    }
}

fn envelope_response(envelope: ResponseEnvelope) -> Result<Response<Bytes>, ProxyError> {
    envelope.into_response().map_err(|e| {
        metrics::record_invocation("malformed");
        ProxyError::Invocation(InvocationError::Malformed(e))
    })
}

fn outcome(error: &InvocationError) -> &'static str {
    match error {
        InvocationError::Transport(_) => "transport_error",
        InvocationError::Function(_) => "function_error",
        InvocationError::Malformed(_) => "malformed",
    }
}

/// `host[:port]` of an authority, without userinfo.
/// Whether a body read failed because the size limit was hit, at any depth.
fn exceeds_limit(error: &axum::Error) -> bool {
    let mut source = error.source();
    while let Some(err) = source {
        if err.is::<LengthLimitError>() {
            return true;
        }
        source = err.source();
    }
    false
}

fn host_value(authority: &Authority) -> Option<HeaderValue> {
    let host = match authority.port_u16() {
        Some(port) => format!("{}:{}", authority.host(), port),
        None => authority.host().to_string(),
    };
    HeaderValue::try_from(host).ok()
}
