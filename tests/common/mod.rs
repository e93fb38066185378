//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderMap, Method, Request, Response, Uri};
use tokio::net::TcpListener;

use signing_proxy::config::GatewayConfig;
use signing_proxy::envelope::RequestEnvelope;
use signing_proxy::function::{SignFunction, Upstream, UpstreamError};
use signing_proxy::http::{FunctionHost, HttpServer};
use signing_proxy::invoke::{FunctionError, InvocationError, InvocationTarget, InvokeOutput};
use signing_proxy::lifecycle::Shutdown;
use signing_proxy::params::{
    MemoryParameterStore, ParameterPage, ParameterResolver, ParameterSource, PathQuery, SharedSource, StoreError,
};
use signing_proxy::proxy::ForwardProxy;

pub const FUNCTION_NAME: &str = "sign";

/// Parameter store from `(name, value)` pairs.
pub fn store(entries: &[(&str, &str)]) -> Arc<MemoryParameterStore> {
    Arc::new(MemoryParameterStore::from_entries(
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>(),
        10,
    ))
}

/// Wraps a source, counting queries and optionally delaying or failing them.
pub struct CountingSource {
    inner: Arc<MemoryParameterStore>,
    delay: Duration,
    fail: bool,
    pub queries: AtomicUsize,
}

impl CountingSource {
    pub fn new(inner: Arc<MemoryParameterStore>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner,
            delay,
            fail: false,
            queries: AtomicUsize::new(0),
        })
    }

    pub fn failing(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner: Arc::new(MemoryParameterStore::default()),
            delay,
            fail: true,
            queries: AtomicUsize::new(0),
        })
    }

    pub fn count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ParameterSource for CountingSource {
    async fn get_parameters_by_path(&self, query: PathQuery) -> Result<ParameterPage, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        if self.fail {
            return Err(StoreError::Unavailable("injected failure".into()));
        }
        self.inner.get_parameters_by_path(query).await
    }
}

/// A signed request as seen by the upstream.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Records signed requests and echoes them back.
///
/// The response body is the request body; `x-echo-uri` carries the signed URI.
#[derive(Default)]
pub struct RecordingUpstream {
    pub requests: Mutex<Vec<Recorded>>,
}

impl RecordingUpstream {
    pub fn last(&self) -> Recorded {
        self.requests.lock().unwrap().last().cloned().expect("no request recorded")
    }

    pub fn count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Upstream for RecordingUpstream {
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, UpstreamError> {
        let (parts, body) = request.into_parts();
        let response = Response::builder()
            .status(200)
            .header("x-echo-uri", parts.uri.to_string())
            .header("keep-alive", "timeout=5")
            .header("content-type", "application/octet-stream")
            .body(body.clone())
            .unwrap();
        self.requests.lock().unwrap().push(Recorded {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
        });
        Ok(response)
    }
}

/// Always fails like an unreachable backend.
pub struct FailingUpstream;

#[async_trait]
impl Upstream for FailingUpstream {
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, UpstreamError> {
        Err(UpstreamError::Send {
            url: request.uri().to_string(),
            reason: "connection refused".into(),
        })
    }
}

pub fn sign_function(prefix: &str, source: SharedSource, upstream: Arc<dyn Upstream>) -> SignFunction {
    SignFunction::new(ParameterResolver::with_source(prefix, source), upstream)
}

/// Runs the signing function in-process, the way the function host does.
pub struct LocalTarget {
    pub function: SignFunction,
}

#[async_trait]
impl InvocationTarget for LocalTarget {
    async fn invoke(&self, _function: &str, payload: Bytes) -> Result<InvokeOutput, InvocationError> {
        let envelope: RequestEnvelope =
            serde_json::from_slice(&payload).map_err(|e| InvocationError::Transport(e.to_string()))?;
        match self.function.handle(envelope).await {
            Ok(response) => Ok(InvokeOutput::success(serde_json::to_vec(&response).unwrap())),
            Err(e) => {
                let payload = FunctionError::to_payload(&e.to_string(), e.error_type());
                Ok(InvokeOutput::failure("Unhandled", payload.to_string()))
            }
        }
    }
}

/// Target that never answers in time.
pub struct SlowTarget(pub Duration);

#[async_trait]
impl InvocationTarget for SlowTarget {
    async fn invoke(&self, _function: &str, _payload: Bytes) -> Result<InvokeOutput, InvocationError> {
        tokio::time::sleep(self.0).await;
        Err(InvocationError::Transport("too late".into()))
    }
}

pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.function.name = FUNCTION_NAME.to_string();
    config.function.invoke_timeout_secs = 5;
    config.security.max_body_size = 64 * 1024;
    config
}

/// Start a function host on an ephemeral port.
pub async fn spawn_function_host(config: &GatewayConfig, function: SignFunction, shutdown: &Shutdown) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let host = FunctionHost::new(config, function);
    let signal = shutdown.wait();
    tokio::spawn(async move {
        let _ = host.run(listener, signal).await;
    });
    addr
}

/// Start an edge proxy on an ephemeral port.
pub async fn spawn_edge(config: GatewayConfig, proxy: ForwardProxy, shutdown: &Shutdown) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config, proxy);
    let signal = shutdown.wait();
    tokio::spawn(async move {
        let _ = server.run(listener, signal).await;
    });
    addr
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
