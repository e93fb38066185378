//! Outbound calls to the signed backend.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{Request, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("cannot convert signed request: {0}")]
    Request(String),

    #[error("outbound request to {url} failed: {reason}")]
    Send { url: String, reason: String },

    #[error("reading outbound response from {url} failed: {reason}")]
    Body { url: String, reason: String },
}

/// Performs the real outbound HTTP exchange for a signed request.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, UpstreamError>;
}

/// `reqwest`-backed upstream. Follows redirects; bodies are buffered.
#[derive(Debug, Clone)]
pub struct ReqwestUpstream {
    client: reqwest::Client,
}

impl ReqwestUpstream {
    pub fn new(timeout: Duration) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| e.to_string())?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Upstream for ReqwestUpstream {
    async fn send(&self, request: Request<Bytes>) -> Result<Response<Bytes>, UpstreamError> {
        let request = reqwest::Request::try_from(request).map_err(|e| UpstreamError::Request(e.to_string()))?;
        let url = request.url().to_string();

        let response = self.client.execute(request).await.map_err(|e| UpstreamError::Send {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(|e| UpstreamError::Body {
            url,
            reason: e.to_string(),
        })?;

        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.version_mut() = version;
        *response.headers_mut() = headers;
        Ok(response)
    }
}
