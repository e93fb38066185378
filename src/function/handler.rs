//! Signing handler: one envelope in, one envelope out.

use std::sync::Arc;

use axum::http::header::HOST;
use axum::http::StatusCode;
use thiserror::Error;

use crate::envelope::{EnvelopeError, RequestEnvelope, ResponseEnvelope};
use crate::function::upstream::{Upstream, UpstreamError};
use crate::observability::metrics;
use crate::params::{ParameterResolver, Resolution, ResolveError, SignError};

/// Body of the response returned when a host has no signing parameters.
pub const NOT_FOUND_BODY: &str =
    "any parameters for signing is not found in AWS System Manager Parameter Store\n";

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Sign(#[from] SignError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl HandlerError {
    /// Value reported as `errorType` in function error payloads.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Envelope(_) => "MalformedEnvelope",
            Self::Resolve(_) => "ParameterStoreError",
            Self::Sign(_) => "SignError",
            Self::Upstream(_) => "UpstreamError",
        }
    }
}

/// The fixed response for hosts without signing parameters.
pub fn not_found_response() -> ResponseEnvelope {
    ResponseEnvelope::text(StatusCode::PROXY_AUTHENTICATION_REQUIRED, NOT_FOUND_BODY)
}

/// Resolves, signs and forwards enveloped requests.
#[derive(Clone)]
pub struct SignFunction {
    resolver: ParameterResolver,
    upstream: Arc<dyn Upstream>,
}

impl SignFunction {
    pub fn new(resolver: ParameterResolver, upstream: Arc<dyn Upstream>) -> Self {
        Self { resolver, upstream }
    }

    pub fn resolver(&self) -> &ParameterResolver {
        &self.resolver
    }

    pub async fn handle(&self, envelope: RequestEnvelope) -> Result<ResponseEnvelope, HandlerError> {
        match self.sign_and_send(envelope).await {
            Ok(Some(response)) => {
                metrics::record_function_request("ok");
                Ok(response)
            }
            Ok(None) => {
                metrics::record_function_request("not_found");
                Ok(not_found_response())
            }
            Err(e) => {
                metrics::record_function_request("error");
                Err(e)
            }
        }
    }

    /// `None` when the host has no signing parameters.
    async fn sign_and_send(&self, envelope: RequestEnvelope) -> Result<Option<ResponseEnvelope>, HandlerError> {
        let request = envelope.into_request()?;
        let host = request
            .headers()
            .get(HOST)
            .and_then(|v| v.to_str().ok())
            .ok_or(EnvelopeError::MissingHost)?
            .to_string();

        let parameter = match self.resolver.resolve(&host).await? {
            Resolution::Found(parameter) => parameter,
            Resolution::NotFound => return Ok(None),
        };

        let signed = parameter.sign(request)?;
        tracing::debug!(host = %host, method = %signed.method(), path = %signed.uri().path(), "Sending signed request");

        let response = self.upstream.send(signed).await?;
        Ok(Some(ResponseEnvelope::from_response(response)))
    }
}

impl std::fmt::Debug for SignFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignFunction").field("resolver", &self.resolver).finish()
    }
}
