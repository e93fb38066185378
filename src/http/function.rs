//! Function host: serves the signing function over the invoke API.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::envelope::{EnvelopeError, RequestEnvelope};
use crate::function::{HandlerError, SignFunction};
use crate::http::request::{request_span, UuidRequestId, X_REQUEST_ID};
use crate::invoke::{FunctionError, FUNCTION_ERROR_HEADER};

#[derive(Clone)]
struct HostState {
    name: Arc<str>,
    function: SignFunction,
}

/// HTTP server for the invocation-side role.
pub struct FunctionHost {
    router: Router,
    name: Arc<str>,
}

impl FunctionHost {
    pub fn new(config: &GatewayConfig, function: SignFunction) -> Self {
        let name: Arc<str> = Arc::from(config.function.name.as_str());
        let router = Self::build_router(config, Arc::clone(&name), function);
        Self { router, name }
    }

    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, name: Arc<str>, function: SignFunction) -> Router {
        // Envelopes carry base64 bodies and header maps on top of the raw request.
        let payload_limit = config.security.max_body_size.saturating_mul(2);

        Router::new()
            .route("/2015-03-31/functions/{name}/invocations", post(invoke))
            .route("/healthz", get(|| async { "ok" }))
            .with_state(HostState { name, function })
            .layer(DefaultBodyLimit::max(payload_limit))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(request_span::<Body>))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, function = %self.name, "Function host listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("Function host stopped");
        Ok(())
    }
}

async fn invoke(State(state): State<HostState>, Path(name): Path<String>, payload: Bytes) -> Response {
    if name != *state.name {
        tracing::warn!(function = %name, "Invocation of unknown function");
        let body = FunctionError::to_payload(
            &format!("Function not found: {name}"),
            "ResourceNotFoundException",
        );
        return (StatusCode::NOT_FOUND, Json(body)).into_response();
    }

    let envelope: RequestEnvelope = match serde_json::from_slice(&payload) {
        Ok(envelope) => envelope,
        Err(e) => return function_error(&HandlerError::Envelope(EnvelopeError::from(e))),
    };

    match state.function.handle(envelope).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => function_error(&e),
    }
}

/// A function failure: `200` with the error marker header and an error payload.
fn function_error(error: &HandlerError) -> Response {
    tracing::error!(error = %error, error_type = error.error_type(), "Signing function failed");
    let body = FunctionError::to_payload(&error.to_string(), error.error_type());
    (StatusCode::OK, [(FUNCTION_ERROR_HEADER, "Unhandled")], Json(body)).into_response()
}
