//! Edge router behaviour, driven in-process.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::connect_info::MockConnectInfo;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use signing_proxy::http::HttpServer;
use signing_proxy::invoke::InvocationTarget;
use signing_proxy::params::SharedSource;
use signing_proxy::proxy::ForwardProxy;

mod common;
use common::{LocalTarget, RecordingUpstream, SlowTarget};

fn router(target: Arc<dyn InvocationTarget>, invoke_timeout: Duration) -> Router {
    let config = common::test_config();
    let proxy = ForwardProxy::with_target(
        common::FUNCTION_NAME,
        target,
        invoke_timeout,
        config.security.max_body_size,
    );
    let client: SocketAddr = "198.51.100.20:40000".parse().unwrap();
    HttpServer::build_router(&config, proxy).layer(MockConnectInfo(client))
}

fn signing_router(entries: &[(&str, &str)]) -> (Router, Arc<RecordingUpstream>) {
    let upstream = Arc::new(RecordingUpstream::default());
    let source: SharedSource = common::store(entries);
    let function = common::sign_function("", source, upstream.clone());
    let target = Arc::new(LocalTarget { function });
    (router(target, Duration::from_secs(5)), upstream)
}

#[tokio::test]
async fn test_absolute_form_target_sets_host() {
    let (router, upstream) = signing_router(&[("/backend.example.com/headers/x-key", "k")]);

    let request = Request::get("http://backend.example.com/status")
        .header("host", "proxy.local")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let signed = upstream.last();
    assert_eq!(signed.uri.to_string(), "https://backend.example.com/status");
    assert_eq!(signed.headers["host"], "backend.example.com");
    assert_eq!(signed.headers["x-key"], "k");
}

#[tokio::test]
async fn test_hop_by_hop_and_forwarded_for() {
    let (router, upstream) = signing_router(&[("/example.com/headers/x-key", "k")]);

    let request = Request::get("/")
        .header("host", "example.com")
        .header("connection", "X-Custom")
        .header("x-custom", "secret")
        .header("te", "trailers")
        .header("proxy-authorization", "Basic Zm9vOmJhcg==")
        .header("x-forwarded-for", "203.0.113.9")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let signed = upstream.last();
    assert!(signed.headers.get("x-custom").is_none());
    assert!(signed.headers.get("connection").is_none());
    assert!(signed.headers.get("proxy-authorization").is_none());
    assert_eq!(signed.headers["te"], "trailers");
    assert_eq!(signed.headers["x-forwarded-for"], "203.0.113.9, 198.51.100.20");
}

#[tokio::test]
async fn test_request_id_is_generated_and_kept() {
    let (router, _) = signing_router(&[]);

    let response = router
        .clone()
        .oneshot(Request::get("/").header("host", "a.example.com").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let generated = response.headers()["x-request-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(generated).is_ok());

    let response = router
        .oneshot(
            Request::get("/")
                .header("host", "a.example.com")
                .header("x-request-id", "caller-id")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.headers()["x-request-id"], "caller-id");
}

#[tokio::test]
async fn test_invocation_timeout_is_bad_gateway() {
    let router = router(Arc::new(SlowTarget(Duration::from_secs(5))), Duration::from_millis(50));

    let response = router
        .oneshot(Request::get("/").header("host", "example.com").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_declared_oversized_body_is_413() {
    let (router, upstream) = signing_router(&[("/example.com/headers/x-key", "k")]);
    let body = vec![b'x'; 128 * 1024];

    let request = Request::post("/upload")
        .header("host", "example.com")
        .header("content-length", body.len())
        .body(Body::from(body))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(upstream.count(), 0);
}

#[tokio::test]
async fn test_streamed_oversized_body_is_413() {
    let (router, upstream) = signing_router(&[("/example.com/headers/x-key", "k")]);
    let chunks = futures_util::stream::iter(
        (0..8).map(|_| Ok::<_, std::io::Error>(axum::body::Bytes::from(vec![b'x'; 16 * 1024]))),
    );

    let request = Request::post("/upload")
        .header("host", "example.com")
        .body(Body::from_stream(chunks))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(upstream.count(), 0);
}
