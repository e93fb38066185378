//! Resolver behaviour under concurrent load.

use std::sync::Arc;
use std::time::Duration;

use signing_proxy::params::{ParameterResolver, Resolution, ResolveError, SharedSource, StoreError};

mod common;
use common::CountingSource;

#[tokio::test]
async fn test_concurrent_misses_issue_one_query() {
    let store = common::store(&[("/dev/example.com/headers/x-key", "k")]);
    let source = CountingSource::new(store, Duration::from_millis(100));
    let resolver = ParameterResolver::with_source("dev", source.clone() as SharedSource);

    let mut handles = Vec::new();
    for i in 0..32 {
        let resolver = resolver.clone();
        let host = if i % 2 == 0 { "example.com" } else { "EXAMPLE.com" };
        handles.push(tokio::spawn(async move { resolver.resolve(host).await }));
    }

    let mut results = Vec::new();
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            Resolution::Found(parameter) => results.push(parameter),
            Resolution::NotFound => panic!("parameters should be found"),
        }
    }

    assert_eq!(source.count(), 1);
    assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(results[0].headers()["x-key"], "k");

    // Served from the cache from now on.
    resolver.resolve("example.com").await.unwrap();
    assert_eq!(source.count(), 1);
}

#[tokio::test]
async fn test_store_failure_reaches_every_waiter_and_is_not_cached() {
    let source = CountingSource::failing(Duration::from_millis(100));
    let resolver = ParameterResolver::with_source("dev", source.clone() as SharedSource);

    let (a, b, c) = tokio::join!(
        resolver.resolve("example.com"),
        resolver.resolve("example.com"),
        resolver.resolve("example.com"),
    );
    for result in [a, b, c] {
        assert!(matches!(result, Err(ResolveError::Store(StoreError::Unavailable(_)))));
    }
    assert_eq!(source.count(), 1);

    assert!(resolver.resolve("example.com").await.is_err());
    assert_eq!(source.count(), 2);
    assert_eq!(resolver.cache_len(), 0);
}

#[tokio::test]
async fn test_not_found_episode_is_shared_then_retried() {
    let store = common::store(&[]);
    let source = CountingSource::new(store.clone(), Duration::from_millis(50));
    let resolver = ParameterResolver::with_source("dev", source.clone() as SharedSource);

    let (a, b) = tokio::join!(resolver.resolve("example.com"), resolver.resolve("example.com"));
    assert!(matches!(a, Ok(Resolution::NotFound)));
    assert!(matches!(b, Ok(Resolution::NotFound)));
    assert_eq!(source.count(), 1);

    store.put("/dev/example.com/queries/api_key", "abc");
    let resolution = resolver.resolve("example.com").await.unwrap();
    assert_eq!(resolution.parameter().unwrap().queries()["api_key"], "abc");
    assert_eq!(source.count(), 2);
}

#[tokio::test]
async fn test_cancelled_caller_does_not_cancel_resolution() {
    let store = common::store(&[("/dev/example.com/headers/x-key", "k")]);
    let source = CountingSource::new(store, Duration::from_millis(100));
    let resolver = ParameterResolver::with_source("dev", source.clone() as SharedSource);

    let cancelled = tokio::time::timeout(Duration::from_millis(10), resolver.resolve("example.com")).await;
    assert!(cancelled.is_err());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(resolver.cached("example.com").is_some());
    assert_eq!(source.count(), 1);
}

#[tokio::test]
async fn test_distinct_hosts_resolve_independently() {
    let store = common::store(&[
        ("/dev/a.example.com/headers/x-key", "a"),
        ("/dev/b.example.com/headers/x-key", "b"),
    ]);
    let source = CountingSource::new(store, Duration::from_millis(20));
    let resolver = ParameterResolver::with_source("dev", source.clone() as SharedSource);

    let (a, b) = tokio::join!(resolver.resolve("a.example.com"), resolver.resolve("b.example.com"));
    assert_eq!(a.unwrap().parameter().unwrap().headers()["x-key"], "a");
    assert_eq!(b.unwrap().parameter().unwrap().headers()["x-key"], "b");
    assert_eq!(source.count(), 2);
    assert_eq!(resolver.cache_len(), 2);
}
