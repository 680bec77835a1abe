//! Redis store tests using testcontainers.
//!
//! These tests spin up a Redis container, so they need a Docker daemon and
//! are ignored by default.
//!
//! Run with: `cargo test --test redis_store_tests -- --ignored`
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage};
use tokio::time::sleep;

use vip_gateway::store::{RedisStore, Store};

/// Redis container configuration
struct RedisContainer;

impl RedisContainer {
    const IMAGE: &'static str = "redis";
    const TAG: &'static str = "7-alpine";
    const PORT: u16 = 6379;

    /// Start a Redis container and return a store connected to it
    async fn start() -> (ContainerAsync<GenericImage>, RedisStore) {
        let container = GenericImage::new(Self::IMAGE, Self::TAG)
            .with_exposed_port(Self::PORT.tcp())
            .with_wait_for(WaitFor::message_on_stdout("Ready to accept connections"))
            .start()
            .await
            .expect("Failed to start Redis container");

        let port = container
            .get_host_port_ipv4(Self::PORT)
            .await
            .expect("Failed to get Redis port");

        let store = RedisStore::connect(&format!("redis://127.0.0.1:{port}"))
            .await
            .expect("Failed to connect to Redis");

        (container, store)
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_set_and_get_with_ttl() {
    let (_container, store) = RedisContainer::start().await;

    store
        .set("cache:location:1", "cached".to_string(), Duration::from_millis(500))
        .await
        .unwrap();
    assert_eq!(
        store.get("cache:location:1").await.unwrap().as_deref(),
        Some("cached")
    );

    sleep(Duration::from_millis(800)).await;
    assert_eq!(store.get("cache:location:1").await.unwrap(), None);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_increment_window_counts_and_resets() {
    let (_container, store) = RedisContainer::start().await;
    let window = Duration::from_secs(1);

    let first = store.increment_window("ratelimit/a", window).await.unwrap();
    let second = store.increment_window("ratelimit/a", window).await.unwrap();
    assert_eq!(first.count, 1);
    assert_eq!(second.count, 2);
    assert!(second.reset_after <= window);

    sleep(Duration::from_millis(1200)).await;
    let after_reset = store.increment_window("ratelimit/a", window).await.unwrap();
    assert_eq!(after_reset.count, 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_concurrent_increments_are_atomic() {
    let (_container, store) = RedisContainer::start().await;
    let store = Arc::new(store);

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .increment_window("ratelimit/burst", Duration::from_secs(60))
                    .await
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let last = store
        .increment_window("ratelimit/burst", Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(last.count, 51);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_backend_name() {
    let (_container, store) = RedisContainer::start().await;
    assert_eq!(store.backend_name(), "redis");
    assert_eq!(store.purge_expired().await, 0);
}
