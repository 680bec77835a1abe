//! Response cache with a fixed time-to-live.
//!
//! # Semantics
//!
//! - Hit: the stored value is returned and `compute` is not called
//! - Miss or expired: `compute` runs once; `Ok` values are stored, errors
//!   are returned as-is and leave nothing behind
//! - No single-flight: concurrent misses on one key each run `compute`
//!
//! The cache never turns a working request into a failing one. Backend
//! errors and undecodable entries are logged and treated as misses, and a
//! failed write still returns the freshly computed value.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::metrics::names;
use crate::store::Store;

/// Time-to-live of cached location lookups.
pub const LOCATION_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// JSON-serialising cache in front of a [`Store`].
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn Store>,
    namespace: &'static str,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn Store>, namespace: &'static str, ttl: Duration) -> Self {
        Self {
            store,
            namespace,
            ttl,
        }
    }

    fn entry_key(&self, key: &str) -> String {
        format!("cache:{}:{key}", self.namespace)
    }

    /// Return the cached value for `key`, or compute and cache it.
    pub async fn get_or_compute<T, E, F, Fut>(&self, key: &str, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let entry_key = self.entry_key(key);

        if let Some(value) = self.lookup::<T>(&entry_key).await {
            counter!(names::CACHE_LOOKUPS_TOTAL, "namespace" => self.namespace, "result" => "hit")
                .increment(1);
            debug!(key = %entry_key, "Cache hit");
            return Ok(value);
        }

        counter!(names::CACHE_LOOKUPS_TOTAL, "namespace" => self.namespace, "result" => "miss")
            .increment(1);
        debug!(key = %entry_key, "Cache miss");

        let value = compute().await?;
        self.store_value(&entry_key, &value).await;
        Ok(value)
    }

    async fn lookup<T: DeserializeOwned>(&self, entry_key: &str) -> Option<T> {
        let raw = match self.store.get(entry_key).await {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, key = %entry_key, "Cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, key = %entry_key, "Undecodable cache entry, treating as miss");
                None
            }
        }
    }

    async fn store_value<T: Serialize>(&self, entry_key: &str, value: &T) {
        let encoded = match serde_json::to_string(value) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(error = %e, key = %entry_key, "Failed to encode value for cache");
                return;
            }
        };

        if let Err(e) = self.store.set(entry_key, encoded, self.ttl).await {
            warn!(error = %e, key = %entry_key, "Cache write failed");
        }
    }
}
