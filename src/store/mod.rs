//! Key-value store shared by the response cache and the rate limiter.
//!
//! # Backends
//!
//! - [`MemoryStore`]: process-local, used when no `REDIS_URL` is configured
//! - [`RedisStore`]: shared between every gateway instance pointed at the
//!   same Redis server
//!
//! Both expose the same capability set, so callers never know which one
//! they are talking to:
//!
//! | Operation          | Used by        |
//! |--------------------|----------------|
//! | `get` / `set`      | response cache |
//! | `increment_window` | rate limiter   |
//! | `purge_expired`    | sweeper task   |

mod memory;
mod redis_store;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::config::Config;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

/// Failure talking to a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Unexpected store reply: {0}")]
    Protocol(String),
}

/// Counter state after one increment of a fixed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHit {
    /// Number of hits recorded in the current window, including this one.
    pub count: u64,
    /// Time left until the window resets.
    pub reset_after: Duration,
}

/// Capability interface over a TTL-aware key-value store.
///
/// Implementations must be safe for concurrent use; in particular
/// `increment_window` must be an atomic increment-and-read so that
/// concurrent requests from one caller are never undercounted.
#[async_trait]
pub trait Store: Send + Sync {
    /// Get a live value. Expired entries read as `None`.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Insert or replace a value that expires after `ttl`.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError>;

    /// Atomically count one hit in the window stored at `key`.
    ///
    /// A missing or elapsed window is restarted with a fresh expiry of
    /// `window` before counting.
    async fn increment_window(&self, key: &str, window: Duration)
    -> Result<WindowHit, StoreError>;

    /// Drop expired entries, returning how many were removed.
    ///
    /// Backends with native expiry return `0`.
    async fn purge_expired(&self) -> usize;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}

/// Build the store selected by configuration.
///
/// # Errors
///
/// Returns `StoreError` if `REDIS_URL` is set but the server cannot be
/// reached.
pub async fn connect(config: &Config) -> Result<Arc<dyn Store>, StoreError> {
    match config.redis_url.as_deref() {
        Some(url) => {
            let store = RedisStore::connect(url).await?;
            info!("Using Redis store for cache and rate limits");
            Ok(Arc::new(store))
        }
        None => {
            info!("REDIS_URL not set, using in-memory store for cache and rate limits");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
