//! Redis-backed store shared across gateway instances.
//!
//! Values are written with `SET .. PX` so Redis handles expiry itself.
//! Window increments run as a single Lua script, which makes the
//! increment, the first-hit expiry and the TTL read one atomic step on the
//! server.

use std::time::Duration;

use async_trait::async_trait;
use redis::Script;
use redis::aio::ConnectionManager;
use tracing::{debug, warn};

use super::{Store, StoreError, WindowHit};

/// Prefix applied to every key this gateway writes.
pub const KEY_PREFIX: &str = "vip-gateway:";

/// `KEYS[1]` = bucket, `ARGV[1]` = window in milliseconds.
/// Returns `{count, pttl}`.
const INCREMENT_WINDOW_SCRIPT: &str = r"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
local ttl = redis.call('PTTL', KEYS[1])
if ttl < 0 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
    ttl = tonumber(ARGV[1])
end
return {count, ttl}
";

/// [`Store`] implementation over a Redis connection manager.
///
/// The connection manager reconnects on its own; cloning it is cheap and
/// every operation works on its own clone.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    increment_script: Script,
}

impl RedisStore {
    /// Connect to `url` and verify the server answers `PING`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).inspect_err(|e| {
            warn!(error = %e, "Invalid Redis URL");
        })?;

        let connection = ConnectionManager::new(client).await.inspect_err(|e| {
            warn!(error = %e, "Failed to connect to Redis");
        })?;

        let mut conn = connection.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong != "PONG" {
            return Err(StoreError::Protocol(format!("unexpected PING reply `{pong}`")));
        }
        debug!("Redis store connected");

        Ok(Self {
            connection,
            increment_script: Script::new(INCREMENT_WINDOW_SCRIPT),
        })
    }

    fn namespaced(key: &str) -> String {
        format!("{KEY_PREFIX}{key}")
    }
}

/// Milliseconds for a Redis expiry argument, never zero.
fn expiry_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis())
        .unwrap_or(u64::MAX)
        .max(1)
}

#[async_trait]
impl Store for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection.clone();
        let value: Option<String> = redis::cmd("GET")
            .arg(Self::namespaced(key))
            .query_async(&mut conn)
            .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let _: () = redis::cmd("SET")
            .arg(Self::namespaced(key))
            .arg(value)
            .arg("PX")
            .arg(expiry_millis(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn increment_window(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<WindowHit, StoreError> {
        let mut conn = self.connection.clone();
        let (count, ttl_ms): (u64, i64) = self
            .increment_script
            .key(Self::namespaced(key))
            .arg(expiry_millis(window))
            .invoke_async(&mut conn)
            .await?;

        let ttl_ms = u64::try_from(ttl_ms)
            .map_err(|_| StoreError::Protocol(format!("negative TTL {ttl_ms} for `{key}`")))?;

        Ok(WindowHit {
            count,
            reset_after: Duration::from_millis(ttl_ms),
        })
    }

    async fn purge_expired(&self) -> usize {
        // Redis expires keys natively
        0
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_namespaced() {
        assert_eq!(
            RedisStore::namespaced("location:1"),
            "vip-gateway:location:1"
        );
    }

    #[test]
    fn test_expiry_millis_is_never_zero() {
        assert_eq!(expiry_millis(Duration::ZERO), 1);
        assert_eq!(expiry_millis(Duration::from_secs(300)), 300_000);
    }
}
