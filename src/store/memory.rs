//! Process-local store backed by a sharded concurrent map.
//!
//! Expiry is checked lazily on every read and swept periodically by the
//! background purge task. Time is taken from `tokio::time::Instant`, so
//! tests can drive expiry with a paused clock.

use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::time::Instant;
use tracing::trace;

use super::{Store, StoreError, WindowHit};

#[derive(Debug, Clone)]
enum EntryValue {
    Text(String),
    Counter(u64),
}

#[derive(Debug, Clone)]
struct Entry {
    value: EntryValue,
    expires_at: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-memory [`Store`] for single-instance deployments and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();

        // The read guard must be released before removing from the same shard
        let live = match self.entries.get(key) {
            None => return Ok(None),
            Some(entry) if entry.is_expired(now) => None,
            Some(entry) => Some(match &entry.value {
                EntryValue::Text(text) => text.clone(),
                EntryValue::Counter(count) => count.to_string(),
            }),
        };

        if live.is_none() {
            self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        }
        Ok(live)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value: EntryValue::Text(value),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn increment_window(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<WindowHit, StoreError> {
        let now = Instant::now();
        let fresh = || Entry {
            value: EntryValue::Counter(0),
            expires_at: now + window,
        };

        // The shard write lock is held for the whole read-modify-write
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(fresh);
        if entry.is_expired(now) {
            *entry = fresh();
        }

        let count = match &entry.value {
            EntryValue::Counter(count) => count + 1,
            EntryValue::Text(text) => {
                text.parse::<u64>().map_err(|_| {
                    StoreError::Protocol(format!("value at `{key}` is not a counter"))
                })? + 1
            }
        };
        entry.value = EntryValue::Counter(count);

        Ok(WindowHit {
            count,
            reset_after: entry.expires_at.saturating_duration_since(now),
        })
    }

    async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = !entry.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        trace!(removed, "Purged expired in-memory entries");
        removed
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
