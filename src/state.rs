//! Shared application state for Axum handlers.
//!
//! This module provides thread-safe, clonable state that is shared across
//! all request handlers. It includes:
//!
//! - **Configuration**: immutable startup config and the live settings handle
//! - **Store**: the backend shared by the response cache and the rate limiter
//! - **Services**: location lookups and the rate limiter
//! - **Clock**: injectable time source for `/v1/now`
//!
//! # Structured Concurrency
//!
//! The in-memory store is swept by a background task managed with
//! `tokio_util::task::TaskTracker` and `CancellationToken`. Call
//! `shutdown()` to stop it before application exit.

use std::sync::Arc;

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::db_client::DbServerClient;
use crate::error::{AppError, AppResult};
use crate::rate_limit::RateLimiter;
use crate::services::LocationService;
use crate::settings::SettingsHandle;
use crate::store::Store;

/// Shared application state for Axum handlers.
///
/// This struct is cloned for each request handler. All internal data
/// is wrapped in `Arc` for efficient sharing.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Live API keys and rate-limit budget
    pub settings: SettingsHandle,
    /// Location lookups (cache + DB server)
    pub locations: LocationService,
    /// Global per-caller rate limiter
    pub rate_limiter: RateLimiter,
    /// Time source for `/v1/now`
    pub clock: Arc<dyn Clock>,
    store: Arc<dyn Store>,
    /// Tracks spawned background tasks for graceful shutdown
    task_tracker: TaskTracker,
    /// Cancellation token for signaling background tasks to stop
    cancellation_token: CancellationToken,
}

impl AppState {
    /// Create application state over an already connected store.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the DB server client cannot be built.
    pub fn new(config: Config, store: Arc<dyn Store>) -> AppResult<Self> {
        let client = DbServerClient::from_config(&config)
            .map_err(|e| AppError::Config(format!("Failed to build DB server client: {e}")))?;
        let settings = SettingsHandle::from_config(&config);

        Ok(Self {
            locations: LocationService::new(client, store.clone()),
            rate_limiter: RateLimiter::new(store.clone(), settings.clone()),
            settings,
            clock: Arc::new(SystemClock),
            store,
            config: Arc::new(config),
            task_tracker: TaskTracker::new(),
            cancellation_token: CancellationToken::new(),
        })
    }

    /// Replace the time source, e.g. with a frozen clock in tests.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Name of the active store backend.
    pub fn store_backend(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Spawn the periodic sweep of expired store entries.
    ///
    /// The task is tracked by `task_tracker` and respects
    /// `cancellation_token` for graceful shutdown.
    pub fn spawn_purge_task(&self) {
        let store = self.store.clone();
        let period = self.config.store_purge_interval;
        let cancel = self.cancellation_token.clone();

        self.task_tracker.spawn(async move {
            let mut ticker = interval(period);
            ticker.tick().await; // Skip the first immediate tick

            loop {
                tokio::select! {
                    biased; // Check cancellation first

                    _ = cancel.cancelled() => {
                        debug!("Store purge task received cancellation signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = store.purge_expired().await;
                        if removed > 0 {
                            debug!(removed, "Purged expired store entries");
                        }
                    }
                }
            }

            debug!("Store purge task shutting down");
        });
    }

    /// Gracefully shutdown all background tasks.
    ///
    /// This method:
    /// 1. Signals all tasks to stop via cancellation token
    /// 2. Closes the task tracker (prevents new tasks)
    /// 3. Waits for all tasks to complete
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown of background tasks");

        self.cancellation_token.cancel();
        self.task_tracker.close();
        self.task_tracker.wait().await;

        info!("All background tasks have completed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test(start_paused = true)]
    async fn test_purge_task_sweeps_and_stops() {
        let store = Arc::new(MemoryStore::new());
        let config = Config {
            store_purge_interval: Duration::from_secs(10),
            ..Config::default()
        };
        let state = AppState::new(config, store.clone()).unwrap();

        store
            .set("k", "v".to_string(), Duration::from_secs(1))
            .await
            .unwrap();
        state.spawn_purge_task();

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert!(store.is_empty());

        state.shutdown().await;
    }

    #[test]
    fn test_store_backend_name() {
        let state = AppState::new(Config::default(), Arc::new(MemoryStore::new())).unwrap();
        assert_eq!(state.store_backend(), "memory");
    }
}
