//! Runtime-adjustable settings shared by the auth gate and the rate limiter.
//!
//! [`Config`] is loaded once and never changes. The accepted API keys and
//! the rate-limit budget, however, are read on every request through a
//! [`SettingsHandle`], so operators (and tests) can swap them without a
//! restart.

use std::sync::Arc;

use subtle::ConstantTimeEq;
use tokio::sync::RwLock;

use crate::config::{ApiKey, Config};
use crate::rate_limit::RateLimit;

#[derive(Debug)]
struct GatewaySettings {
    api_keys: Vec<ApiKey>,
    rate_limit: RateLimit,
}

/// Cloneable handle to the mutable gateway settings.
#[derive(Debug, Clone)]
pub struct SettingsHandle {
    inner: Arc<RwLock<GatewaySettings>>,
}

impl SettingsHandle {
    pub fn new(api_keys: Vec<ApiKey>, rate_limit: RateLimit) -> Self {
        Self {
            inner: Arc::new(RwLock::new(GatewaySettings {
                api_keys,
                rate_limit,
            })),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.api_keys.clone(), config.rate_limit)
    }

    /// Check whether `candidate` is an accepted API key.
    ///
    /// Every configured key is compared in constant time, and the scan
    /// never stops early, so timing reveals neither the key nor its
    /// position in the list.
    pub async fn contains_key(&self, candidate: &str) -> bool {
        let settings = self.inner.read().await;
        settings
            .api_keys
            .iter()
            .fold(false, |found, key| found | constant_time_eq(candidate, key.expose()))
    }

    /// Current rate-limit budget.
    pub async fn rate_limit(&self) -> RateLimit {
        self.inner.read().await.rate_limit
    }

    pub async fn set_rate_limit(&self, rate_limit: RateLimit) {
        self.inner.write().await.rate_limit = rate_limit;
    }

    pub async fn set_api_keys(&self, api_keys: Vec<ApiKey>) {
        self.inner.write().await.api_keys = api_keys;
    }
}

/// Perform constant-time comparison of two strings.
fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
