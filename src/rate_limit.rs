//! Fixed-window rate limiting keyed by caller identity.
//!
//! # Budget Format
//!
//! Budgets are written the way operators usually write them:
//!
//! ```text
//! 200/minute      10 per second      100/5 minutes      1000 per 1 day
//! ```
//!
//! # Algorithm
//!
//! Each caller identity owns one bucket per budget. The first request
//! opens a window of `multiples * period`; every request increments the
//! bucket's counter and is rejected once the counter exceeds `amount`.
//! When the window elapses the bucket starts over from zero.
//!
//! The budget is read from [`SettingsHandle`] on every check, so changing it
//! at runtime takes effect on the next request. The bucket key embeds the
//! budget, which means a new budget starts with fresh buckets.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::settings::SettingsHandle;
use crate::store::Store;

/// Unit of a rate-limit window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    Second,
    Minute,
    Hour,
    Day,
}

impl Period {
    pub fn as_secs(self) -> u64 {
        match self {
            Period::Second => 1,
            Period::Minute => 60,
            Period::Hour => 60 * 60,
            Period::Day => 24 * 60 * 60,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Period::Second => "second",
            Period::Minute => "minute",
            Period::Hour => "hour",
            Period::Day => "day",
        }
    }
}

impl FromStr for Period {
    type Err = RateLimitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unit = s.trim().to_ascii_lowercase();
        let singular = unit.strip_suffix('s').unwrap_or(&unit);
        match singular {
            "second" => Ok(Period::Second),
            "minute" => Ok(Period::Minute),
            "hour" => Ok(Period::Hour),
            "day" => Ok(Period::Day),
            _ => Err(RateLimitParseError::UnknownPeriod(s.trim().to_string())),
        }
    }
}

/// Why a budget string was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RateLimitParseError {
    #[error("expected `N/period` or `N per period`, got `{0}`")]
    Malformed(String),

    #[error("invalid request count `{0}`")]
    InvalidAmount(String),

    #[error("invalid period multiplier `{0}`")]
    InvalidMultiples(String),

    #[error("unknown period `{0}` (expected second, minute, hour or day)")]
    UnknownPeriod(String),
}

/// A request budget: `amount` requests per `multiples` x `period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RateLimit {
    pub amount: u32,
    pub multiples: u32,
    pub period: Period,
}

impl RateLimit {
    /// Build a budget, rejecting zero counts and zero-length windows.
    pub fn new(amount: u32, multiples: u32, period: Period) -> Result<Self, RateLimitParseError> {
        if amount == 0 {
            return Err(RateLimitParseError::InvalidAmount(amount.to_string()));
        }
        if multiples == 0 {
            return Err(RateLimitParseError::InvalidMultiples(multiples.to_string()));
        }
        Ok(Self {
            amount,
            multiples,
            period,
        })
    }

    /// Length of one window.
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.period.as_secs() * u64::from(self.multiples))
    }

    /// Store key of the bucket owned by `identity` under this budget.
    fn bucket_key(&self, identity: &str) -> String {
        format!(
            "ratelimit/{identity}/{}/{}/{}",
            self.amount,
            self.multiples,
            self.period.as_str()
        )
    }
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} per {} {}",
            self.amount,
            self.multiples,
            self.period.as_str()
        )
    }
}

impl FromStr for RateLimit {
    type Err = RateLimitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lowered = trimmed.to_ascii_lowercase();

        let (amount, window) = lowered
            .split_once('/')
            .or_else(|| lowered.split_once(" per "))
            .ok_or_else(|| RateLimitParseError::Malformed(trimmed.to_string()))?;

        let amount = amount.trim();
        let amount: u32 = amount
            .parse()
            .map_err(|_| RateLimitParseError::InvalidAmount(amount.to_string()))?;

        let mut parts = window.split_whitespace();
        let (multiples, unit) = match (parts.next(), parts.next(), parts.next()) {
            (Some(unit), None, None) => (1, unit),
            (Some(multiples), Some(unit), None) => {
                let multiples = multiples
                    .parse()
                    .map_err(|_| RateLimitParseError::InvalidMultiples(multiples.to_string()))?;
                (multiples, unit)
            }
            _ => return Err(RateLimitParseError::Malformed(trimmed.to_string())),
        };

        RateLimit::new(amount, multiples, unit.parse()?)
    }
}

/// Outcome of an admitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub limit: RateLimit,
    /// Requests still allowed in the current window.
    pub remaining: u32,
    /// Time until the current window resets.
    pub reset_after: Duration,
}

/// Fixed-window limiter over a swappable [`Store`].
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn Store>,
    settings: SettingsHandle,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn Store>, settings: SettingsHandle) -> Self {
        Self { store, settings }
    }

    /// Count one request for `identity` and decide whether it is admitted.
    ///
    /// # Errors
    ///
    /// - `AppError::RateLimitExceeded` once the window's budget is spent
    /// - `AppError::Store` if the bucket store cannot be reached
    pub async fn check(&self, identity: &str) -> AppResult<RateLimitStatus> {
        let limit = self.settings.rate_limit().await;
        let hit = self
            .store
            .increment_window(&limit.bucket_key(identity), limit.window())
            .await?;

        if hit.count > u64::from(limit.amount) {
            debug!(%limit, count = hit.count, "Request over budget");
            return Err(AppError::RateLimitExceeded {
                limit,
                retry_after: hit.reset_after,
            });
        }

        let remaining = u64::from(limit.amount).saturating_sub(hit.count);
        Ok(RateLimitStatus {
            limit,
            remaining: u32::try_from(remaining).unwrap_or(u32::MAX),
            reset_after: hit.reset_after,
        })
    }
}
