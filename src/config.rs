//! Application configuration loaded from environment variables.
//!
//! # Configuration Hierarchy
//!
//! All configuration is loaded from environment variables with sensible defaults
//! for development. In production, configure via environment variables or a `.env` file.
//!
//! # Required
//!
//! - `DB_SERVER_URL`: Base URL of the upstream DB server (e.g. `http://db:8080`)
//!
//! # Security Configuration
//!
//! - `API_KEYS`: Comma-separated list of accepted bearer keys. With no keys
//!   configured every request to the API is rejected with 401.
//! - `RATE_LIMIT`: Global per-caller budget (default: `200/minute`)
//!
//! # Storage
//!
//! - `REDIS_URL`: When set, response cache and rate-limit buckets live in
//!   Redis and are shared between instances. Otherwise they are in-process.
//! - `STORE_PURGE_INTERVAL_SECS`: Sweep interval for expired in-process
//!   entries (default: 60)

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;
use tracing_subscriber::EnvFilter;

use crate::error::{AppError, AppResult};
use crate::rate_limit::RateLimit;

/// An accepted API key.
///
/// The key material is only reachable through [`ApiKey::expose`]; `Debug`
/// output is redacted so keys cannot leak through logs.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Raw key material, for comparison only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(**********)")
    }
}

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, colored output for development
    #[default]
    Pretty,
    /// One JSON object per event, for log shippers
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format `{other}` (expected pretty or json)")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogFormat::Pretty => f.write_str("pretty"),
            LogFormat::Json => f.write_str("json"),
        }
    }
}

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.server_addr());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 8000)
    pub port: u16,

    /// Prefix of the versioned API routes (default: "/v1")
    pub api_prefix: String,

    // =========================================================================
    // Security Configuration
    // =========================================================================
    /// Initial set of accepted API keys
    pub api_keys: Vec<ApiKey>,

    /// Initial global per-caller request budget
    pub rate_limit: RateLimit,

    // =========================================================================
    // Upstream DB Server Configuration
    // =========================================================================
    /// Base URL of the DB server; lookups go to `<url>/<point_in_time>`
    pub db_server_url: String,

    /// Hard timeout for a single DB server request (default: 3 seconds)
    pub db_server_timeout: Duration,

    // =========================================================================
    // Storage Configuration
    // =========================================================================
    /// Redis connection string; `None` selects the in-process store
    pub redis_url: Option<String>,

    /// Interval of the expired-entry sweep for the in-process store
    pub store_purge_interval: Duration,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Tracing filter directives from `RUST_LOG` (e.g., "info", "vip_gateway=debug")
    pub log_level: String,

    /// Log output format
    pub log_format: LogFormat,

    /// Port for Prometheus metrics endpoint (default: 9090, 0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DB_SERVER_URL` is missing or any value
    /// fails to parse or validate.
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            // Server
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 8000)?,
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/v1".to_string()),

            // Security
            api_keys: Self::parse_api_keys(),
            rate_limit: Self::parse_env("RATE_LIMIT", Self::default_rate_limit())?,

            // Upstream
            db_server_url: env::var("DB_SERVER_URL")
                .map_err(|_| AppError::Config("DB_SERVER_URL is required".to_string()))?,
            db_server_timeout: Duration::from_secs(Self::parse_env("DB_SERVER_TIMEOUT_SECS", 3)?),

            // Storage
            redis_url: env::var("REDIS_URL").ok().filter(|u| !u.trim().is_empty()),
            store_purge_interval: Duration::from_secs(Self::parse_env(
                "STORE_PURGE_INTERVAL_SECS",
                60,
            )?),

            // Observability
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            log_format: Self::parse_env("LOG_FORMAT", LogFormat::Pretty)?,
            metrics_port: Self::parse_env("METRICS_PORT", 9090)?,
        };

        // Validate configuration before returning
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if validation fails.
    fn validate(&self) -> AppResult<()> {
        let url = Url::parse(&self.db_server_url)
            .map_err(|e| AppError::Config(format!("Invalid DB_SERVER_URL: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::Config(format!(
                "DB_SERVER_URL must use http or https, got `{}`",
                url.scheme()
            )));
        }

        if self.db_server_timeout.is_zero() {
            return Err(AppError::Config(
                "DB_SERVER_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        if self.store_purge_interval.is_zero() {
            return Err(AppError::Config(
                "STORE_PURGE_INTERVAL_SECS must be greater than 0".to_string(),
            ));
        }

        if !self.api_prefix.starts_with('/') || self.api_prefix.ends_with('/') {
            return Err(AppError::Config(format!(
                "API_PREFIX must start with '/' and not end with one, got `{}`",
                self.api_prefix
            )));
        }

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address.
    ///
    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<std::net::SocketAddr> {
        if self.metrics_enabled() {
            Some(std::net::SocketAddr::from((
                [0, 0, 0, 0],
                self.metrics_port,
            )))
        } else {
            None
        }
    }

    /// Build the log filter from [`Config::log_level`].
    ///
    /// Directives that fail to parse fall back to `info`.
    pub fn log_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    }

    fn default_rate_limit() -> RateLimit {
        RateLimit {
            amount: 200,
            multiples: 1,
            period: crate::rate_limit::Period::Minute,
        }
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .parse()
                .map_err(|e| AppError::Config(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    /// Parse accepted API keys from the `API_KEYS` environment variable.
    fn parse_api_keys() -> Vec<ApiKey> {
        env::var("API_KEYS")
            .map(|raw| split_api_keys(&raw))
            .unwrap_or_default()
    }
}

/// Split a comma-separated key list, trimming whitespace and dropping blanks.
pub fn split_api_keys(raw: &str) -> Vec<ApiKey> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(ApiKey::new)
        .collect()
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            api_prefix: "/v1".to_string(),
            api_keys: Vec::new(),
            rate_limit: Self::default_rate_limit(),
            db_server_url: "http://localhost:8080".to_string(),
            db_server_timeout: Duration::from_secs(3),
            redis_url: None,
            store_purge_interval: Duration::from_secs(60),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_port: 9090,
        }
    }
}
