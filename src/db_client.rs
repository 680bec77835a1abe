//! HTTP client for the upstream DB server.
//!
//! # Contract
//!
//! `GET <DB_SERVER_URL>/<point_in_time>` answers with
//! `{"latitude": .., "longitude": ..}`. The server is treated as untrusted:
//!
//! | Outcome                          | Result                          |
//! |----------------------------------|---------------------------------|
//! | connect error, timeout, reset    | `UpstreamError::Unavailable`    |
//! | non-2xx status                   | `UpstreamError::Status(code)`   |
//! | 2xx with a body we cannot accept | `UpstreamError::InvalidData`    |
//!
//! Requests are bounded by `DB_SERVER_TIMEOUT_SECS` and never retried.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::models::DbCoordinates;

/// Failure fetching a location from the DB server.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The request never produced a response (network error or timeout).
    #[error("DB server unavailable: {0}")]
    Unavailable(#[source] reqwest::Error),

    #[error("DB server responded with status {0}")]
    Status(StatusCode),

    /// A 2xx response whose payload is not a valid coordinate pair.
    #[error("DB server returned invalid data: {0}")]
    InvalidData(String),
}

impl UpstreamError {
    /// Whether the DB server reported that no record exists.
    pub fn is_not_found(&self) -> bool {
        matches!(self, UpstreamError::Status(StatusCode::NOT_FOUND))
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Unavailable(_) => "unavailable",
            UpstreamError::Status(StatusCode::NOT_FOUND) => "not_found",
            UpstreamError::Status(_) => "http_error",
            UpstreamError::InvalidData(_) => "invalid_data",
        }
    }
}

/// Client for the DB server, cheap to clone.
#[derive(Debug, Clone)]
pub struct DbServerClient {
    http: Client,
    base_url: String,
}

impl DbServerClient {
    /// Build a client whose every request is bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Fails only if the TLS backend cannot be initialised.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(config.db_server_url.clone(), config.db_server_timeout)
    }

    fn location_url(&self, point_in_time: u64) -> String {
        format!("{}/{point_in_time}", self.base_url)
    }

    /// Fetch the coordinates recorded at `point_in_time`.
    #[instrument(skip(self))]
    pub async fn fetch_location(&self, point_in_time: u64) -> Result<DbCoordinates, UpstreamError> {
        let response = self
            .http
            .get(self.location_url(point_in_time))
            .send()
            .await
            .map_err(UpstreamError::Unavailable)?;

        let status = response.status();
        if !status.is_success() {
            debug!(status = status.as_u16(), "DB server returned an error status");
            return Err(UpstreamError::Status(status));
        }

        // A body that cannot be read in time is a transport problem, not bad data
        let body = response.bytes().await.map_err(UpstreamError::Unavailable)?;

        serde_json::from_slice(&body).map_err(|e| UpstreamError::InvalidData(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_location_url_strips_trailing_slash() {
        let client = DbServerClient::new("http://db.local/", Duration::from_secs(3)).unwrap();
        assert_eq!(client.location_url(42), "http://db.local/42");
    }

    #[test]
    fn test_not_found_detection() {
        assert!(UpstreamError::Status(StatusCode::NOT_FOUND).is_not_found());
        assert!(!UpstreamError::Status(StatusCode::INTERNAL_SERVER_ERROR).is_not_found());
        assert!(!UpstreamError::InvalidData("x".to_string()).is_not_found());
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(UpstreamError::Status(StatusCode::NOT_FOUND).kind(), "not_found");
        assert_eq!(UpstreamError::Status(StatusCode::BAD_GATEWAY).kind(), "http_error");
        assert_eq!(UpstreamError::InvalidData(String::new()).kind(), "invalid_data");
    }
}
