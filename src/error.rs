use std::time::Duration;

use axum::http::header::{HeaderValue, RETRY_AFTER, WWW_AUTHENTICATE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use crate::db_client::UpstreamError;
use crate::rate_limit::RateLimit;
use crate::store::StoreError;

/// Header carrying the configured request budget.
pub const RATE_LIMIT_LIMIT_HEADER: &str = "x-ratelimit-limit";
/// Header carrying the requests left in the current window.
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";
/// Header carrying the unix timestamp at which the current window resets.
pub const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";

/// Body returned to callers for 404 upstream misses.
pub const RECORD_NOT_FOUND: &str = "Record not found";

/// Body returned to callers for every other upstream failure.
pub const UPSTREAM_FAILURE: &str = "Cannot access required data, please try later";

/// Body returned for faults that must not leak details.
pub const INTERNAL_ERROR: &str = "Internal error";

/// Application-wide error types with appropriate HTTP status codes.
///
/// Every variant is translated into a fixed status and a `{"detail": ...}`
/// body at the HTTP boundary. Anything carrying internal context
/// (`Store`, `Internal`, `Config`, non-404 upstream failures) is logged in
/// full and answered with a generic message.
#[derive(Error, Debug)]
pub enum AppError {
    /// No `Authorization` header, or not a well-formed bearer credential.
    #[error("Missing or malformed credentials")]
    Authentication,

    /// Well-formed bearer credential that is not an accepted API key.
    #[error("Credential is not an accepted API key")]
    Authorization,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Rate limit exceeded: {limit}")]
    RateLimitExceeded {
        limit: RateLimit,
        /// Time left until the caller's window resets.
        retry_after: Duration,
    },

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Error response body for API endpoints.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub detail: String,
}

impl ErrorDetail {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

impl AppError {
    /// HTTP status this error is answered with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Authentication | AppError::Authorization => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Upstream(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Upstream(_)
            | AppError::Store(_)
            | AppError::Internal(_)
            | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Caller-facing message. Never contains internal details.
    fn detail(&self) -> String {
        match self {
            AppError::Authentication => "Please provide credentials".to_string(),
            AppError::Authorization => "Unauthorized".to_string(),
            AppError::Validation(msg) => msg.clone(),
            AppError::RateLimitExceeded { limit, .. } => format!("Rate limit exceeded: {limit}"),
            AppError::Upstream(e) if e.is_not_found() => RECORD_NOT_FOUND.to_string(),
            AppError::Upstream(_) => UPSTREAM_FAILURE.to_string(),
            AppError::NotFound(_) => "Not Found".to_string(),
            AppError::MethodNotAllowed => "Method Not Allowed".to_string(),
            AppError::Store(_) | AppError::Internal(_) | AppError::Config(_) => {
                INTERNAL_ERROR.to_string()
            }
        }
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        match self {
            AppError::Authentication | AppError::Authorization => {
                headers.insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            }
            AppError::RateLimitExceeded { limit, retry_after } => {
                let retry_secs = retry_after_secs(*retry_after);
                let reset_at = Utc::now().timestamp() + retry_secs as i64;
                headers.insert(RETRY_AFTER, HeaderValue::from(retry_secs));
                headers.insert(RATE_LIMIT_LIMIT_HEADER, HeaderValue::from(limit.amount));
                headers.insert(RATE_LIMIT_REMAINING_HEADER, HeaderValue::from(0u32));
                headers.insert(RATE_LIMIT_RESET_HEADER, HeaderValue::from(reset_at));
            }
            _ => {}
        }
        headers
    }
}

/// Whole seconds a rejected caller should wait, never less than one.
pub fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
    secs.max(1)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Log the full error server-side; only the sanitized detail goes out
        if status.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (
            status,
            self.headers(),
            axum::Json(ErrorDetail::new(self.detail())),
        )
            .into_response()
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::rate_limit::Period;

    #[test]
    fn test_auth_errors_are_unauthorized() {
        assert_eq!(
            AppError::Authentication.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::Authorization.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::Authentication.detail(), "Please provide credentials");
        assert_eq!(AppError::Authorization.detail(), "Unauthorized");
    }

    #[test]
    fn test_upstream_not_found_maps_to_404() {
        let err = AppError::from(UpstreamError::Status(StatusCode::NOT_FOUND));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.detail(), RECORD_NOT_FOUND);
    }

    #[test]
    fn test_other_upstream_failures_map_to_500() {
        let err = AppError::from(UpstreamError::Status(StatusCode::BAD_GATEWAY));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.detail(), UPSTREAM_FAILURE);

        let err = AppError::from(UpstreamError::InvalidData("missing field".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.detail(), UPSTREAM_FAILURE);
    }

    #[test]
    fn test_internal_details_are_not_exposed() {
        let err = AppError::Internal("connection string redis://secret".to_string());
        assert_eq!(err.detail(), INTERNAL_ERROR);
    }

    #[test]
    fn test_rate_limit_response_headers() {
        let err = AppError::RateLimitExceeded {
            limit: RateLimit::new(1, 1, Period::Minute).unwrap(),
            retry_after: Duration::from_millis(1500),
        };
        assert_eq!(err.detail(), "Rate limit exceeded: 1 per 1 minute");

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[RETRY_AFTER], "2");
        assert_eq!(response.headers()[RATE_LIMIT_LIMIT_HEADER], "1");
        assert_eq!(response.headers()[RATE_LIMIT_REMAINING_HEADER], "0");
    }

    #[test]
    fn test_retry_after_is_at_least_one_second() {
        assert_eq!(retry_after_secs(Duration::ZERO), 1);
        assert_eq!(retry_after_secs(Duration::from_millis(10)), 1);
        assert_eq!(retry_after_secs(Duration::from_secs(59)), 59);
    }
}
