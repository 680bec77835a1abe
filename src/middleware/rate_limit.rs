//! Rate limiting middleware applied to every route.
//!
//! # Algorithm
//!
//! Fixed window per caller identity, see [`crate::rate_limit`]. The layer
//! runs before routing and authentication, so unauthenticated and unknown
//! paths spend budget too.
//!
//! # Response Headers
//!
//! On admitted requests:
//! - `X-RateLimit-Limit`: Requests allowed per window
//! - `X-RateLimit-Remaining`: Requests left in the current window
//! - `X-RateLimit-Reset`: Unix time at which the window resets
//!
//! On rate limit exceeded (429), additionally:
//! - `Retry-After`: Seconds until the next request will be accepted

use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::header::HeaderValue;
use axum::http::{Request, Response};
use axum::response::IntoResponse;
use chrono::Utc;
use tower::{Layer, Service};
use tracing::warn;

use super::identity::CallerIdentity;
use crate::error::{
    AppError, RATE_LIMIT_LIMIT_HEADER, RATE_LIMIT_REMAINING_HEADER, RATE_LIMIT_RESET_HEADER,
    retry_after_secs,
};
use crate::metrics::record_rate_limited;
use crate::rate_limit::{RateLimitStatus, RateLimiter};

/// Rate limiting layer for Tower middleware stack.
///
/// # Example
///
/// ```rust,ignore
/// let limiter = RateLimiter::new(store, settings);
/// let app = Router::new()
///     .route("/api", get(handler))
///     .layer(RateLimitLayer::new(limiter));
/// ```
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: RateLimiter,
}

impl RateLimitLayer {
    pub fn new(limiter: RateLimiter) -> Self {
        Self { limiter }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: self.limiter.clone(),
        }
    }
}

/// Rate limiting service wrapper.
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: RateLimiter,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let limiter = self.limiter.clone();
        let mut inner = self.inner.clone();

        // Resolve the identity before moving req
        let identity = CallerIdentity::of(&req);
        let source = identity.source();
        let key = identity.key().into_owned();

        Box::pin(async move {
            match limiter.check(&key).await {
                Ok(status) => {
                    let mut response = inner.call(req).await?;
                    insert_status_headers(&mut response, &status);
                    Ok(response)
                }
                Err(err) => {
                    if let AppError::RateLimitExceeded { limit, retry_after } = &err {
                        record_rate_limited();
                        warn!(
                            identity_source = source,
                            path = %req.uri().path(),
                            %limit,
                            retry_after_secs = retry_after_secs(*retry_after),
                            "Rate limit exceeded"
                        );
                    }
                    Ok(err.into_response())
                }
            }
        })
    }
}

fn insert_status_headers(response: &mut Response<Body>, status: &RateLimitStatus) {
    let reset_at = Utc::now().timestamp() + status.reset_after.as_secs() as i64;
    let headers = response.headers_mut();
    headers.insert(
        RATE_LIMIT_LIMIT_HEADER,
        HeaderValue::from(status.limit.amount),
    );
    headers.insert(
        RATE_LIMIT_REMAINING_HEADER,
        HeaderValue::from(status.remaining),
    );
    headers.insert(RATE_LIMIT_RESET_HEADER, HeaderValue::from(reset_at));
}
