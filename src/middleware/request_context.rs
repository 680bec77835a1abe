//! Per-request correlation id, lifecycle logging and timing.
//!
//! # Features
//!
//! - Accepts a client-supplied `X-Request-ID` or generates a UUIDv4
//! - Runs the request inside a tracing span carrying `request_id` and
//!   `path`, so every event logged while handling it is correlated
//! - Logs `request.start` and `request.end` (status, process time)
//! - Adds `X-Request-ID` and `X-Process-Time` (seconds) to every response
//!
//! # Client Usage
//!
//! ```bash
//! curl -H "X-Request-ID: my-correlation-id" http://localhost:8000/v1/now
//! ```

use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::Body;
use axum::http::header::HeaderValue;
use axum::http::{Request, Response};
use tower::{Layer, Service};
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::metrics::record_request_duration;

/// Header name for the correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Header name for the processing time, in seconds.
pub const PROCESS_TIME_HEADER: &str = "x-process-time";

/// Longest client-supplied request id that is accepted as-is.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Request context layer for Tower middleware stack.
#[derive(Clone, Default)]
pub struct RequestContextLayer;

impl RequestContextLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestContextLayer {
    type Service = RequestContextService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestContextService { inner }
    }
}

/// Request context service wrapper.
#[derive(Clone)]
pub struct RequestContextService<S> {
    inner: S,
}

// Generic over the response body: this layer sits outside tracing and
// panic recovery, which both wrap the body type.
impl<S, ResBody> Service<Request<Body>> for RequestContextService<S>
where
    S: Service<Request<Body>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let request_id = extract_or_generate_request_id(&req);
        let request_id_value = HeaderValue::from_str(&request_id).ok();

        // Make the id visible to handlers as well
        if let Some(value) = &request_id_value {
            req.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
        }

        let method = req.method().clone();
        let span = info_span!(
            "request",
            request_id = %request_id,
            method = %method,
            path = %req.uri().path(),
        );

        let mut inner = self.inner.clone();

        Box::pin(
            async move {
                let user_agent = req
                    .headers()
                    .get(axum::http::header::USER_AGENT)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                info!(user_agent = %user_agent, "request.start");
                let started = Instant::now();

                let mut response = inner.call(req).await?;

                let process_time = started.elapsed().as_secs_f64();
                let status = response.status().as_u16();
                info!(status_code = status, process_time, "request.end");
                record_request_duration(method.as_str(), status, process_time);

                let headers = response.headers_mut();
                if let Ok(value) = HeaderValue::from_str(&process_time.to_string()) {
                    headers.insert(PROCESS_TIME_HEADER, value);
                }
                if let Some(value) = request_id_value {
                    headers.insert(REQUEST_ID_HEADER, value);
                }

                Ok(response)
            }
            .instrument(span),
        )
    }
}

/// Extract request ID from headers or generate a new one.
fn extract_or_generate_request_id<B>(req: &Request<B>) -> String {
    if let Some(header_value) = req.headers().get(REQUEST_ID_HEADER)
        && let Ok(value) = header_value.to_str()
        && !value.is_empty()
        && value.len() <= MAX_REQUEST_ID_LEN
    {
        return value.to_string();
    }

    Uuid::new_v4().to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_existing_request_id() {
        let req = Request::builder()
            .header("x-request-id", "existing-id-123")
            .body(Body::empty())
            .unwrap();

        assert_eq!(extract_or_generate_request_id(&req), "existing-id-123");
    }

    #[test]
    fn test_generate_new_request_id() {
        let req = Request::builder().body(Body::empty()).unwrap();

        let id = extract_or_generate_request_id(&req);

        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_oversized_request_id_is_replaced() {
        let req = Request::builder()
            .header("x-request-id", "a".repeat(MAX_REQUEST_ID_LEN + 1))
            .body(Body::empty())
            .unwrap();

        let id = extract_or_generate_request_id(&req);
        assert!(Uuid::parse_str(&id).is_ok());
    }
}
