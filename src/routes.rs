//! Application routing configuration with middleware stack.
//!
//! # Middleware Stack (outermost first)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │ Request Context  │ ← X-Request-ID, X-Process-Time, request span
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │   Catch Panic    │ ← 500 {"detail": "Internal error"}
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← HTTP request/response logging
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │  Rate Limiting   │ ← 429 if exceeded (every path)
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │  Authentication  │ ← verdict checked by handlers after path validation
//! └────────┬─────────┘
//!          │
//!          ▼
//!      Handler
//! ```
//!
//! # Route Groups
//!
//! - `{API_PREFIX}/now` - Current UTC time
//! - `{API_PREFIX}/VIP/{point_in_time}` - VIP location lookup
//! - unsupported method on a known path - 405 `{"detail": "Method Not Allowed"}`
//! - anything else - 404 `{"detail": "Not Found"}`

use std::any::Any;

use axum::Router;
use axum::http::Response;
use axum::response::IntoResponse;
use axum::routing::get;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::AppError;
use crate::handlers;
use crate::middleware::{ApiKeyAuth, RateLimitLayer, RequestContextLayer};
use crate::state::AppState;

/// Build the application router with all routes and middleware configured.
///
/// # Arguments
///
/// * `state` - Application state containing config and services
///
/// # Returns
///
/// Fully configured Axum router ready to be served.
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    // =========================================================================
    // Versioned API (authenticated)
    // =========================================================================
    let api = Router::new()
        .route("/now", get(handlers::current_time))
        .route("/VIP/{point_in_time}", get(handlers::track_location))
        .method_not_allowed_fallback(method_not_allowed)
        .route_layer(ApiKeyAuth::new(state.settings.clone()));

    info!(
        prefix = %config.api_prefix,
        api_keys = config.api_keys.len(),
        rate_limit = %config.rate_limit,
        store = state.store_backend(),
        "Routes configured"
    );

    // =========================================================================
    // Apply Middleware Stack (order matters - applied bottom to top)
    // =========================================================================
    Router::new()
        .nest(&config.api_prefix, api)
        .fallback(not_found)
        // 1. Rate limiting, in front of routing so every path spends budget
        .layer(RateLimitLayer::new(state.rate_limiter.clone()))
        // 2. Tracing
        .layer(TraceLayer::new_for_http())
        // 3. Panics become a plain 500
        .layer(CatchPanicLayer::custom(handle_panic))
        // 4. Request context, outermost so every response is timed
        .layer(RequestContextLayer::new())
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound("no route matched".to_string())
}

async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response<axum::body::Body> {
    let message = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = message, "Handler panicked");

    AppError::Internal(message.to_string()).into_response()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::store::MemoryStore;

    async fn body_string(response: Response<Body>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn boom() -> &'static str {
        panic!("secret detail")
    }

    #[tokio::test]
    async fn test_panic_is_answered_with_internal_error() {
        let app: Router = Router::new()
            .route("/boom", get(boom))
            .layer(CatchPanicLayer::custom(handle_panic));

        let response = app
            .oneshot(Request::get("/boom").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"detail":"Internal error"}"#);
    }

    #[tokio::test]
    async fn test_unknown_route_without_connect_info() {
        let state = AppState::new(Config::default(), Arc::new(MemoryStore::new())).unwrap();
        let app = build_router(state);

        let response = app
            .oneshot(Request::get("/missing").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key("x-process-time"));
        assert!(response.headers().contains_key("x-ratelimit-limit"));
        assert_eq!(body_string(response).await, r#"{"detail":"Not Found"}"#);
    }

    fn app_with_key(key: &str) -> Router {
        let config = Config {
            api_keys: vec![crate::config::ApiKey::new(key)],
            ..Config::default()
        };
        build_router(AppState::new(config, Arc::new(MemoryStore::new())).unwrap())
    }

    fn get_with(uri: &str, authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::get(uri);
        if let Some(value) = authorization {
            builder = builder.header("authorization", value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_invalid_point_in_time_is_422_whatever_the_credentials() {
        let app = app_with_key("good-key");

        for authorization in [None, Some("Bearer wrong"), Some("Bearer good-key")] {
            let response = app
                .clone()
                .oneshot(get_with("/v1/VIP/-1", authorization))
                .await
                .unwrap();

            assert_eq!(
                response.status(),
                StatusCode::UNPROCESSABLE_ENTITY,
                "{authorization:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_valid_point_in_time_still_requires_credentials() {
        let app = app_with_key("good-key");

        let response = app
            .clone()
            .oneshot(get_with("/v1/VIP/5", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_string(response).await,
            r#"{"detail":"Please provide credentials"}"#
        );

        let response = app
            .oneshot(get_with("/v1/VIP/5", Some("Bearer wrong")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_string(response).await, r#"{"detail":"Unauthorized"}"#);
    }

    #[tokio::test]
    async fn test_unsupported_method_has_detail_body() {
        let app = app_with_key("good-key");

        let response = app
            .oneshot(
                Request::post("/v1/now")
                    .header("authorization", "Bearer good-key")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            body_string(response).await,
            r#"{"detail":"Method Not Allowed"}"#
        );
    }

    #[tokio::test]
    async fn test_api_routes_are_prefixed() {
        let state = AppState::new(Config::default(), Arc::new(MemoryStore::new())).unwrap();
        let app = build_router(state);

        let response = app
            .oneshot(Request::get("/now").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
