//! HTTP middleware for request gating and observability.
//!
//! # Architecture
//!
//! ```text
//! Request → Request Context → Catch Panic → Trace → Rate Limiter → Router → Auth → Handler
//!                ↓                 ↓                       ↓                   ↓
//!     X-Request-ID, X-Process-Time   500              429 Too Many       401 Unauthorized
//! ```
//!
//! The rate limiter wraps the whole router, so it governs every path
//! uniformly. Authentication is a route layer on the versioned API only;
//! handlers enforce its verdict through the [`Authenticated`] extractor,
//! after their path parameters have been validated.

pub mod auth;
pub mod identity;
pub mod rate_limit;
pub mod request_context;

pub use auth::{ApiKeyAuth, Authenticated};
pub use identity::{CallerIdentity, FALLBACK_IDENTITY};
pub use rate_limit::RateLimitLayer;
pub use request_context::{PROCESS_TIME_HEADER, REQUEST_ID_HEADER, RequestContextLayer};
