//! # VIP Gateway
//!
//! An authenticated HTTP gateway in front of the VIP location database,
//! featuring:
//!
//! - **Security**: bearer API keys checked in constant time
//! - **Fairness**: fixed-window rate limiting per caller, live budget
//! - **Efficiency**: five minute response cache for location lookups
//! - **Observability**: request ids, process time, structured logging, metrics
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Middleware (Context → Panic → Trace → Rate Limit → Auth)   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (now, VIP location)                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Services (LocationService → ResponseCache)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Store (memory | Redis)        DbServerClient (reqwest)     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vip_gateway::{AppState, Config, build_router, store};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let store = store::connect(&config).await?;
//!
//!     let state = AppState::new(config, store)?;
//!     let app = build_router(state);
//!
//!     // Start the server...
//!     Ok(())
//! }
//! ```
//!
//! ## Security Configuration
//!
//! ```bash
//! API_KEYS=key-one,key-two RATE_LIMIT="200/minute" \
//!     DB_SERVER_URL=http://localhost:8080 cargo run
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod db_client;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod routes;
pub mod services;
pub mod settings;
pub mod state;
pub mod store;
pub mod utils;
pub mod validation;

// Re-exports for convenience
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ApiKey, Config, LogFormat};
pub use error::{AppError, AppResult};
pub use rate_limit::{RateLimit, RateLimiter};
pub use routes::build_router;
pub use settings::SettingsHandle;
pub use state::AppState;
