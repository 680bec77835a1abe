//! Current time endpoint.
//!
//! # Endpoints
//!
//! - `GET /v1/now` - Current UTC time at second precision

use axum::Json;
use axum::extract::State;
use tracing::instrument;

use crate::clock::iso8601_seconds;
use crate::middleware::Authenticated;
use crate::models::CurrentTime;
use crate::state::AppState;

/// Report the current UTC time.
///
/// # Response Body
///
/// ```json
/// { "now": "2022-08-11T10:18:23+00:00" }
/// ```
#[instrument(skip_all)]
pub async fn current_time(State(state): State<AppState>, _: Authenticated) -> Json<CurrentTime> {
    Json(CurrentTime {
        now: iso8601_seconds(state.clock.now()),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Utc};

    use super::*;
    use crate::clock::FixedClock;
    use crate::config::Config;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_current_time_uses_state_clock() {
        let at = DateTime::parse_from_rfc3339("2022-08-11T10:18:23Z")
            .unwrap()
            .with_timezone(&Utc);
        let state = AppState::new(Config::default(), Arc::new(MemoryStore::new()))
            .unwrap()
            .with_clock(FixedClock(at));

        let Json(body) = current_time(State(state), Authenticated).await;
        assert_eq!(body.now, "2022-08-11T10:18:23+00:00");
    }
}
