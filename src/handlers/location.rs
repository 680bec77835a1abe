//! VIP location endpoint.
//!
//! # Endpoints
//!
//! - `GET /v1/VIP/{point_in_time}` - GPS coordinates of the VIP at a point in time
//!
//! # Failures
//!
//! | Condition                            | Status |
//! |--------------------------------------|--------|
//! | `point_in_time` not a positive integer | 422, whatever the credentials |
//! | missing or unknown API key           | 401    |
//! | DB server has no record              | 404    |
//! | DB server unreachable or misbehaving | 500    |

use axum::Json;
use axum::extract::State;
use tracing::instrument;

use crate::error::AppResult;
use crate::middleware::Authenticated;
use crate::models::Location;
use crate::state::AppState;
use crate::validation::PointInTime;

/// Look up where the VIP was at `point_in_time`.
///
/// # Response Body
///
/// ```json
/// {
///   "source": "vip-db",
///   "gpsCoords": { "lat": 1.0, "long": 2.0 }
/// }
/// ```
#[instrument(skip_all, fields(point_in_time = %point_in_time))]
pub async fn track_location(
    State(state): State<AppState>,
    point_in_time: PointInTime,
    _: Authenticated,
) -> AppResult<Json<Location>> {
    let location = state.locations.track(point_in_time).await?;
    Ok(Json(location))
}
