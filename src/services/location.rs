//! Location lookup service: response cache in front of the DB server.
//!
//! Lookups are cached per point in time for [`LOCATION_CACHE_TTL`]. Only
//! successful lookups are cached, so a 404 or an outage is retried against
//! the DB server on the next request.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, instrument};

use crate::cache::{LOCATION_CACHE_TTL, ResponseCache};
use crate::db_client::{DbServerClient, UpstreamError};
use crate::metrics::record_upstream_fetch;
use crate::models::Location;
use crate::store::Store;
use crate::validation::PointInTime;

/// Service resolving VIP locations.
///
/// Thread-safe and clonable for use across async tasks.
#[derive(Clone)]
pub struct LocationService {
    client: DbServerClient,
    cache: ResponseCache,
}

impl LocationService {
    pub fn new(client: DbServerClient, store: Arc<dyn Store>) -> Self {
        Self {
            client,
            cache: ResponseCache::new(store, "location", LOCATION_CACHE_TTL),
        }
    }

    /// Resolve the location at `point_in_time`, from cache when possible.
    #[instrument(skip_all, fields(point_in_time = %point_in_time))]
    pub async fn track(&self, point_in_time: PointInTime) -> Result<Location, UpstreamError> {
        self.cache
            .get_or_compute(&point_in_time.to_string(), || self.fetch(point_in_time))
            .await
    }

    async fn fetch(&self, point_in_time: PointInTime) -> Result<Location, UpstreamError> {
        let started = Instant::now();
        let result = self.client.fetch_location(point_in_time.get()).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        record_upstream_fetch(outcome, started.elapsed().as_secs_f64());

        result.map(Location::from).inspect_err(|e| {
            debug!(error = %e, "DB server lookup failed");
        })
    }
}
