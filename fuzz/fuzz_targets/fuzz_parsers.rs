//! Fuzz testing for request and configuration parsers.
//!
//! Ensures the parsers fed by untrusted or operator input never panic:
//!
//! - `parse_point_in_time`: the `{point_in_time}` path segment
//! - `RateLimit::from_str`: the `RATE_LIMIT` budget string
//! - `DbCoordinates` deserialization: the DB server's response body
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! # Install cargo-fuzz (requires nightly)
//! cargo +nightly install cargo-fuzz
//!
//! # Run with a time limit (e.g., 60 seconds)
//! cargo +nightly fuzz run fuzz_parsers -- -max_total_time=60
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use vip_gateway::RateLimit;
use vip_gateway::models::DbCoordinates;
use vip_gateway::validation::parse_point_in_time;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(point_in_time) = parse_point_in_time(s) {
            assert!(point_in_time.get() > 0);
        }

        // Accepted budgets must survive their own Display form
        if let Ok(limit) = s.parse::<RateLimit>() {
            assert_eq!(limit.to_string().parse::<RateLimit>(), Ok(limit));
        }
    }

    if let Ok(coords) = serde_json::from_slice::<DbCoordinates>(data) {
        assert!(coords.latitude.is_finite());
        assert!(coords.longitude.is_finite());
    }
});
