//! Unit tests for domain models.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use serde_json::json;

// Note: These tests can be run with: cargo test --test model_tests

mod location_tests {
    use super::*;
    use vip_gateway::models::{DbCoordinates, GpsCoordinates, LOCATION_SOURCE, Location};

    #[test]
    fn test_db_coordinates_from_numbers() {
        let coords: DbCoordinates =
            serde_json::from_value(json!({ "latitude": 51.5, "longitude": -0.12 })).unwrap();

        assert_eq!(coords.latitude, 51.5);
        assert_eq!(coords.longitude, -0.12);
    }

    #[test]
    fn test_db_coordinates_from_numeric_strings() {
        let coords: DbCoordinates =
            serde_json::from_value(json!({ "latitude": "1", "longitude": " 2.25 " })).unwrap();

        assert_eq!(coords.latitude, 1.0);
        assert_eq!(coords.longitude, 2.25);
    }

    #[test]
    fn test_db_coordinates_ignore_extra_fields() {
        let coords: DbCoordinates = serde_json::from_value(
            json!({ "latitude": 1, "longitude": 2, "recorded_by": "sat-7" }),
        )
        .unwrap();

        assert_eq!(coords.latitude, 1.0);
    }

    #[test]
    fn test_db_coordinates_rejects_bad_values() {
        let rejected = [
            json!({ "latitude": "north", "longitude": 2 }),
            json!({ "latitude": "NaN", "longitude": 2 }),
            json!({ "latitude": "inf", "longitude": 2 }),
            json!({ "latitude": null, "longitude": 2 }),
            json!({ "latitude": 1 }),
        ];

        for value in rejected {
            assert!(
                serde_json::from_value::<DbCoordinates>(value.clone()).is_err(),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn test_db_coordinates_accepts_any_finite_value() {
        let coords: DbCoordinates =
            serde_json::from_value(json!({ "latitude": 90.5, "longitude": "-180.01" })).unwrap();

        assert_eq!(coords.latitude, 90.5);
        assert_eq!(coords.longitude, -180.01);
    }

    #[test]
    fn test_location_from_db_coordinates() {
        let coords = DbCoordinates {
            latitude: 1.0,
            longitude: 2.0,
        };

        let location = Location::from(coords);

        assert_eq!(location.source, LOCATION_SOURCE);
        assert_eq!(location.gps_coords, GpsCoordinates { lat: 1.0, long: 2.0 });
    }

    #[test]
    fn test_location_serialization_shape() {
        let location = Location::from(DbCoordinates {
            latitude: 1.0,
            longitude: 2.0,
        });

        let value = serde_json::to_value(&location).unwrap();

        assert_eq!(
            value,
            json!({ "source": "vip-db", "gpsCoords": { "lat": 1.0, "long": 2.0 } })
        );
    }
}

mod time_tests {
    use super::*;
    use vip_gateway::models::CurrentTime;

    #[test]
    fn test_current_time_serialization() {
        let now = CurrentTime {
            now: "2022-08-11T10:18:23+00:00".to_string(),
        };

        assert_eq!(
            serde_json::to_value(&now).unwrap(),
            json!({ "now": "2022-08-11T10:18:23+00:00" })
        );
    }
}

mod rate_limit_tests {
    use vip_gateway::rate_limit::Period;
    use vip_gateway::RateLimit;

    #[test]
    fn test_rate_limit_strings() {
        let cases = [
            ("200/minute", 200, 1, Period::Minute),
            ("10 per 5 seconds", 10, 5, Period::Second),
            ("1 per day", 1, 1, Period::Day),
            ("3/2 hours", 3, 2, Period::Hour),
        ];

        for (raw, amount, multiples, period) in cases {
            let limit: RateLimit = raw.parse().unwrap();
            assert_eq!(limit.amount, amount, "{raw}");
            assert_eq!(limit.multiples, multiples, "{raw}");
            assert_eq!(limit.period, period, "{raw}");
        }
    }

    #[test]
    fn test_rate_limit_display_round_trips() {
        let limit: RateLimit = "200/minute".parse().unwrap();

        assert_eq!(limit.to_string(), "200 per 1 minute");
        assert_eq!(limit.to_string().parse::<RateLimit>().unwrap(), limit);
    }

    #[test]
    fn test_rate_limit_rejects_garbage() {
        for raw in ["", "minute", "0/minute", "5/0 minutes", "5/fortnight", "-1/second"] {
            assert!(raw.parse::<RateLimit>().is_err(), "{raw:?} should be rejected");
        }
    }
}
