//! Location payloads: the raw upstream shape and the public response.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Value of [`Location::source`] for every lookup served by this gateway.
pub const LOCATION_SOURCE: &str = "vip-db";

/// Coordinates as stored on the DB server.
///
/// The DB server is not trusted to send proper JSON numbers; numeric
/// strings such as `"1"` are accepted as well. Non-finite values are
/// rejected; the values themselves are passed through unchecked.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DbCoordinates {
    #[serde(deserialize_with = "latitude")]
    pub latitude: f64,
    #[serde(deserialize_with = "longitude")]
    pub longitude: f64,
}

/// Coordinates as presented to API callers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsCoordinates {
    pub lat: f64,
    pub long: f64,
}

/// Response of `GET /v1/VIP/{point_in_time}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub source: String,
    #[serde(rename = "gpsCoords")]
    pub gps_coords: GpsCoordinates,
}

impl From<DbCoordinates> for Location {
    fn from(coords: DbCoordinates) -> Self {
        Self {
            source: LOCATION_SOURCE.to_string(),
            gps_coords: GpsCoordinates {
                lat: coords.latitude,
                long: coords.longitude,
            },
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

fn coordinate<'de, D>(deserializer: D, name: &str) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => n,
        NumberOrString::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| de::Error::custom(format!("{name} `{s}` is not a number")))?,
    };

    if !value.is_finite() {
        return Err(de::Error::custom(format!("{name} {value} is not a finite number")));
    }
    Ok(value)
}

fn latitude<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    coordinate(deserializer, "latitude")
}

fn longitude<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    coordinate(deserializer, "longitude")
}
