//! Validation of request path parameters.
//!
//! Rejections are reported as `AppError::Validation` (422) with a
//! `{"detail": ...}` body instead of axum's default plain-text 400.

use std::fmt;
use std::num::NonZeroU64;

use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;

use crate::error::{AppError, AppResult};

/// Message returned for an unusable `point_in_time`.
pub const POINT_IN_TIME_MESSAGE: &str = "point_in_time must be an integer greater than 0";

/// A strictly positive point in time, as accepted by the location lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointInTime(NonZeroU64);

impl PointInTime {
    pub fn new(value: u64) -> Option<Self> {
        NonZeroU64::new(value).map(Self)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for PointInTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parse a raw path segment into a [`PointInTime`].
///
/// Accepts an optional leading `+` and surrounding whitespace, like a
/// lenient integer parser would; zero, negatives, fractions and anything
/// non-numeric are rejected.
pub fn parse_point_in_time(raw: &str) -> AppResult<PointInTime> {
    let invalid = || AppError::Validation(POINT_IN_TIME_MESSAGE.to_string());

    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    digits
        .parse::<u64>()
        .ok()
        .and_then(PointInTime::new)
        .ok_or_else(invalid)
}

impl<S> FromRequestParts<S> for PointInTime
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;

        parse_point_in_time(&raw)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_positive_integers() {
        assert_eq!(parse_point_in_time("1").unwrap().get(), 1);
        assert_eq!(parse_point_in_time("+35").unwrap().get(), 35);
        assert_eq!(parse_point_in_time(" 7 ").unwrap().get(), 7);
    }

    #[test]
    fn test_rejects_zero_and_negatives() {
        assert!(parse_point_in_time("0").is_err());
        assert!(parse_point_in_time("-1").is_err());
        assert!(parse_point_in_time("-0").is_err());
    }

    #[test]
    fn test_rejects_non_integers() {
        for raw in ["", "+", "abc", "1.5", "1e3", "0x10", "1 2"] {
            let err = parse_point_in_time(raw).unwrap_err();
            assert!(
                matches!(err, AppError::Validation(ref msg) if msg == POINT_IN_TIME_MESSAGE),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_overflow() {
        assert!(parse_point_in_time("18446744073709551616").is_err());
        assert_eq!(
            parse_point_in_time("18446744073709551615").unwrap().get(),
            u64::MAX
        );
    }
}
