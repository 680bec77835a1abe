//! Wall-clock source, injectable so time-dependent responses can be tested.

use chrono::{DateTime, SecondsFormat, Utc};

/// Source of the current UTC time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// ISO-8601 with second precision and an explicit `+00:00` offset.
pub fn iso8601_seconds(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, false)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_iso8601_seconds_drops_subseconds() {
        let at = DateTime::parse_from_rfc3339("2022-08-11T10:18:23.987654Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(iso8601_seconds(at), "2022-08-11T10:18:23+00:00");
    }

    #[test]
    fn test_fixed_clock_is_frozen() {
        let at = Utc::now();
        let clock = FixedClock(at);
        assert_eq!(clock.now(), at);
        assert_eq!(clock.now(), clock.now());
    }
}
