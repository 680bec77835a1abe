use serde::{Deserialize, Serialize};

/// Response of `GET /v1/now`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentTime {
    /// Current UTC time, ISO-8601 with second precision
    pub now: String,
}
