//! Snapshot: the coordinator's atomically replaced unit of state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::pollen::PollenForecast;

/// One successful fetch: the normalized forecast triple, the fetch time and
/// the raw upstream payload (retained for troubleshooting when the
/// unofficial API changes shape).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub forecast: PollenForecast,
    /// When this snapshot was fetched.
    pub fetched_at: DateTime<Utc>,
    /// Verbatim response body the forecast was decoded from.
    pub raw_payload: String,
}

impl Snapshot {
    #[must_use]
    pub fn new(forecast: PollenForecast, raw_payload: String) -> Self {
        Self {
            forecast,
            fetched_at: Utc::now(),
            raw_payload,
        }
    }
}
