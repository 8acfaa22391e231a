//! Data models for the pollenradar library
//!
//! Organized by concern:
//! - Location: supported regions and the per-region query shape
//! - Pollen: normalized readings, severity levels and forecast sets
//! - Snapshot: the coordinator's cached unit of state

pub mod location;
pub mod pollen;
pub mod snapshot;

// Re-export all public types for convenient access
pub use location::{EndpointFamily, Location, LocationQuery, Region};
pub use pollen::{
    FORECAST_DAYS, ForecastSet, LevelThresholds, PollenDetail, PollenForecast, PollenReading,
    PollenType, SeverityLevel,
};
pub use snapshot::Snapshot;
