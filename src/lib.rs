//! Pollen forecast acquisition and normalization for the Kleenex / Scottex
//! pollen radar APIs.
//!
//! Two cooperating parts: [`PollenApiClient`] translates a configured
//! [`Location`] into normalized five-day forecast sets for tree, grass and
//! weed pollen, hiding the per-region endpoint and schema variance, and
//! [`PollenCoordinator`] owns refresh scheduling, request coalescing,
//! snapshot caching and failure recovery so consumers can always read a
//! snapshot without blocking on network I/O.

pub mod api;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod models;

// Re-export core types for public API
pub use api::{PollenApiClient, PollenDataSource};
pub use config::CoordinatorConfig;
pub use coordinator::{Diagnostics, PollenCoordinator, SnapshotState};
pub use error::PollenError;
pub use models::{
    ForecastSet, LevelThresholds, Location, LocationQuery, PollenForecast, PollenReading,
    PollenType, Region, SeverityLevel, Snapshot,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, PollenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
