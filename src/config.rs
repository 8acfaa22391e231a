//! Coordinator tuning knobs
//!
//! All values have sensible defaults; hosts deserialize overrides from
//! whatever configuration source they use and hand the result to
//! [`crate::PollenCoordinator`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::pollen::LevelThresholds;

/// Floor for the refresh interval so a misconfigured host cannot hammer the
/// unofficial API.
pub const MIN_UPDATE_INTERVAL_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Seconds between scheduled refreshes. The upstream only updates every
    /// few hours; hourly polling is frequent enough without abusing it.
    #[serde(default = "default_update_interval")]
    pub update_interval_secs: u64,
    /// Per-request timeout in seconds; kept well under the refresh interval
    /// so a slow upstream never stalls the cycle.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Consecutive failures before the coordinator reports itself degraded.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Seconds to hold off scheduled refreshes after the upstream
    /// rate-limits or blocks us.
    #[serde(default = "default_rate_limit_backoff")]
    pub rate_limit_backoff_secs: u64,
    /// Severity derivation table for payloads that carry no levels.
    #[serde(default)]
    pub thresholds: LevelThresholds,
}

fn default_update_interval() -> u64 {
    3600
}

fn default_request_timeout() -> u64 {
    10
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_rate_limit_backoff() -> u64 {
    1800
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: default_update_interval(),
            request_timeout_secs: default_request_timeout(),
            failure_threshold: default_failure_threshold(),
            rate_limit_backoff_secs: default_rate_limit_backoff(),
            thresholds: LevelThresholds::default(),
        }
    }
}

impl CoordinatorConfig {
    /// Refresh interval, clamped to [`MIN_UPDATE_INTERVAL_SECS`].
    #[must_use]
    pub fn update_interval(&self) -> Duration {
        if self.update_interval_secs < MIN_UPDATE_INTERVAL_SECS {
            warn!(
                "update interval too short ({} seconds), using {} seconds instead",
                self.update_interval_secs, MIN_UPDATE_INTERVAL_SECS
            );
            return Duration::from_secs(MIN_UPDATE_INTERVAL_SECS);
        }
        Duration::from_secs(self.update_interval_secs)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    #[must_use]
    pub fn rate_limit_backoff(&self) -> Duration {
        Duration::from_secs(self.rate_limit_backoff_secs)
    }
}
