//! Normalized pollen records: types, severity levels, forecast sets

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::PollenError;

/// Number of forecast days served per pollen type: today plus four.
pub const FORECAST_DAYS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollenType {
    Tree,
    Grass,
    Weed,
}

impl PollenType {
    pub const ALL: [Self; 3] = [Self::Tree, Self::Grass, Self::Weed];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tree => "tree",
            Self::Grass => "grass",
            Self::Weed => "weed",
        }
    }
}

impl fmt::Display for PollenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordinal severity category for a pollen count.
///
/// Ordering follows severity, so `Low < Moderate < High < VeryHigh`.
/// `None` is only produced for upstream-supplied levels or for readings
/// without a count; derivation from a count starts at `Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SeverityLevel {
    None,
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl SeverityLevel {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::VeryHigh => "very-high",
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeverityLevel {
    type Err = PollenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "low" => Ok(Self::Low),
            "moderate" => Ok(Self::Moderate),
            "high" => Ok(Self::High),
            "very-high" | "very high" => Ok(Self::VeryHigh),
            other => Err(PollenError::format(format!(
                "unknown severity level '{other}'"
            ))),
        }
    }
}

/// Per-type count thresholds separating the severity levels.
///
/// Each entry holds the inclusive upper bounds (in ppm) for Low, Moderate
/// and High; anything above the last bound is VeryHigh. The table is plain
/// data so a host can override it, but the defaults match the vendor's
/// published cutoffs. Upstream-supplied levels always win over derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelThresholds {
    #[serde(default = "default_tree_bounds")]
    pub tree: [f64; 3],
    #[serde(default = "default_grass_bounds")]
    pub grass: [f64; 3],
    #[serde(default = "default_weed_bounds")]
    pub weed: [f64; 3],
}

fn default_tree_bounds() -> [f64; 3] {
    [95.0, 207.0, 703.0]
}

fn default_grass_bounds() -> [f64; 3] {
    [29.0, 60.0, 341.0]
}

fn default_weed_bounds() -> [f64; 3] {
    [20.0, 77.0, 266.0]
}

impl Default for LevelThresholds {
    fn default() -> Self {
        Self {
            tree: default_tree_bounds(),
            grass: default_grass_bounds(),
            weed: default_weed_bounds(),
        }
    }
}

impl LevelThresholds {
    /// Map a raw count to a severity level.
    ///
    /// Deterministic and monotonically non-decreasing in the count, so the
    /// same count always produces the same level regardless of which
    /// endpoint family served the data.
    #[must_use]
    pub fn level_for(&self, pollen_type: PollenType, count: f64) -> SeverityLevel {
        let bounds = match pollen_type {
            PollenType::Tree => &self.tree,
            PollenType::Grass => &self.grass,
            PollenType::Weed => &self.weed,
        };
        if count <= bounds[0] {
            SeverityLevel::Low
        } else if count <= bounds[1] {
            SeverityLevel::Moderate
        } else if count <= bounds[2] {
            SeverityLevel::High
        } else {
            SeverityLevel::VeryHigh
        }
    }
}

/// Species-level breakdown within a pollen type (e.g. birch within trees).
///
/// Only the current endpoint family supplies this; legacy readings carry an
/// empty list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollenDetail {
    pub name: String,
    pub count: f64,
    pub level: SeverityLevel,
}

/// One day's normalized reading for a single pollen type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollenReading {
    /// Forecast date this reading applies to.
    pub date: NaiveDate,
    /// Raw count; absent when the type is not measured for that day/region.
    pub count: Option<f64>,
    /// Severity level, upstream-supplied or derived from the count.
    pub level: SeverityLevel,
    /// Unit of measure for the count, normally "ppm".
    pub unit: String,
    /// Species-level breakdown, when the upstream provides one.
    pub details: Vec<PollenDetail>,
}

/// Ordered five-day forecast for a single pollen type.
///
/// Invariants, enforced by [`ForecastSet::new`]: exactly [`FORECAST_DAYS`]
/// readings, dates ascending and contiguous with one reading per date, and
/// the first date not in the future.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSet {
    pollen_type: PollenType,
    readings: Vec<PollenReading>,
}

impl ForecastSet {
    /// Build a validated forecast set. `today` anchors the first-date check.
    pub fn new(
        pollen_type: PollenType,
        readings: Vec<PollenReading>,
        today: NaiveDate,
    ) -> Result<Self, PollenError> {
        if readings.len() != FORECAST_DAYS {
            return Err(PollenError::format(format!(
                "{pollen_type} forecast has {} day(s), expected {FORECAST_DAYS}",
                readings.len()
            )));
        }
        for pair in readings.windows(2) {
            if pair[1].date != pair[0].date.succ_opt().unwrap_or(pair[0].date) {
                return Err(PollenError::format(format!(
                    "{pollen_type} forecast dates are not contiguous: {} is not followed by {}",
                    pair[0].date, pair[1].date
                )));
            }
        }
        let first = readings[0].date;
        if first > today {
            return Err(PollenError::format(format!(
                "{pollen_type} forecast starts in the future ({first})"
            )));
        }
        Ok(Self {
            pollen_type,
            readings,
        })
    }

    #[must_use]
    pub fn pollen_type(&self) -> PollenType {
        self.pollen_type
    }

    /// All readings, ordered by date ascending.
    #[must_use]
    pub fn readings(&self) -> &[PollenReading] {
        &self.readings
    }

    /// Today's reading (the first in the set).
    #[must_use]
    pub fn today(&self) -> &PollenReading {
        &self.readings[0]
    }

    /// Reading `day_offset` days ahead of the set's first date, if covered.
    #[must_use]
    pub fn get(&self, day_offset: usize) -> Option<&PollenReading> {
        self.readings.get(day_offset)
    }
}

/// The tree/grass/weed forecast triple produced by one fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollenForecast {
    pub tree: ForecastSet,
    pub grass: ForecastSet,
    pub weed: ForecastSet,
}

impl PollenForecast {
    #[must_use]
    pub fn get(&self, pollen_type: PollenType) -> &ForecastSet {
        match pollen_type {
            PollenType::Tree => &self.tree,
            PollenType::Grass => &self.grass,
            PollenType::Weed => &self.weed,
        }
    }
}
