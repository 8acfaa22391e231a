//! Legacy US response schema and normalization
//!
//! The US endpoint predates the current family and kept its original
//! column-oriented schema: a single start date plus one parallel count
//! array per pollen type, keyed `tree`/`grass`/`ragweed`, dates in
//! `%m/%d/%Y`, no severity levels and no species breakdown. Its values are
//! known to diverge from what the vendor's own website displays. Kept as a
//! fully separate decoder from the current family; the two schemas drift
//! apart over time.

use chrono::{Duration, NaiveDate, Utc};
use serde::Deserialize;

use crate::Result;
use crate::error::PollenError;
use crate::models::pollen::{
    FORECAST_DAYS, ForecastSet, LevelThresholds, PollenForecast, PollenReading, PollenType,
    SeverityLevel,
};

#[derive(Debug, Deserialize)]
struct LegacyResponse {
    #[serde(rename = "pollenForecast")]
    forecast: LegacyForecast,
}

#[derive(Debug, Deserialize)]
struct LegacyForecast {
    #[serde(rename = "startDate")]
    start_date: String,
    tree: Vec<Option<f64>>,
    grass: Vec<Option<f64>>,
    ragweed: Vec<Option<f64>>,
}

/// Decode a legacy US body into the normalized forecast triple.
pub(crate) fn decode(body: &str, thresholds: &LevelThresholds) -> Result<PollenForecast> {
    let response: LegacyResponse = serde_json::from_str(body).map_err(|err| {
        PollenError::format(format!(
            "legacy response did not match the expected schema: {err}"
        ))
    })?;
    let forecast = &response.forecast;

    let start_date =
        NaiveDate::parse_from_str(&forecast.start_date, "%m/%d/%Y").map_err(|err| {
            PollenError::format(format!(
                "legacy start date '{}' is not %m/%d/%Y: {err}",
                forecast.start_date
            ))
        })?;
    let today = Utc::now().date_naive();

    Ok(PollenForecast {
        tree: collect(PollenType::Tree, &forecast.tree, start_date, thresholds, today)?,
        grass: collect(
            PollenType::Grass,
            &forecast.grass,
            start_date,
            thresholds,
            today,
        )?,
        weed: collect(
            PollenType::Weed,
            &forecast.ragweed,
            start_date,
            thresholds,
            today,
        )?,
    })
}

fn collect(
    pollen_type: PollenType,
    counts: &[Option<f64>],
    start_date: NaiveDate,
    thresholds: &LevelThresholds,
    today: NaiveDate,
) -> Result<ForecastSet> {
    let readings = counts
        .iter()
        .take(FORECAST_DAYS)
        .enumerate()
        .map(|(offset, count)| {
            let date = start_date + Duration::days(offset as i64);
            if let Some(count) = count {
                if *count < 0.0 {
                    return Err(PollenError::format(format!(
                        "negative {pollen_type} count {count} on {date}"
                    )));
                }
            }
            // No levels on this interface; always derived from the shared
            // threshold table.
            let level = count.map_or(SeverityLevel::None, |count| {
                thresholds.level_for(pollen_type, count)
            });
            Ok(PollenReading {
                date,
                count: *count,
                level,
                unit: "ppm".to_string(),
                details: Vec::new(),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    ForecastSet::new(pollen_type, readings, today)
}
