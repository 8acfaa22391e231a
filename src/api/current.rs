//! Current-family (NL/UK/FR/IT) response schema and normalization
//!
//! The current interface answers a `lat`/`lng` or `city` form POST with a
//! row-oriented JSON document: one object per forecast day, each carrying a
//! measure per pollen type with a count, a pre-computed level and an
//! optional species breakdown.

use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::Result;
use crate::error::PollenError;
use crate::models::pollen::{
    FORECAST_DAYS, ForecastSet, LevelThresholds, PollenDetail, PollenForecast, PollenReading,
    PollenType, SeverityLevel,
};

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    forecast: Vec<DayEntry>,
}

#[derive(Debug, Deserialize)]
struct DayEntry {
    date: NaiveDate,
    trees: Measure,
    grass: Measure,
    weeds: Measure,
}

#[derive(Debug, Deserialize)]
struct Measure {
    count: Option<f64>,
    level: Option<String>,
    unit: Option<String>,
    #[serde(default)]
    detail: Vec<DetailEntry>,
}

#[derive(Debug, Deserialize)]
struct DetailEntry {
    name: String,
    count: f64,
    level: String,
}

/// Decode a current-family body into the normalized forecast triple.
pub(crate) fn decode(body: &str, thresholds: &LevelThresholds) -> Result<PollenForecast> {
    let response: ForecastResponse = serde_json::from_str(body).map_err(|err| {
        PollenError::format(format!(
            "current-family response did not match the expected schema: {err}"
        ))
    })?;
    let today = Utc::now().date_naive();

    Ok(PollenForecast {
        tree: collect(&response, PollenType::Tree, thresholds, today)?,
        grass: collect(&response, PollenType::Grass, thresholds, today)?,
        weed: collect(&response, PollenType::Weed, thresholds, today)?,
    })
}

fn collect(
    response: &ForecastResponse,
    pollen_type: PollenType,
    thresholds: &LevelThresholds,
    today: NaiveDate,
) -> Result<ForecastSet> {
    let readings = response
        .forecast
        .iter()
        .take(FORECAST_DAYS)
        .map(|day| to_reading(day, pollen_type, thresholds))
        .collect::<Result<Vec<_>>>()?;
    ForecastSet::new(pollen_type, readings, today)
}

fn to_reading(
    day: &DayEntry,
    pollen_type: PollenType,
    thresholds: &LevelThresholds,
) -> Result<PollenReading> {
    let measure = match pollen_type {
        PollenType::Tree => &day.trees,
        PollenType::Grass => &day.grass,
        PollenType::Weed => &day.weeds,
    };

    if let Some(count) = measure.count {
        if count < 0.0 {
            return Err(PollenError::format(format!(
                "negative {pollen_type} count {count} on {}",
                day.date
            )));
        }
    }

    // The upstream usually supplies a level; derive one from the shared
    // threshold table when it is missing so semantics match the legacy path.
    let level = match measure.level.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => raw.parse::<SeverityLevel>()?,
        None => measure
            .count
            .map_or(SeverityLevel::None, |count| {
                thresholds.level_for(pollen_type, count)
            }),
    };

    let details = measure
        .detail
        .iter()
        .map(|entry| {
            Ok(PollenDetail {
                name: entry.name.clone(),
                count: entry.count,
                level: entry.level.parse::<SeverityLevel>()?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(PollenReading {
        date: day.date,
        count: measure.count,
        level,
        unit: measure
            .unit
            .as_deref()
            .unwrap_or("ppm")
            .to_ascii_lowercase(),
        details,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    /// Fixture in the current-family shape, anchored to today's date.
    fn fixture(tree_today: f64, grass_today: f64, weed_today: f64) -> String {
        let today = Utc::now().date_naive();
        let days: Vec<String> = (0..FORECAST_DAYS as i64)
            .map(|offset| {
                let date = today + Duration::days(offset);
                let (tree, grass, weed) = if offset == 0 {
                    (tree_today, grass_today, weed_today)
                } else {
                    (5.0, 1.0, 0.0)
                };
                format!(
                    r#"{{"date":"{date}",
                        "trees":{{"count":{tree},"level":null,"unit":"PPM","detail":[{{"name":"Birch","count":{tree},"level":"low"}}]}},
                        "grass":{{"count":{grass},"level":"low","unit":"ppm"}},
                        "weeds":{{"count":{weed},"level":null,"unit":"ppm"}}}}"#
                )
            })
            .collect();
        format!(r#"{{"forecast":[{}]}}"#, days.join(","))
    }

    #[test]
    fn test_decode_normalizes_five_days_per_type() {
        let forecast = decode(&fixture(12.0, 0.0, 3.0), &LevelThresholds::default()).unwrap();
        for pollen_type in PollenType::ALL {
            let set = forecast.get(pollen_type);
            assert_eq!(set.readings().len(), FORECAST_DAYS);
        }
        // tree=12 today: count kept, level derived (non-none) because the
        // upstream left it null.
        assert_eq!(forecast.tree.today().count, Some(12.0));
        assert_eq!(forecast.tree.today().level, SeverityLevel::Low);
        assert_ne!(forecast.tree.today().level, SeverityLevel::None);
        assert_eq!(forecast.grass.today().count, Some(0.0));
        assert_eq!(forecast.weed.today().count, Some(3.0));
        assert_eq!(forecast.tree.today().unit, "ppm");
    }

    #[test]
    fn test_decode_keeps_upstream_level_over_derivation() {
        // grass carries an explicit "low" label on a 500 ppm count; the
        // payload's label wins even though the table would say very-high.
        let forecast = decode(&fixture(12.0, 500.0, 3.0), &LevelThresholds::default()).unwrap();
        assert_eq!(forecast.grass.today().level, SeverityLevel::Low);
    }

    #[test]
    fn test_decode_species_details() {
        let forecast = decode(&fixture(12.0, 0.0, 3.0), &LevelThresholds::default()).unwrap();
        let details = &forecast.tree.today().details;
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].name, "Birch");
        assert_eq!(details[0].level, SeverityLevel::Low);
        // Legacy-normalized types without a breakdown stay empty.
        assert!(forecast.grass.today().details.is_empty());
    }

    #[test]
    fn test_malformed_body_is_a_format_error() {
        let result = decode("<!doctype html><p>maintenance</p>", &LevelThresholds::default());
        assert!(matches!(result, Err(PollenError::UpstreamFormat(_))));
    }

    #[test]
    fn test_short_window_is_a_format_error() {
        let today = Utc::now().date_naive();
        let body = format!(
            r#"{{"forecast":[{{"date":"{today}",
                "trees":{{"count":1,"level":"low","unit":"ppm"}},
                "grass":{{"count":1,"level":"low","unit":"ppm"}},
                "weeds":{{"count":1,"level":"low","unit":"ppm"}}}}]}}"#
        );
        let result = decode(&body, &LevelThresholds::default());
        assert!(matches!(result, Err(PollenError::UpstreamFormat(_))));
    }

    #[test]
    fn test_negative_count_rejected() {
        let body = fixture(-4.0, 0.0, 0.0);
        let result = decode(&body, &LevelThresholds::default());
        assert!(matches!(result, Err(PollenError::UpstreamFormat(_))));
    }
}
