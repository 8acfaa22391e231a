use std::sync::Arc;

use anyhow::{Context, Result};
use pollenradar::{
    CoordinatorConfig, Location, LocationQuery, PollenApiClient, PollenCoordinator, PollenType,
    Region, SnapshotState,
};
use tracing_subscriber::EnvFilter;

/// One-shot fetch-and-print shell around the library: reads the location
/// from POLLEN_* environment variables, runs a single coordinated refresh
/// and renders the forecast.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let location = location_from_env()?;
    let client = PollenApiClient::new(Default::default())?;
    let coordinator = PollenCoordinator::new(Arc::new(client), location, CoordinatorConfig::default());

    coordinator.refresh().await;

    match coordinator.get_snapshot() {
        SnapshotState::Fresh(snapshot) | SnapshotState::Stale { snapshot, .. } => {
            println!(
                "Pollen forecast for {} (fetched {})",
                coordinator.location().name,
                snapshot.fetched_at.format("%Y-%m-%d %H:%M UTC")
            );
            for pollen_type in PollenType::ALL {
                let set = snapshot.forecast.get(pollen_type);
                print!("  {pollen_type:<5}");
                for reading in set.readings() {
                    match reading.count {
                        Some(count) => print!(
                            "  {} {count:>6.1} {} ({})",
                            reading.date.format("%a"),
                            reading.unit,
                            reading.level
                        ),
                        None => print!("  {}     not measured", reading.date.format("%a")),
                    }
                }
                println!();
            }
            Ok(())
        }
        SnapshotState::Unavailable => {
            let diagnostics = coordinator.diagnostics();
            anyhow::bail!(
                "no pollen data available: {}",
                diagnostics
                    .last_error
                    .unwrap_or_else(|| "no refresh attempted".to_string())
            );
        }
    }
}

fn location_from_env() -> Result<Location> {
    let region: Region = std::env::var("POLLEN_REGION")
        .unwrap_or_else(|_| "nl".to_string())
        .parse()?;
    let name = std::env::var("POLLEN_NAME").unwrap_or_else(|_| "Pollen".to_string());

    let query = if let Ok(zip) = std::env::var("POLLEN_ZIP") {
        LocationQuery::PostalCode(zip)
    } else if let Ok(city) = std::env::var("POLLEN_CITY") {
        LocationQuery::City(city)
    } else {
        let latitude = std::env::var("POLLEN_LAT")
            .unwrap_or_else(|_| "52.09".to_string())
            .parse()
            .context("POLLEN_LAT is not a number")?;
        let longitude = std::env::var("POLLEN_LNG")
            .unwrap_or_else(|_| "5.12".to_string())
            .parse()
            .context("POLLEN_LNG is not a number")?;
        LocationQuery::Coordinates {
            latitude,
            longitude,
        }
    };

    Ok(Location::new(region, name, query)?)
}
