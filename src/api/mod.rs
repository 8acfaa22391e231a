//! Upstream pollen API client
//!
//! Translates a configured [`Location`] into a normalized [`Snapshot`],
//! hiding the per-region endpoint and schema variance: NL/UK/FR/IT share
//! the current interface, the US is still on the legacy one. The client is
//! stateless between calls and performs no retries; retry and backoff
//! policy lives in the coordinator so its state stays in one place.

mod current;
mod legacy;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use tracing::debug;

use crate::Result;
use crate::error::PollenError;
use crate::models::location::{EndpointFamily, Location, LocationQuery};
use crate::models::pollen::LevelThresholds;
use crate::models::snapshot::Snapshot;

/// Data source abstraction the coordinator polls.
///
/// [`PollenApiClient`] is the production implementation; tests drive the
/// coordinator with counting mocks instead.
#[async_trait]
pub trait PollenDataSource: Send + Sync {
    /// Fetch and normalize the forecast for one location.
    async fn fetch(&self, location: &Location) -> Result<Snapshot>;
}

const USER_AGENT: &str = concat!("pollenradar/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout. Kept well under any sane refresh interval.
const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// HTTP client for the pollen radar endpoints.
pub struct PollenApiClient {
    client: Client,
    thresholds: LevelThresholds,
}

impl PollenApiClient {
    /// Create a client deriving missing severity levels from `thresholds`.
    pub fn new(thresholds: LevelThresholds) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client, thresholds })
    }

    async fn fetch_current(&self, location: &Location) -> Result<Snapshot> {
        let url = location.region.endpoint_url();
        let form: Vec<(&str, String)> = match &location.query {
            LocationQuery::Coordinates {
                latitude,
                longitude,
            } => vec![("lat", latitude.to_string()), ("lng", longitude.to_string())],
            LocationQuery::City(city) => vec![("city", city.clone())],
            LocationQuery::PostalCode(_) => {
                return Err(PollenError::unsupported(format!(
                    "region '{}' is not served by postal code",
                    location.region
                )));
            }
        };

        debug!(region = %location.region, query = %location.query, "requesting current-family forecast");
        let response = self.client.post(url).form(&form).send().await?;
        let body = check_status(response)?.text().await?;
        let forecast = current::decode(&body, &self.thresholds)?;
        Ok(Snapshot::new(forecast, body))
    }

    async fn fetch_legacy(&self, location: &Location) -> Result<Snapshot> {
        let LocationQuery::PostalCode(zip) = &location.query else {
            return Err(PollenError::unsupported(format!(
                "region '{}' is only served by postal code",
                location.region
            )));
        };
        let url = format!(
            "{}?zip={}",
            location.region.endpoint_url(),
            urlencoding::encode(zip)
        );

        debug!(region = %location.region, query = %location.query, "requesting legacy forecast");
        let response = self.client.get(url).send().await?;
        let body = check_status(response)?.text().await?;
        let forecast = legacy::decode(&body, &self.thresholds)?;
        Ok(Snapshot::new(forecast, body))
    }
}

#[async_trait]
impl PollenDataSource for PollenApiClient {
    async fn fetch(&self, location: &Location) -> Result<Snapshot> {
        match location.region.family() {
            EndpointFamily::Current => self.fetch_current(location).await,
            EndpointFamily::Legacy => self.fetch_legacy(location).await,
        }
    }
}

fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    // 403 from these endpoints means a WAF block, not bad credentials.
    if status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::FORBIDDEN {
        return Err(PollenError::RateLimited(status.as_u16()));
    }
    if !status.is_success() {
        return Err(PollenError::Status(status.as_u16()));
    }
    Ok(response)
}
