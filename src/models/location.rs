//! Location model: supported regions and the per-region query shape

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PollenError;

/// Supported upstream regions.
///
/// `Uk` covers both the United Kingdom and Ireland; one upstream endpoint
/// serves both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Nl,
    Uk,
    Fr,
    It,
    Us,
}

/// Which upstream interface a region is served by.
///
/// The US never migrated off the older interface, so its request and
/// response shapes are incompatible with the rest and get their own decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointFamily {
    Current,
    Legacy,
}

impl Region {
    pub const ALL: [Self; 5] = [Self::Nl, Self::Uk, Self::Fr, Self::It, Self::Us];

    /// Upstream endpoint for this region.
    #[must_use]
    pub fn endpoint_url(&self) -> &'static str {
        match self {
            Self::Nl => "https://www.kleenex.nl/api/sitecore/Pollen/GetPollenContent",
            Self::Uk => "https://www.kleenex.co.uk/api/sitecore/Pollen/GetPollenContent",
            Self::Fr => "https://www.kleenex.fr/api/sitecore/Pollen/GetPollenContent",
            Self::It => "https://www.it.scottex.com/api/sitecore/Pollen/GetPollenContent",
            Self::Us => "https://www.kleenex.com/api/sitecore/Pollen/GetPollenForecast",
        }
    }

    #[must_use]
    pub fn family(&self) -> EndpointFamily {
        match self {
            Self::Us => EndpointFamily::Legacy,
            _ => EndpointFamily::Current,
        }
    }

    /// Lowercase region code as used by the upstream.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Nl => "nl",
            Self::Uk => "uk",
            Self::Fr => "fr",
            Self::It => "it",
            Self::Us => "us",
        }
    }

    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Nl => "Netherlands",
            Self::Uk => "United Kingdom & Ireland",
            Self::Fr => "France",
            Self::It => "Italy",
            Self::Us => "United States of America",
        }
    }
}

impl FromStr for Region {
    type Err = PollenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nl" => Ok(Self::Nl),
            "uk" | "ie" => Ok(Self::Uk),
            "fr" => Ok(Self::Fr),
            "it" => Ok(Self::It),
            "us" => Ok(Self::Us),
            other => Err(PollenError::unsupported(format!(
                "region '{other}' is not one of the supported regions (nl, uk, fr, it, us)"
            ))),
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// How the upstream is asked for a location.
///
/// Current-family regions accept coordinates or a city name; the legacy US
/// interface is keyed by ZIP code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationQuery {
    Coordinates { latitude: f64, longitude: f64 },
    City(String),
    PostalCode(String),
}

impl fmt::Display for LocationQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coordinates {
                latitude,
                longitude,
            } => write!(f, "{latitude:.4}, {longitude:.4}"),
            Self::City(city) => f.write_str(city),
            Self::PostalCode(zip) => f.write_str(zip),
        }
    }
}

/// A configured monitoring location. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub region: Region,
    /// Display name chosen by the host, e.g. "Home".
    pub name: String,
    pub query: LocationQuery,
}

impl Location {
    /// Build a validated location.
    ///
    /// This is the configuration-time gate: a query shape the region's
    /// endpoint cannot serve, out-of-range coordinates, or an empty
    /// city/postal code are rejected here so they are never discovered on a
    /// scheduled refresh.
    pub fn new(
        region: Region,
        name: impl Into<String>,
        query: LocationQuery,
    ) -> Result<Self, PollenError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PollenError::unsupported("location name must not be empty"));
        }

        match (&query, region.family()) {
            (
                LocationQuery::Coordinates {
                    latitude,
                    longitude,
                },
                EndpointFamily::Current,
            ) => {
                if !(-90.0..=90.0).contains(latitude) {
                    return Err(PollenError::unsupported(format!(
                        "latitude {latitude} out of range [-90, 90]"
                    )));
                }
                if !(-180.0..=180.0).contains(longitude) {
                    return Err(PollenError::unsupported(format!(
                        "longitude {longitude} out of range [-180, 180]"
                    )));
                }
            }
            (LocationQuery::City(city), EndpointFamily::Current) => {
                if city.trim().is_empty() {
                    return Err(PollenError::unsupported("city must not be empty"));
                }
            }
            (LocationQuery::PostalCode(zip), EndpointFamily::Legacy) => {
                if zip.trim().is_empty() {
                    return Err(PollenError::unsupported("postal code must not be empty"));
                }
            }
            (query, _) => {
                return Err(PollenError::unsupported(format!(
                    "region '{region}' cannot be queried by {}",
                    query_kind(query)
                )));
            }
        }

        Ok(Self {
            region,
            name,
            query,
        })
    }
}

fn query_kind(query: &LocationQuery) -> &'static str {
    match query {
        LocationQuery::Coordinates { .. } => "coordinates",
        LocationQuery::City(_) => "city",
        LocationQuery::PostalCode(_) => "postal code",
    }
}
