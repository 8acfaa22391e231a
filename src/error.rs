//! Error types for the pollenradar library

use thiserror::Error;

/// Failure kinds raised by the API client and surfaced by the coordinator.
///
/// The client never substitutes defaults for a failed request; every failure
/// comes back as one of these so the coordinator can tell a network blip
/// from an upstream interface change.
#[derive(Error, Debug)]
pub enum PollenError {
    /// Transport-level failure, including connect and read timeouts.
    #[error("network error: {0}")]
    Network(String),

    /// The upstream answered with a non-success HTTP status.
    #[error("upstream returned HTTP {0}")]
    Status(u16),

    /// The upstream throttled or blocked the request.
    #[error("rate limited or blocked by upstream (HTTP {0})")]
    RateLimited(u16),

    /// The response body did not match the expected schema. This usually
    /// means the unofficial API changed its interface and the decoders need
    /// a code update, not a retry.
    #[error("unexpected upstream payload: {0}")]
    UpstreamFormat(String),

    /// The region/query combination cannot be served. A configuration
    /// error, surfaced at setup time rather than on first refresh.
    #[error("unsupported location: {0}")]
    UnsupportedLocation(String),
}

impl PollenError {
    pub(crate) fn format(message: impl Into<String>) -> Self {
        Self::UpstreamFormat(message.into())
    }

    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedLocation(message.into())
    }

    /// Whether a later refresh could plausibly succeed without a code or
    /// configuration change.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Status(_) | Self::RateLimited(_)
        )
    }
}

impl From<reqwest::Error> for PollenError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Network(format!("request timed out: {err}"))
        } else {
            Self::Network(err.to_string())
        }
    }
}
