//! Upstream service port: wallet creation, balances and prices.
//!
//! Implementations perform exactly one request per call and classify the
//! failure so callers can decide whether to spend a retry.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{Address, Amount, Network, PairKey, Rate, UserId};

/// Classified failure of a single upstream request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// Timeout, connection failure or 5xx.
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),

    /// HTTP 429 or an equivalent throttle signal.
    #[error("rate limited by upstream")]
    RateLimited {
        /// Delay suggested by the upstream, when provided.
        retry_after: Option<Duration>,
    },

    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The upstream does not serve the requested network.
    #[error("invalid network: {0}")]
    InvalidNetwork(String),

    /// The account is not allowed to create more wallets.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Any other client-side rejection.
    #[error("request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
}

impl UpstreamError {
    /// Whether another attempt may succeed without user intervention.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkUnavailable(_) | Self::RateLimited { .. } | Self::MalformedResponse(_)
        )
    }

    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Short stable label for logs and reports.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NetworkUnavailable(_) => "network_unavailable",
            Self::RateLimited { .. } => "rate_limited",
            Self::MalformedResponse(_) => "malformed_response",
            Self::InvalidNetwork(_) => "invalid_network",
            Self::QuotaExceeded(_) => "quota_exceeded",
            Self::Rejected { .. } => "rejected",
        }
    }
}

/// Prices returned by the price service.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    pub prices: HashMap<PairKey, Rate>,
    /// Upstream timestamp, if the service reports one.
    pub fetched_at: Option<DateTime<Utc>>,
}

/// Client for the external creation, balance and price services.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the coordinator and scheduler issue
/// requests for different networks and wallets concurrently.
#[async_trait]
pub trait NetworkClient: Send + Sync {
    /// Return the client name for logging.
    fn name(&self) -> &'static str;

    /// Ask the custody service to create a wallet for `user_id` on `network`.
    async fn create_wallet(&self, network: Network, user_id: &UserId)
        -> Result<Address, UpstreamError>;

    /// Fetch the native-unit balance of `address`.
    async fn fetch_balance(&self, network: Network, address: &Address)
        -> Result<Amount, UpstreamError>;

    /// Fetch rates for `pairs`.
    async fn fetch_prices(&self, pairs: &[PairKey]) -> Result<PriceQuote, UpstreamError>;
}
