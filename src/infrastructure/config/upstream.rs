//! Upstream service endpoints.

use serde::Deserialize;

/// Endpoints and transport settings for the creation, balance and price
/// services.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Wallet creation endpoint (`POST`).
    #[serde(default = "default_creation_url")]
    pub creation_url: String,
    /// Balance endpoint (`GET ?network=&address=`).
    #[serde(default = "default_balance_url")]
    pub balance_url: String,
    /// Price endpoint (`POST {pairs}`).
    #[serde(default = "default_price_url")]
    pub price_url: String,
    /// Per-request timeout (milliseconds).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Bearer token, loaded from `COINKEEPER_API_KEY` only.
    #[serde(skip)]
    pub api_key: Option<String>,
}

fn default_creation_url() -> String {
    "http://127.0.0.1:8080/v1/wallets".into()
}

fn default_balance_url() -> String {
    "http://127.0.0.1:8080/v1/balances".into()
}

fn default_price_url() -> String {
    "http://127.0.0.1:8080/v1/prices".into()
}

const fn default_timeout_ms() -> u64 {
    10_000
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            creation_url: default_creation_url(),
            balance_url: default_balance_url(),
            price_url: default_price_url(),
            timeout_ms: default_timeout_ms(),
            api_key: None,
        }
    }
}
