//! Refresh scheduling and price configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::application::refresh::RefreshPolicy;
use crate::domain::{Network, PairKey};

/// Polling cadence and backoff for balance/price refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    /// Interval between automatic refresh cycles (milliseconds).
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Age after which the price snapshot is refetched (milliseconds).
    /// Defaults to `interval_ms`.
    #[serde(default)]
    pub price_stale_after_ms: Option<u64>,
    /// Multiplier applied to the interval after a failing cycle.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Upper bound for the backed-off interval (milliseconds).
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Run a cycle immediately when auto-refresh starts.
    #[serde(default = "default_refresh_on_start")]
    pub refresh_on_start: bool,
}

const fn default_interval_ms() -> u64 {
    60_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

const fn default_max_backoff_ms() -> u64 {
    600_000 // 10 minutes
}

const fn default_refresh_on_start() -> bool {
    true
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            price_stale_after_ms: None,
            backoff_multiplier: default_backoff_multiplier(),
            max_backoff_ms: default_max_backoff_ms(),
            refresh_on_start: default_refresh_on_start(),
        }
    }
}

/// Currencies prices are quoted in.
#[derive(Debug, Clone, Deserialize)]
pub struct PricesConfig {
    /// Quote currencies requested from the price service.
    #[serde(default = "default_quote_currencies")]
    pub quote_currencies: Vec<String>,
    /// Currency used for dashboard totals. Must be one of `quote_currencies`.
    #[serde(default = "default_display_currency")]
    pub display_currency: String,
}

fn default_quote_currencies() -> Vec<String> {
    vec!["USD".into()]
}

fn default_display_currency() -> String {
    "USD".into()
}

impl Default for PricesConfig {
    fn default() -> Self {
        Self {
            quote_currencies: default_quote_currencies(),
            display_currency: default_display_currency(),
        }
    }
}

impl PricesConfig {
    /// Every pair of `networks` against every quote currency.
    #[must_use]
    pub fn pairs<'a>(&self, networks: impl IntoIterator<Item = &'a Network>) -> Vec<PairKey> {
        networks
            .into_iter()
            .flat_map(|n| self.quote_currencies.iter().map(move |q| n.pair(q)))
            .collect()
    }
}

impl RefreshConfig {
    #[must_use]
    pub fn to_policy(&self, pairs: Vec<PairKey>) -> RefreshPolicy {
        RefreshPolicy {
            interval: Duration::from_millis(self.interval_ms),
            price_stale_after: self.price_stale_after_ms.map(Duration::from_millis),
            backoff_multiplier: self.backoff_multiplier,
            max_backoff: Duration::from_millis(self.max_backoff_ms),
            refresh_on_start: self.refresh_on_start,
            pairs,
        }
    }
}
