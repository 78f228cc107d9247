//! Price snapshot types.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::Rate;

/// Currency pair key such as `BTC_USD`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PairKey(String);

impl PairKey {
    /// Build a key from base and quote symbols, normalized to upper case.
    pub fn new(base: &str, quote: &str) -> Self {
        Self(format!(
            "{}_{}",
            base.to_ascii_uppercase(),
            quote.to_ascii_uppercase()
        ))
    }

    /// Get the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PairKey {
    fn from(s: &str) -> Self {
        Self(s.to_ascii_uppercase())
    }
}

impl From<String> for PairKey {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

/// A complete multi-currency price set as fetched at one instant.
///
/// Snapshots are immutable once built. The cache swaps whole snapshots, so a
/// reader never observes a mix of old and new rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    prices: HashMap<PairKey, Rate>,
    fetched_at: DateTime<Utc>,
}

impl PriceSnapshot {
    #[must_use]
    pub fn new(prices: HashMap<PairKey, Rate>, fetched_at: DateTime<Utc>) -> Self {
        Self { prices, fetched_at }
    }

    /// Rate for a pair, if the upstream quoted it.
    #[must_use]
    pub fn rate(&self, pair: &PairKey) -> Option<Rate> {
        self.prices.get(pair).copied()
    }

    #[must_use]
    pub fn prices(&self) -> &HashMap<PairKey, Rate> {
        &self.prices
    }

    #[must_use]
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Age of the snapshot relative to `now`. Clock skew clamps to zero.
    #[must_use]
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.fetched_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Age of the snapshot in whole seconds relative to the current time.
    #[must_use]
    pub fn cache_age_seconds(&self) -> u64 {
        self.age_at(Utc::now()).as_secs()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// Convert `amount` using the rate for `pair`.
#[must_use]
pub fn convert(amount: Decimal, snapshot: &PriceSnapshot, pair: &PairKey) -> Option<Decimal> {
    snapshot.rate(pair).and_then(|rate| amount.checked_mul(rate))
}
