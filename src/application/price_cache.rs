//! Price snapshot cache.
//!
//! Holds the most recent [`PriceSnapshot`] and answers staleness queries.
//! The cache owns no timer; the refresh scheduler decides when to refetch.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::domain::{PairKey, PriceSnapshot};
use crate::port::outbound::upstream::{NetworkClient, UpstreamError};

/// Thread-safe holder of the latest price snapshot.
///
/// Snapshots are swapped as a whole behind an `Arc`, so readers see either
/// the previous snapshot or the new one, never a mix.
pub struct PriceCache {
    tx: watch::Sender<Option<Arc<PriceSnapshot>>>,
}

impl PriceCache {
    /// Create an empty cache. An empty cache is always stale.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Current snapshot, or `None` if prices were never fetched.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<PriceSnapshot>> {
        self.tx.borrow().clone()
    }

    /// Subscribe to snapshot replacements.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<PriceSnapshot>>> {
        self.tx.subscribe()
    }

    /// Replace the snapshot atomically.
    pub fn replace(&self, snapshot: PriceSnapshot) -> Arc<PriceSnapshot> {
        let snapshot = Arc::new(snapshot);
        self.tx.send_replace(Some(Arc::clone(&snapshot)));
        snapshot
    }

    /// Age of the current snapshot, if any.
    #[must_use]
    pub fn age(&self) -> Option<Duration> {
        self.snapshot().map(|s| s.age_at(Utc::now()))
    }

    /// Whether the snapshot is older than `threshold` (or missing).
    #[must_use]
    pub fn is_stale(&self, threshold: Duration) -> bool {
        self.is_stale_at(threshold, Utc::now())
    }

    /// [`is_stale`](Self::is_stale) evaluated at an explicit instant.
    #[must_use]
    pub fn is_stale_at(&self, threshold: Duration, now: DateTime<Utc>) -> bool {
        match self.snapshot() {
            Some(snapshot) => snapshot.age_at(now) >= threshold,
            None => true,
        }
    }

    /// Fetch `pairs` and replace the snapshot on success.
    ///
    /// On failure the previous snapshot is left untouched and the upstream
    /// classification is returned.
    pub async fn refresh(
        &self,
        client: &dyn NetworkClient,
        pairs: &[PairKey],
    ) -> Result<Arc<PriceSnapshot>, UpstreamError> {
        let quote = match client.fetch_prices(pairs).await {
            Ok(quote) => quote,
            Err(e) => {
                warn!(client = client.name(), kind = e.kind(), error = %e, "Price refresh failed");
                return Err(e);
            }
        };

        if quote.prices.is_empty() && !pairs.is_empty() {
            let e = UpstreamError::MalformedResponse("price response contained no rates".into());
            warn!(client = client.name(), error = %e, "Price refresh failed");
            return Err(e);
        }

        let fetched_at = quote.fetched_at.unwrap_or_else(Utc::now);
        let snapshot = self.replace(PriceSnapshot::new(quote.prices, fetched_at));
        debug!(pairs = snapshot.len(), %fetched_at, "Price snapshot replaced");
        Ok(snapshot)
    }
}

impl Default for PriceCache {
    fn default() -> Self {
        Self::new()
    }
}
