//! Balance and price refresh scheduling.
//!
//! # Architecture
//!
//! ```text
//! refresh_all() ──┐
//! refresh_all() ──┼──> in-flight slot ──> spawned cycle ──> RefreshReport
//! auto-refresh  ──┘         (shared)           |
//!                                              +-- fetch_balance x N (join_all)
//!                                              +-- PriceCache::refresh (if stale)
//! ```
//!
//! A cycle runs on its own task. Callers await a shared handle to it, so a
//! caller that goes away never cancels a cycle, and concurrent triggers
//! receive the same report. The cycle task itself frees the in-flight slot
//! when it finishes, whether or not anyone is still waiting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use futures_util::future::{join_all, BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::price_cache::PriceCache;
use super::store::WalletStore;
use crate::domain::{Network, PairKey, WalletId};
use crate::port::outbound::upstream::{NetworkClient, UpstreamError};

/// Cadence, staleness and backoff settings.
#[derive(Debug, Clone)]
pub struct RefreshPolicy {
    pub interval: Duration,
    /// Snapshot age that triggers a price refetch. `None` uses the refresh
    /// interval in effect.
    pub price_stale_after: Option<Duration>,
    pub backoff_multiplier: f64,
    pub max_backoff: Duration,
    /// Run a cycle as soon as auto-refresh starts.
    pub refresh_on_start: bool,
    /// Pairs requested from the price service.
    pub pairs: Vec<PairKey>,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            price_stale_after: None,
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_secs(600),
            refresh_on_start: true,
            pairs: Vec::new(),
        }
    }
}

impl RefreshPolicy {
    /// Age at which the price snapshot is considered stale when refreshing
    /// every `interval`.
    #[must_use]
    pub fn stale_threshold(&self, interval: Duration) -> Duration {
        self.price_stale_after.unwrap_or(interval)
    }

    /// Delay before the next automatic cycle.
    ///
    /// Grows by `backoff_multiplier` after a cycle that should back off,
    /// capped at `max_backoff`, and drops back to `base` after any other
    /// cycle.
    #[must_use]
    pub fn next_delay(&self, base: Duration, current: Duration, report: &RefreshReport) -> Duration {
        if !report.should_back_off() {
            return base;
        }
        let cap = self.max_backoff.max(base);
        current.mul_f64(self.backoff_multiplier.max(1.0)).min(cap)
    }
}

/// A wallet whose balance could not be fetched in a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletFailure {
    pub wallet_id: WalletId,
    pub network: Network,
    pub error: UpstreamError,
}

/// What happened to the price snapshot during a cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PriceRefresh {
    /// A new snapshot replaced the old one.
    Updated,
    /// The snapshot was still fresh and no request was made.
    #[default]
    Fresh,
    /// The fetch failed; the previous snapshot (if any) remains in use.
    StaleDataOnly {
        error: UpstreamError,
        /// Age of the retained snapshot. `None` if prices were never fetched.
        age: Option<Duration>,
    },
}

/// Outcome of one refresh cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub refreshed: usize,
    pub failed: usize,
    pub failures: Vec<WalletFailure>,
    pub price: PriceRefresh,
}

impl RefreshReport {
    /// No wallet or price request failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && !matches!(self.price, PriceRefresh::StaleDataOnly { .. })
    }

    /// The upstream throttled us, or every request in the cycle failed.
    #[must_use]
    pub fn should_back_off(&self) -> bool {
        let price_error = match &self.price {
            PriceRefresh::StaleDataOnly { error, .. } => Some(error),
            _ => None,
        };
        let rate_limited = self.failures.iter().any(|f| f.error.is_rate_limited())
            || price_error.is_some_and(UpstreamError::is_rate_limited);

        let successes = self.refreshed + usize::from(self.price == PriceRefresh::Updated);
        let failures = self.failed + usize::from(price_error.is_some());
        rate_limited || (failures > 0 && successes == 0)
    }
}

type SharedCycle = Shared<BoxFuture<'static, RefreshReport>>;

/// The running cycle and the token its task uses to free the slot.
struct InFlight {
    id: u64,
    cycle: SharedCycle,
}

/// Handle for controlling the auto-refresh loop.
struct AutoRefreshHandle {
    shutdown_tx: mpsc::Sender<()>,
    interval: Duration,
}

/// Single-flight balance and price refresher with optional auto-refresh.
pub struct RefreshScheduler {
    policy: RefreshPolicy,
    client: Arc<dyn NetworkClient>,
    store: Arc<WalletStore>,
    prices: Arc<PriceCache>,
    in_flight: Mutex<Option<InFlight>>,
    next_cycle: AtomicU64,
    auto: Mutex<Option<AutoRefreshHandle>>,
    reports: watch::Sender<Option<RefreshReport>>,
}

impl RefreshScheduler {
    pub fn new(
        policy: RefreshPolicy,
        client: Arc<dyn NetworkClient>,
        store: Arc<WalletStore>,
        prices: Arc<PriceCache>,
    ) -> Self {
        let (reports, _rx) = watch::channel(None);
        Self {
            policy,
            client,
            store,
            prices,
            in_flight: Mutex::new(None),
            next_cycle: AtomicU64::new(0),
            auto: Mutex::new(None),
            reports,
        }
    }

    #[must_use]
    pub fn policy(&self) -> &RefreshPolicy {
        &self.policy
    }

    /// Subscribe to the report of every finished cycle.
    #[must_use]
    pub fn subscribe_reports(&self) -> watch::Receiver<Option<RefreshReport>> {
        self.reports.subscribe()
    }

    /// Whether a cycle is currently running.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.in_flight.lock().is_some()
    }

    /// Price staleness threshold for the refresh interval in effect: the
    /// running auto-refresh interval, else the policy interval.
    #[must_use]
    pub fn stale_threshold(&self) -> Duration {
        let interval = self.auto_refresh_interval().unwrap_or(self.policy.interval);
        self.policy.stale_threshold(interval)
    }

    /// Refresh every active wallet's balance and, if stale, the prices.
    ///
    /// Joins the running cycle when there is one.
    pub async fn refresh_all(self: &Arc<Self>) -> RefreshReport {
        let cycle = {
            let mut slot = self.in_flight.lock();
            match slot.as_ref() {
                Some(running) => {
                    debug!(cycle = running.id, "Joining in-flight refresh cycle");
                    running.cycle.clone()
                }
                None => {
                    let id = self.next_cycle.fetch_add(1, Ordering::Relaxed);
                    let cycle = self.spawn_cycle(id);
                    *slot = Some(InFlight {
                        id,
                        cycle: cycle.clone(),
                    });
                    cycle
                }
            }
        };

        cycle.await
    }

    /// Wait for the running cycle to finish. Returns its report, or `None`
    /// when no cycle is running.
    pub async fn drain(&self) -> Option<RefreshReport> {
        let cycle = self.in_flight.lock().as_ref().map(|r| r.cycle.clone())?;
        debug!("Draining in-flight refresh cycle");
        Some(cycle.await)
    }

    fn spawn_cycle(self: &Arc<Self>, id: u64) -> SharedCycle {
        let this = Arc::clone(self);
        let task = tokio::spawn(async move {
            let report = this.run_cycle().await;
            this.release_slot(id);
            this.reports.send_replace(Some(report.clone()));
            report
        });
        let weak = Arc::downgrade(self);
        async move {
            task.await.unwrap_or_else(|e| {
                error!(cycle = id, error = %e, "Refresh cycle task failed");
                if let Some(scheduler) = weak.upgrade() {
                    scheduler.release_slot(id);
                }
                RefreshReport::default()
            })
        }
        .boxed()
        .shared()
    }

    fn release_slot(&self, id: u64) {
        let mut slot = self.in_flight.lock();
        if slot.as_ref().is_some_and(|r| r.id == id) {
            *slot = None;
        }
    }

    async fn run_cycle(&self) -> RefreshReport {
        let wallets: Vec<_> = self
            .store
            .active()
            .into_iter()
            .filter_map(|w| w.address().cloned().map(|address| (w, address)))
            .collect();
        debug!(wallets = wallets.len(), "Refresh cycle started");

        let balances = join_all(wallets.iter().map(|(wallet, address)| async move {
            let result = self.client.fetch_balance(wallet.network(), address).await;
            (wallet, result)
        }));
        let (balances, price) = tokio::join!(balances, self.refresh_prices());

        let mut report = RefreshReport {
            price,
            ..RefreshReport::default()
        };
        let at = Utc::now();
        for (wallet, result) in balances {
            match result {
                Ok(balance) => {
                    if self.store.apply_balance(wallet.id(), balance, at).await.is_some() {
                        report.refreshed += 1;
                    } else {
                        debug!(wallet = %wallet.id(), "Wallet left active state during refresh");
                    }
                }
                Err(e) => {
                    warn!(
                        wallet = %wallet.id(),
                        network = %wallet.network(),
                        kind = e.kind(),
                        error = %e,
                        "Balance refresh failed"
                    );
                    report.failed += 1;
                    report.failures.push(WalletFailure {
                        wallet_id: wallet.id().clone(),
                        network: wallet.network(),
                        error: e,
                    });
                }
            }
        }

        info!(
            refreshed = report.refreshed,
            failed = report.failed,
            price = ?report.price,
            "Refresh cycle finished"
        );
        report
    }

    async fn refresh_prices(&self) -> PriceRefresh {
        if self.policy.pairs.is_empty() || !self.prices.is_stale(self.stale_threshold()) {
            return PriceRefresh::Fresh;
        }
        match self.prices.refresh(self.client.as_ref(), &self.policy.pairs).await {
            Ok(_) => PriceRefresh::Updated,
            Err(error) => PriceRefresh::StaleDataOnly {
                error,
                age: self.prices.age(),
            },
        }
    }

    /// Start periodic refresh every `interval`, restarting the loop if one
    /// is already running.
    pub fn start_auto_refresh(self: &Arc<Self>, interval: Duration) {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        if let Some(previous) = self.auto.lock().replace(AutoRefreshHandle {
            shutdown_tx,
            interval,
        }) {
            let _ = previous.shutdown_tx.try_send(());
        }

        let weak: Weak<Self> = Arc::downgrade(self);
        let first = if self.policy.refresh_on_start {
            Duration::ZERO
        } else {
            interval
        };
        info!(interval_ms = interval.as_millis() as u64, "Auto-refresh started");

        tokio::spawn(async move {
            let mut current = interval;
            let mut delay = first;

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Auto-refresh stopped");
                        break;
                    }

                    () = tokio::time::sleep(delay) => {
                        let Some(scheduler) = weak.upgrade() else {
                            debug!("Refresh scheduler dropped, stopping auto-refresh");
                            break;
                        };
                        let report = scheduler.refresh_all().await;
                        current = scheduler.policy.next_delay(interval, current, &report);
                        if current > interval {
                            warn!(delay_ms = current.as_millis() as u64, "Refresh backing off");
                        }
                        delay = current;
                    }
                }
            }
        });
    }

    /// Stop periodic refresh. A running cycle completes. Returns whether
    /// auto-refresh was running.
    pub fn stop_auto_refresh(&self) -> bool {
        match self.auto.lock().take() {
            Some(handle) => {
                let _ = handle.shutdown_tx.try_send(());
                true
            }
            None => false,
        }
    }

    /// Interval of the running auto-refresh loop.
    #[must_use]
    pub fn auto_refresh_interval(&self) -> Option<Duration> {
        self.auto.lock().as_ref().map(|h| h.interval)
    }
}
