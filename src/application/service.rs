//! Wallet service facade.
//!
//! Wires the store, price cache, generation coordinator and refresh
//! scheduler for one user and exposes the commands and read-only
//! subscriptions the presentation layer uses.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use super::dashboard::{aggregate, total_in, DashboardTotals};
use super::generation::{GenerationCoordinator, GenerationPolicy};
use super::price_cache::PriceCache;
use super::refresh::{RefreshPolicy, RefreshReport, RefreshScheduler};
use super::store::WalletStore;
use crate::domain::{
    parse_networks, DomainError, GenerationSession, Network, PriceSnapshot, UserId, WalletId,
    WalletRecord,
};
use crate::error::Result;
use crate::port::outbound::store::WalletRepository;
use crate::port::outbound::upstream::NetworkClient;

/// Everything one user's wallet dashboard needs.
pub struct WalletService {
    store: Arc<WalletStore>,
    prices: Arc<PriceCache>,
    generation: Arc<GenerationCoordinator>,
    refresh: Arc<RefreshScheduler>,
    display_currency: String,
    totals: Arc<watch::Sender<DashboardTotals>>,
    totals_task: Mutex<Option<JoinHandle<()>>>,
}

impl WalletService {
    /// Build a service from explicit policies.
    pub fn new(
        user_id: UserId,
        generation: GenerationPolicy,
        refresh: RefreshPolicy,
        display_currency: impl Into<String>,
        client: Arc<dyn NetworkClient>,
        repository: Arc<dyn WalletRepository>,
    ) -> Self {
        let store = Arc::new(WalletStore::new(user_id, repository));
        let prices = Arc::new(PriceCache::new());
        let generation = Arc::new(GenerationCoordinator::new(
            generation,
            Arc::clone(&client),
            Arc::clone(&store),
        ));
        let refresh = Arc::new(RefreshScheduler::new(
            refresh,
            client,
            Arc::clone(&store),
            Arc::clone(&prices),
        ));
        let (totals, _rx) = watch::channel(aggregate(&[], None));

        Self {
            store,
            prices,
            generation,
            refresh,
            display_currency: display_currency.into().to_ascii_uppercase(),
            totals: Arc::new(totals),
            totals_task: Mutex::new(None),
        }
    }

    /// Load persisted wallets. Returns the number of records loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository cannot be read.
    pub async fn load(&self) -> Result<usize> {
        self.store.load().await
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        self.store.user_id()
    }

    /// Provision wallets on `networks`.
    ///
    /// # Errors
    ///
    /// See [`GenerationCoordinator::generate`].
    pub async fn generate(
        &self,
        networks: BTreeSet<Network>,
    ) -> std::result::Result<GenerationSession, DomainError> {
        self.generation.generate(networks).await
    }

    /// Provision wallets on networks given by identifier (`"BTC"`, ...).
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::UnknownNetwork`] for an unrecognised identifier,
    /// otherwise the same errors as [`generate`](Self::generate).
    pub async fn generate_ids<S: AsRef<str>>(
        &self,
        ids: &[S],
    ) -> std::result::Result<GenerationSession, DomainError> {
        let networks = parse_networks(ids)?;
        self.generate(networks).await
    }

    pub async fn retry_generation(&self) -> Option<GenerationSession> {
        self.generation.retry_generation().await
    }

    /// Reset a settled session to idle.
    pub fn dismiss_session(&self) -> bool {
        self.generation.dismiss()
    }

    #[must_use]
    pub fn session(&self) -> GenerationSession {
        self.generation.session()
    }

    #[must_use]
    pub fn supported_networks(&self) -> &BTreeSet<Network> {
        &self.generation.policy().supported_networks
    }

    pub async fn refresh_all(&self) -> RefreshReport {
        self.refresh.refresh_all().await
    }

    pub fn start_auto_refresh(&self, interval: Duration) {
        self.refresh.start_auto_refresh(interval);
    }

    /// Start auto-refresh at the configured interval.
    pub fn start_default_auto_refresh(&self) {
        self.refresh.start_auto_refresh(self.refresh.policy().interval);
    }

    pub fn stop_auto_refresh(&self) -> bool {
        self.refresh.stop_auto_refresh()
    }

    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_refreshing()
    }

    /// Wait for a running refresh cycle to finish, e.g. before shutdown.
    pub async fn drain(&self) -> Option<RefreshReport> {
        self.refresh.drain().await
    }

    /// Delete a wallet record on explicit user request.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::WalletNotFound`] for an unknown ID or the
    /// repository error.
    pub async fn delete_wallet(&self, id: &WalletId) -> Result<WalletRecord> {
        self.store.delete(id).await
    }

    #[must_use]
    pub fn wallets(&self) -> Vec<WalletRecord> {
        self.store.all()
    }

    #[must_use]
    pub fn price_snapshot(&self) -> Option<Arc<PriceSnapshot>> {
        self.prices.snapshot()
    }

    #[must_use]
    pub fn price_age(&self) -> Option<Duration> {
        self.prices.age()
    }

    /// Whether the price snapshot is past the configured stale threshold.
    #[must_use]
    pub fn prices_stale(&self) -> bool {
        self.prices.is_stale(self.refresh.stale_threshold())
    }

    /// Totals over the current wallets and snapshot.
    #[must_use]
    pub fn totals(&self) -> DashboardTotals {
        let snapshot = self.prices.snapshot();
        aggregate(&self.store.all(), snapshot.as_deref())
    }

    #[must_use]
    pub fn display_currency(&self) -> &str {
        &self.display_currency
    }

    /// Active balance total in the configured display currency.
    #[must_use]
    pub fn display_total(&self) -> Option<Decimal> {
        let snapshot = self.prices.snapshot();
        total_in(&self.store.all(), snapshot.as_deref(), &self.display_currency)
    }

    #[must_use]
    pub fn subscribe_session(&self) -> watch::Receiver<GenerationSession> {
        self.generation.subscribe()
    }

    #[must_use]
    pub fn subscribe_wallets(&self) -> watch::Receiver<Vec<WalletRecord>> {
        self.store.subscribe()
    }

    #[must_use]
    pub fn subscribe_prices(&self) -> watch::Receiver<Option<Arc<PriceSnapshot>>> {
        self.prices.subscribe()
    }

    #[must_use]
    pub fn subscribe_reports(&self) -> watch::Receiver<Option<RefreshReport>> {
        self.refresh.subscribe_reports()
    }

    /// Subscribe to dashboard totals.
    ///
    /// The first call spawns the task that recomputes totals whenever the
    /// wallet list or price snapshot changes, so it must run inside a Tokio
    /// runtime.
    pub fn subscribe_totals(&self) -> watch::Receiver<DashboardTotals> {
        let mut task = self.totals_task.lock();
        if task.is_none() {
            self.totals.send_replace(self.totals());
            *task = Some(self.spawn_totals_task());
        }
        self.totals.subscribe()
    }

    fn spawn_totals_task(&self) -> JoinHandle<()> {
        let mut wallets = self.store.subscribe();
        let mut prices = self.prices.subscribe();
        let totals = Arc::clone(&self.totals);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = wallets.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    changed = prices.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
                let next = {
                    let wallets = wallets.borrow_and_update();
                    let prices = prices.borrow_and_update();
                    aggregate(&wallets, prices.as_deref())
                };
                totals.send_if_modified(|current| {
                    if *current == next {
                        return false;
                    }
                    *current = next;
                    true
                });
            }
            debug!("Totals task stopped");
        })
    }
}

impl Drop for WalletService {
    fn drop(&mut self) {
        self.refresh.stop_auto_refresh();
        if let Some(task) = self.totals_task.lock().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::memory::MemoryWalletRepository;
    use crate::domain::{SessionStatus, WalletStatus};
    use crate::testkit::client::ScriptedClient;
    use crate::testkit::domain::user;
    use rust_decimal_macros::dec;

    fn service(client: Arc<ScriptedClient>) -> WalletService {
        WalletService::new(
            user(),
            GenerationPolicy {
                retry_delay: Duration::from_millis(1),
                ..GenerationPolicy::default()
            },
            RefreshPolicy {
                pairs: Network::ALL.iter().map(|n| n.pair("USD")).collect(),
                ..RefreshPolicy::default()
            },
            "usd",
            client,
            Arc::new(MemoryWalletRepository::new()),
        )
    }

    #[tokio::test]
    async fn generate_by_id_rejects_unknown_network() {
        let client = Arc::new(ScriptedClient::new());
        let service = service(client.clone());

        let err = service.generate_ids(&["BTC", "DOGE"]).await.unwrap_err();

        assert_eq!(err, DomainError::UnknownNetwork { id: "DOGE".into() });
        assert_eq!(client.create_calls(), 0);
    }

    #[tokio::test]
    async fn generate_then_refresh_updates_totals() {
        let client = Arc::new(
            ScriptedClient::new()
                .with_balance("btc-addr-1", dec!(0.5))
                .with_price(Network::Bitcoin.pair("USD"), dec!(60000)),
        );
        let service = service(client);
        let mut totals = service.subscribe_totals();

        let session = service.generate_ids(&["btc"]).await.unwrap();
        assert_eq!(session.status(), SessionStatus::Success);
        assert_eq!(service.totals().total_balance_usd, None);

        let report = service.refresh_all().await;
        assert_eq!(report.refreshed, 1);

        let totals = totals
            .wait_for(|t| t.total_balance_usd == Some(dec!(30000)))
            .await
            .unwrap()
            .clone();
        assert_eq!(totals.active_count, 1);
        assert_eq!(service.display_currency(), "USD");
        assert_eq!(service.display_total(), Some(dec!(30000)));
        assert!(!service.prices_stale());
    }

    #[tokio::test]
    async fn retry_with_nothing_to_retry_is_noop() {
        let service = service(Arc::new(ScriptedClient::new()));
        service.generate_ids(&["ETH"]).await.unwrap();
        let before = service.session();

        assert!(service.retry_generation().await.is_none());
        assert_eq!(service.session(), before);
    }

    #[tokio::test]
    async fn delete_wallet_removes_record() {
        let service = service(Arc::new(ScriptedClient::new()));
        service.generate_ids(&["SOL"]).await.unwrap();
        let id = service.wallets()[0].id().clone();

        let removed = service.delete_wallet(&id).await.unwrap();

        assert_eq!(removed.status(), WalletStatus::Active);
        assert!(service.wallets().is_empty());
        assert_eq!(service.totals().total_balance_usd, Some(Decimal::ZERO));
    }

    #[tokio::test]
    async fn drain_lets_running_refresh_finish() {
        let client = Arc::new(ScriptedClient::new().with_balance("eth-addr-1", dec!(2)));
        let service = service(client.clone());
        service.generate_ids(&["ETH"]).await.unwrap();
        assert!(service.drain().await.is_none());

        client.hold();
        let abandoned =
            tokio::time::timeout(Duration::from_millis(20), service.refresh_all()).await;
        assert!(abandoned.is_err());
        assert!(service.is_refreshing());

        let releaser = {
            let client = client.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                client.release();
            })
        };
        let report = service.drain().await.expect("cycle was running");
        releaser.await.unwrap();

        assert_eq!(report.refreshed, 1);
        assert!(!service.is_refreshing());
        assert_eq!(service.wallets()[0].balance(), dec!(2));
    }
}
