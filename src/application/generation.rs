//! Wallet generation coordinator.
//!
//! Provisions wallets on several networks at once and folds the independent
//! per-network results into one observable [`GenerationSession`].
//!
//! # Lifecycle
//!
//! ```text
//! generate({BTC, ETH})
//!     |
//!     +-- validate (no upstream call on rejection)
//!     +-- session = Generating, records -> Pending
//!     +-- BTC: create ──────────────────────────────> Active
//!     +-- ETH: create ─x─ (delay) ─ create ─────────> Active
//!     |                 └─ errors += ETH
//!     +-- join: every target settled -> Success | Error
//! ```
//!
//! Each round runs on its own task that polls every per-network attempt
//! future, so completions are applied to the store and the session one at a
//! time. Callers await the round's handle; a caller that goes away never
//! leaves the session stuck in `Generating`.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::store::WalletStore;
use crate::domain::{
    DomainError, GenerationSession, Network, NetworkOutcome, Outcome, SessionStatus,
    WalletRecord, WalletStatus,
};
use crate::port::outbound::upstream::{NetworkClient, UpstreamError};

/// Provisioning limits.
#[derive(Debug, Clone)]
pub struct GenerationPolicy {
    /// Networks that may be requested.
    pub supported_networks: BTreeSet<Network>,
    /// Automatic retries after the first failed attempt of a round.
    pub auto_retries: u32,
    /// Fixed delay before an automatic retry.
    pub retry_delay: Duration,
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self {
            supported_networks: Network::ALL.into_iter().collect(),
            auto_retries: 1,
            retry_delay: Duration::from_millis(1_500),
        }
    }
}

impl GenerationPolicy {
    /// Total creation attempts per network per round.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.auto_retries + 1
    }
}

/// Drives wallet creation and owns the generation session.
pub struct GenerationCoordinator {
    policy: GenerationPolicy,
    client: Arc<dyn NetworkClient>,
    store: Arc<WalletStore>,
    session: watch::Sender<GenerationSession>,
}

impl GenerationCoordinator {
    pub fn new(
        policy: GenerationPolicy,
        client: Arc<dyn NetworkClient>,
        store: Arc<WalletStore>,
    ) -> Self {
        let (session, _rx) = watch::channel(GenerationSession::idle());
        Self {
            policy,
            client,
            store,
            session,
        }
    }

    #[must_use]
    pub fn policy(&self) -> &GenerationPolicy {
        &self.policy
    }

    /// Current session state.
    #[must_use]
    pub fn session(&self) -> GenerationSession {
        self.session.borrow().clone()
    }

    /// Subscribe to session transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<GenerationSession> {
        self.session.subscribe()
    }

    /// Provision wallets on `networks` and wait for the session to settle.
    ///
    /// Per-network failures never surface as `Err`; they are recorded in the
    /// returned session.
    ///
    /// # Errors
    ///
    /// Rejects the request before any upstream call when the set is empty,
    /// contains an unsupported network, or a session is already generating.
    pub async fn generate(
        self: &Arc<Self>,
        networks: BTreeSet<Network>,
    ) -> Result<GenerationSession, DomainError> {
        self.validate(&networks)?;

        let already_active = self.store.active_networks();
        let mut started = false;
        self.session.send_if_modified(|session| {
            if session.status() == SessionStatus::Generating {
                return false;
            }
            *session = GenerationSession::start(networks.clone(), &already_active);
            started = true;
            true
        });
        if !started {
            return Err(DomainError::GenerationInProgress);
        }

        let outstanding = self.session.borrow().outstanding();
        info!(
            targets = ?networks,
            already_active = ?already_active,
            outstanding = outstanding.len(),
            "Wallet generation started"
        );

        let round = self.spawn_round(outstanding);
        Ok(self.join_round(round).await)
    }

    /// Retry networks of the current session that are errored, or pending
    /// with no attempt running.
    ///
    /// Returns `None` without touching the session when nothing needs a
    /// retry, including while a round is still generating.
    pub async fn retry_generation(self: &Arc<Self>) -> Option<GenerationSession> {
        let candidates: BTreeSet<Network> = {
            let session = self.session.borrow();
            if session.status() == SessionStatus::Generating {
                return None;
            }
            session
                .outstanding()
                .into_iter()
                .filter(|n| {
                    self.store
                        .by_network(*n)
                        .is_some_and(|r| r.status() != WalletStatus::Active)
                })
                .collect()
        };
        if candidates.is_empty() {
            debug!("Retry requested with nothing to retry");
            return None;
        }

        let mut resumed = false;
        self.session.send_if_modified(|session| {
            if session.status() == SessionStatus::Generating {
                return false;
            }
            session.resume();
            resumed = true;
            true
        });
        if !resumed {
            return None;
        }

        info!(networks = ?candidates, "Retrying wallet generation");
        let round = self.spawn_round(candidates);
        Some(self.join_round(round).await)
    }

    /// Reset a settled session to idle. No-op while generating.
    pub fn dismiss(&self) -> bool {
        self.session.send_if_modified(|session| {
            if !session.status().is_terminal() {
                return false;
            }
            *session = GenerationSession::idle();
            true
        })
    }

    fn validate(&self, networks: &BTreeSet<Network>) -> Result<(), DomainError> {
        if networks.is_empty() {
            return Err(DomainError::EmptyNetworkSet);
        }
        if let Some(network) = networks
            .iter()
            .find(|n| !self.policy.supported_networks.contains(n))
        {
            return Err(DomainError::UnsupportedNetwork { network: *network });
        }
        Ok(())
    }

    /// Reset `networks` to pending and provision them on a dedicated task
    /// that settles the session when every attempt has an outcome.
    fn spawn_round(self: &Arc<Self>, networks: BTreeSet<Network>) -> JoinHandle<GenerationSession> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut records = Vec::with_capacity(networks.len());
            for network in networks {
                records.push(this.store.ensure_pending(network).await);
            }
            this.run_round(records).await;
            this.settle()
        })
    }

    async fn join_round(&self, round: JoinHandle<GenerationSession>) -> GenerationSession {
        match round.await {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "Generation round task failed");
                self.settle()
            }
        }
    }

    /// Run one attempt loop per record and apply outcomes as they arrive.
    async fn run_round(&self, records: Vec<WalletRecord>) {
        let mut attempts: FuturesUnordered<_> = records
            .into_iter()
            .map(|record| async move {
                let result = self.provision(record.network()).await;
                (record, result)
            })
            .collect();

        while let Some((record, result)) = attempts.next().await {
            self.apply(&record, result).await;
        }
    }

    /// Create a wallet on `network`, spending the automatic retry budget on
    /// retryable failures. Every failed attempt is appended to the session.
    async fn provision(&self, network: Network) -> NetworkOutcome {
        let user_id = self.store.user_id().clone();
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.client.create_wallet(network, &user_id).await {
                Ok(address) => {
                    info!(network = %network, attempt, address = %address.short(), "Wallet created");
                    return NetworkOutcome {
                        network,
                        outcome: Outcome::Active(address),
                    };
                }
                Err(e) => {
                    let retryable = e.is_retryable();
                    self.session
                        .send_modify(|s| s.record_failure(network, e.to_string(), retryable));

                    if !retryable || attempt >= max_attempts {
                        warn!(
                            network = %network,
                            attempt,
                            kind = e.kind(),
                            error = %e,
                            "Wallet creation failed"
                        );
                        return NetworkOutcome {
                            network,
                            outcome: Outcome::Failed(format!(
                                "creation failed after {attempt} attempt(s): {e}"
                            )),
                        };
                    }

                    let delay = self.retry_delay(&e);
                    debug!(network = %network, attempt, delay_ms = delay.as_millis() as u64, error = %e, "Retrying wallet creation");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn retry_delay(&self, error: &UpstreamError) -> Duration {
        match error {
            UpstreamError::RateLimited {
                retry_after: Some(after),
            } => (*after).max(self.policy.retry_delay),
            _ => self.policy.retry_delay,
        }
    }

    async fn apply(&self, record: &WalletRecord, result: NetworkOutcome) {
        let network = result.network;
        match result.outcome {
            Outcome::Active(address) => {
                if self.store.activate(record.id(), address).await.is_some() {
                    self.session.send_modify(|s| s.record_completed(network));
                } else {
                    warn!(network = %network, wallet = %record.id(), "Created wallet no longer pending, outcome dropped");
                }
            }
            Outcome::Failed(reason) => {
                self.store.fail(record.id()).await;
                debug!(network = %network, reason = %reason, "Wallet record marked as error");
            }
        }
    }

    fn settle(&self) -> GenerationSession {
        self.session.send_modify(GenerationSession::finish);
        let session = self.session();
        info!(
            status = %session.status(),
            completed = session.completed().len(),
            targets = session.target_networks().len(),
            errors = session.errors().len(),
            "Wallet generation settled"
        );
        session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::outbound::memory::MemoryWalletRepository;
    use crate::testkit::client::ScriptedClient;
    use crate::testkit::domain::{active_wallet, user};
    use rust_decimal_macros::dec;

    fn policy() -> GenerationPolicy {
        GenerationPolicy {
            retry_delay: Duration::from_millis(1),
            ..GenerationPolicy::default()
        }
    }

    fn coordinator(client: Arc<ScriptedClient>) -> (Arc<GenerationCoordinator>, Arc<WalletStore>) {
        let store = Arc::new(WalletStore::new(
            user(),
            Arc::new(MemoryWalletRepository::new()),
        ));
        (
            Arc::new(GenerationCoordinator::new(policy(), client, store.clone())),
            store,
        )
    }

    fn set(networks: &[Network]) -> BTreeSet<Network> {
        networks.iter().copied().collect()
    }

    #[tokio::test]
    async fn all_networks_succeed() {
        let client = Arc::new(ScriptedClient::new());
        let (coordinator, store) = coordinator(client.clone());

        let session = coordinator
            .generate(set(&[Network::Bitcoin, Network::Solana]))
            .await
            .unwrap();

        assert_eq!(session.status(), SessionStatus::Success);
        assert_eq!(session.completed(), &set(&[Network::Bitcoin, Network::Solana]));
        assert!(session.errors().is_empty());
        assert_eq!(store.active().len(), 2);
        assert_eq!(client.create_calls(), 2);
    }

    #[tokio::test]
    async fn empty_request_is_rejected_without_calls() {
        let client = Arc::new(ScriptedClient::new());
        let (coordinator, store) = coordinator(client.clone());

        let err = coordinator.generate(BTreeSet::new()).await.unwrap_err();

        assert_eq!(err, DomainError::EmptyNetworkSet);
        assert_eq!(client.create_calls(), 0);
        assert!(store.is_empty());
        assert_eq!(coordinator.session().status(), SessionStatus::Idle);
    }

    #[tokio::test]
    async fn unsupported_network_rejected_before_any_call() {
        let client = Arc::new(ScriptedClient::new());
        let store = Arc::new(WalletStore::new(
            user(),
            Arc::new(MemoryWalletRepository::new()),
        ));
        let coordinator = Arc::new(GenerationCoordinator::new(
            GenerationPolicy {
                supported_networks: set(&[Network::Bitcoin]),
                ..policy()
            },
            client.clone(),
            store.clone(),
        ));

        let err = coordinator
            .generate(set(&[Network::Bitcoin, Network::Tron]))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            DomainError::UnsupportedNetwork {
                network: Network::Tron
            }
        );
        assert_eq!(client.create_calls(), 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn terminal_failure_skips_automatic_retry() {
        let client = Arc::new(ScriptedClient::new().with_creation(
            Network::Ethereum,
            vec![Err(UpstreamError::QuotaExceeded("limit reached".into()))],
        ));
        let (coordinator, store) = coordinator(client.clone());

        let session = coordinator
            .generate(set(&[Network::Ethereum]))
            .await
            .unwrap();

        assert_eq!(session.status(), SessionStatus::Error);
        assert_eq!(client.create_calls_for(Network::Ethereum), 1);
        assert_eq!(session.errors().len(), 1);
        assert!(!session.errors()[0].retryable);
        assert_eq!(
            store.by_network(Network::Ethereum).unwrap().status(),
            WalletStatus::Error
        );
    }

    #[tokio::test]
    async fn already_active_network_counts_as_completed() {
        let repo = Arc::new(MemoryWalletRepository::with_records(vec![active_wallet(
            Network::Bitcoin,
            "bc1q",
            dec!(1),
        )]));
        let store = Arc::new(WalletStore::new(user(), repo));
        store.load().await.unwrap();
        let client = Arc::new(ScriptedClient::new());
        let coordinator = Arc::new(GenerationCoordinator::new(policy(), client.clone(), store.clone()));

        let session = coordinator
            .generate(set(&[Network::Bitcoin, Network::Ethereum]))
            .await
            .unwrap();

        assert_eq!(session.status(), SessionStatus::Success);
        assert_eq!(client.create_calls_for(Network::Bitcoin), 0);
        assert_eq!(store.len(), 2);
        assert_eq!(
            store.by_network(Network::Bitcoin).unwrap().balance(),
            dec!(1)
        );
    }

    #[tokio::test]
    async fn second_generate_while_running_is_rejected() {
        let client = Arc::new(ScriptedClient::new());
        client.hold();
        let (coordinator, _store) = coordinator(client.clone());

        let running = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.generate(set(&[Network::Bitcoin])).await })
        };
        let mut rx = coordinator.subscribe();
        rx.wait_for(|s| s.status() == SessionStatus::Generating)
            .await
            .unwrap();

        let err = coordinator
            .generate(set(&[Network::Ethereum]))
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::GenerationInProgress);

        client.release();
        let session = running.await.unwrap().unwrap();
        assert_eq!(session.status(), SessionStatus::Success);
        assert_eq!(client.create_calls_for(Network::Ethereum), 0);
    }

    #[tokio::test]
    async fn new_session_clears_previous_errors() {
        let client = Arc::new(ScriptedClient::new().failing_times(Network::Solana, 2));
        let (coordinator, _store) = coordinator(client);

        let first = coordinator.generate(set(&[Network::Solana])).await.unwrap();
        assert_eq!(first.errors().len(), 2);

        let second = coordinator.generate(set(&[Network::Solana])).await.unwrap();
        assert_eq!(second.status(), SessionStatus::Success);
        assert!(second.errors().is_empty());
    }

    #[tokio::test]
    async fn retry_after_exhaustion_recovers_network() {
        let client = Arc::new(ScriptedClient::new().failing_times(Network::Solana, 2));
        let (coordinator, store) = coordinator(client.clone());

        let session = coordinator
            .generate(set(&[Network::Bitcoin, Network::Solana]))
            .await
            .unwrap();
        assert_eq!(session.status(), SessionStatus::Error);

        let retried = coordinator.retry_generation().await.unwrap();

        assert_eq!(retried.status(), SessionStatus::Success);
        assert_eq!(retried.errors().len(), 2);
        assert_eq!(client.create_calls_for(Network::Bitcoin), 1);
        assert_eq!(client.create_calls_for(Network::Solana), 3);
        assert!(store.by_network(Network::Solana).unwrap().is_active());
    }

    #[tokio::test]
    async fn dismiss_only_clears_settled_sessions() {
        let client = Arc::new(ScriptedClient::new());
        let (coordinator, _store) = coordinator(client);

        assert!(!coordinator.dismiss());
        coordinator.generate(set(&[Network::Bitcoin])).await.unwrap();
        assert!(coordinator.dismiss());
        assert_eq!(coordinator.session(), GenerationSession::idle());
    }

    #[tokio::test]
    async fn rate_limit_retry_waits_at_least_retry_after() {
        let client = Arc::new(ScriptedClient::new().with_creation(
            Network::Bitcoin,
            vec![Err(UpstreamError::RateLimited {
                retry_after: Some(Duration::from_millis(30)),
            })],
        ));
        let (coordinator, _store) = coordinator(client);

        let started = std::time::Instant::now();
        let session = coordinator.generate(set(&[Network::Bitcoin])).await.unwrap();

        assert_eq!(session.status(), SessionStatus::Success);
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn dropped_caller_still_settles_the_session() {
        let client = Arc::new(ScriptedClient::new());
        client.hold();
        let (coordinator, store) = coordinator(client.clone());

        let abandoned = tokio::time::timeout(
            Duration::from_millis(20),
            coordinator.generate(set(&[Network::Bitcoin])),
        )
        .await;
        assert!(abandoned.is_err());
        assert_eq!(coordinator.session().status(), SessionStatus::Generating);

        client.release();
        let mut rx = coordinator.subscribe();
        let settled = tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|s| s.status().is_terminal()),
        )
        .await
        .expect("round settles without its caller")
        .unwrap()
        .clone();
        assert_eq!(settled.status(), SessionStatus::Success);
        assert!(store.by_network(Network::Bitcoin).unwrap().is_active());

        let again = coordinator
            .generate(set(&[Network::Bitcoin, Network::Ethereum]))
            .await
            .unwrap();
        assert_eq!(again.status(), SessionStatus::Success);
        assert_eq!(client.create_calls_for(Network::Bitcoin), 1);
    }
}
