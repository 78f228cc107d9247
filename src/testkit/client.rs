//! Scripted [`NetworkClient`] for tests.
//!
//! - Creation results are queued per network; once a queue is empty the
//!   client succeeds with a deterministic address (`btc-addr-1`, ...).
//! - Balance results are fixed per address and default to zero.
//! - Price requests return the configured rates for the requested pairs, or
//!   a sticky failure set with [`ScriptedClient::fail_prices`].
//! - [`ScriptedClient::hold`] parks every request at a gate until
//!   [`ScriptedClient::release`], so tests can observe in-flight state.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::sync::watch;

use crate::domain::{Address, Amount, Network, PairKey, Rate, UserId};
use crate::port::outbound::upstream::{NetworkClient, PriceQuote, UpstreamError};

pub struct ScriptedClient {
    creation: Mutex<HashMap<Network, VecDeque<Result<Address, UpstreamError>>>>,
    balances: Mutex<HashMap<String, Result<Amount, UpstreamError>>>,
    prices: Mutex<HashMap<PairKey, Rate>>,
    price_failure: Mutex<Option<UpstreamError>>,
    create_counts: Mutex<HashMap<Network, u32>>,
    create_calls: AtomicU32,
    balance_calls: AtomicU32,
    price_calls: AtomicU32,
    latency: Duration,
    gate: watch::Sender<bool>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        let (gate, _rx) = watch::channel(true);
        Self {
            creation: Mutex::new(HashMap::new()),
            balances: Mutex::new(HashMap::new()),
            prices: Mutex::new(HashMap::new()),
            price_failure: Mutex::new(None),
            create_counts: Mutex::new(HashMap::new()),
            create_calls: AtomicU32::new(0),
            balance_calls: AtomicU32::new(0),
            price_calls: AtomicU32::new(0),
            latency: Duration::ZERO,
            gate,
        }
    }

    /// Queue creation results for `network`, consumed one per attempt.
    pub fn with_creation(
        self,
        network: Network,
        results: Vec<Result<Address, UpstreamError>>,
    ) -> Self {
        self.creation.lock().insert(network, results.into());
        self
    }

    /// Queue `failures` transient failures for `network` before succeeding.
    pub fn failing_times(self, network: Network, failures: usize) -> Self {
        let results = (0..failures)
            .map(|i| {
                Err(UpstreamError::NetworkUnavailable(format!(
                    "attempt {} timed out",
                    i + 1
                )))
            })
            .collect();
        self.with_creation(network, results)
    }

    pub fn with_balance(self, address: &str, balance: Amount) -> Self {
        self.set_balance(address, Ok(balance));
        self
    }

    pub fn with_price(self, pair: PairKey, rate: Rate) -> Self {
        self.prices.lock().insert(pair, rate);
        self
    }

    /// Delay every request by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn set_balance(&self, address: &str, result: Result<Amount, UpstreamError>) {
        self.balances.lock().insert(address.to_string(), result);
    }

    pub fn set_price(&self, pair: PairKey, rate: Rate) {
        self.prices.lock().insert(pair, rate);
    }

    /// Make every price request fail with `error` until cleared.
    pub fn fail_prices(&self, error: UpstreamError) {
        *self.price_failure.lock() = Some(error);
    }

    pub fn clear_price_failure(&self) {
        *self.price_failure.lock() = None;
    }

    /// Park subsequent requests until [`release`](Self::release).
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    pub fn create_calls(&self) -> u32 {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls_for(&self, network: Network) -> u32 {
        self.create_counts.lock().get(&network).copied().unwrap_or(0)
    }

    pub fn balance_calls(&self) -> u32 {
        self.balance_calls.load(Ordering::SeqCst)
    }

    pub fn price_calls(&self) -> u32 {
        self.price_calls.load(Ordering::SeqCst)
    }

    async fn pass_gate(&self) {
        let mut rx = self.gate.subscribe();
        // The sender lives in self, so the channel cannot close here.
        let _ = rx.wait_for(|open| *open).await;
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl Default for ScriptedClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkClient for ScriptedClient {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn create_wallet(
        &self,
        network: Network,
        _user_id: &UserId,
    ) -> Result<Address, UpstreamError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let attempt = {
            let mut counts = self.create_counts.lock();
            let count = counts.entry(network).or_insert(0);
            *count += 1;
            *count
        };
        self.pass_gate().await;

        let scripted = self
            .creation
            .lock()
            .get_mut(&network)
            .and_then(VecDeque::pop_front);
        scripted.unwrap_or_else(|| {
            Ok(Address::new(format!(
                "{}-addr-{attempt}",
                network.as_str().to_ascii_lowercase()
            )))
        })
    }

    async fn fetch_balance(
        &self,
        _network: Network,
        address: &Address,
    ) -> Result<Amount, UpstreamError> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        self.pass_gate().await;

        self.balances
            .lock()
            .get(address.as_str())
            .cloned()
            .unwrap_or(Ok(Decimal::ZERO))
    }

    async fn fetch_prices(&self, pairs: &[PairKey]) -> Result<PriceQuote, UpstreamError> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        self.pass_gate().await;

        if let Some(error) = self.price_failure.lock().clone() {
            return Err(error);
        }
        let prices = self.prices.lock();
        Ok(PriceQuote {
            prices: pairs
                .iter()
                .filter_map(|p| prices.get(p).map(|rate| (p.clone(), *rate)))
                .collect(),
            fetched_at: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn scripted_creation_then_default_success() {
        let client = ScriptedClient::new().failing_times(Network::Ethereum, 1);
        let user = UserId::from("u");

        assert!(client.create_wallet(Network::Ethereum, &user).await.is_err());
        let address = client.create_wallet(Network::Ethereum, &user).await.unwrap();
        assert_eq!(address.as_str(), "eth-addr-2");
        assert_eq!(client.create_calls_for(Network::Ethereum), 2);
    }

    #[tokio::test]
    async fn prices_only_include_requested_pairs() {
        let client = ScriptedClient::new()
            .with_price(Network::Bitcoin.pair("USD"), dec!(1))
            .with_price(Network::Solana.pair("USD"), dec!(2));

        let quote = client
            .fetch_prices(&[Network::Solana.pair("USD")])
            .await
            .unwrap();
        assert_eq!(quote.prices.len(), 1);
        assert_eq!(client.price_calls(), 1);
    }
}
