//! Builders for domain values used across tests.

use std::collections::HashMap;

use chrono::Utc;

use crate::domain::{Address, Amount, Network, PriceSnapshot, Rate, UserId, WalletRecord};

/// The user every test wallet belongs to.
pub fn user() -> UserId {
    UserId::from("test-user")
}

/// A pending record for `network`.
pub fn pending_wallet(network: Network) -> WalletRecord {
    WalletRecord::pending(user(), network)
}

/// An active record with `address` and `balance`.
pub fn active_wallet(network: Network, address: &str, balance: Amount) -> WalletRecord {
    let mut record = WalletRecord::pending(user(), network);
    record.activate(Address::from(address));
    record.apply_balance(balance, Utc::now());
    record
}

/// An errored record for `network`.
pub fn errored_wallet(network: Network) -> WalletRecord {
    let mut record = WalletRecord::pending(user(), network);
    record.fail();
    record
}

/// A fresh snapshot quoting each network against USD.
pub fn usd_snapshot(rates: &[(Network, Rate)]) -> PriceSnapshot {
    let prices: HashMap<_, _> = rates
        .iter()
        .map(|(network, rate)| (network.pair("USD"), *rate))
        .collect();
    PriceSnapshot::new(prices, Utc::now())
}
