//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`client`] - `ScriptedClient`, a [`NetworkClient`](crate::port::outbound::upstream::NetworkClient)
//!   with scripted creation outcomes, fixed balances and prices, call
//!   counters and a request gate.
//! - [`domain`] - Builders for wallet records and price snapshots.

pub mod client;
pub mod domain;
