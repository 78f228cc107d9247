//! Coinkeeper - multi-network wallet provisioning and balance tracking.
//!
//! Provisions one wallet per blockchain network for a user, keeps balances
//! and USD prices fresh in the background, and aggregates them into
//! dashboard totals.
//!
//! # Architecture
//!
//! The crate follows a hexagonal layout:
//!
//! - [`domain`] - Network-agnostic types: wallet records, generation
//!   sessions, price snapshots
//! - [`port`] - Traits the application depends on (`NetworkClient`,
//!   `WalletRepository`)
//! - [`application`] - Generation coordinator, refresh scheduler, price
//!   cache, wallet store and dashboard aggregation
//! - [`adapter`] - HTTP and SQLite implementations of the ports, plus the CLI
//! - [`infrastructure`] - Configuration and runtime wiring
//! - [`error`] - Error types for the crate
//!
//! # Example
//!
//! ```no_run
//! use coinkeeper::infrastructure::bootstrap::build_service;
//! use coinkeeper::infrastructure::config::Config;
//!
//! # async fn example() -> coinkeeper::error::Result<()> {
//! let config = Config::load_or_default("coinkeeper.toml")?;
//! let service = build_service(&config).await?;
//! let session = service.generate_ids(&["BTC", "ETH"]).await?;
//! println!("{:?}", session.status());
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
