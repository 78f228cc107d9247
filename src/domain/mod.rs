//! Network-agnostic domain types: wallets, sessions and price snapshots.

pub mod error;
pub mod id;
pub mod money;
pub mod network;
pub mod price;
pub mod session;
pub mod wallet;

pub use error::DomainError;
pub use id::{Address, UserId, WalletId};
pub use money::{Amount, Rate};
pub use network::{parse_networks, Network};
pub use price::{PairKey, PriceSnapshot};
pub use session::{
    GenerationSession, NetworkFailure, NetworkOutcome, Outcome, SessionStatus,
};
pub use wallet::{WalletRecord, WalletStatus};
