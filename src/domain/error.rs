//! Domain validation errors.
//!
//! These errors are returned before any upstream call is made, so a rejected
//! request never leaves a partial session or a stray wallet record behind.
//!
//! # Examples
//!
//! ```
//! use coinkeeper::domain::error::DomainError;
//! use coinkeeper::domain::network::Network;
//!
//! let result = "DOGE".parse::<Network>();
//! assert!(matches!(result, Err(DomainError::UnknownNetwork { .. })));
//! ```

use thiserror::Error;

use super::network::Network;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The identifier does not name any known network.
    #[error("unknown network identifier '{id}'")]
    UnknownNetwork {
        /// The identifier that failed to parse.
        id: String,
    },

    /// The network is known but not enabled for provisioning.
    #[error("network {network} is not supported for wallet generation")]
    UnsupportedNetwork {
        /// The rejected network.
        network: Network,
    },

    /// A generation request must target at least one network.
    #[error("at least one network must be requested")]
    EmptyNetworkSet,

    /// A generation session is already running.
    #[error("a generation session is already in progress")]
    GenerationInProgress,

    /// The wallet identifier is not present in the store.
    #[error("wallet {id} not found")]
    WalletNotFound {
        /// The missing wallet identifier.
        id: String,
    },
}
