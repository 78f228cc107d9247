//! Wallet records and their provisioning lifecycle.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{Address, UserId, WalletId};
use super::money::Amount;
use super::network::Network;
use super::price::{convert, PriceSnapshot};

/// Provisioning status of a wallet record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalletStatus {
    /// Creation requested, no address assigned yet.
    Pending,
    /// Address assigned; balances are refreshed.
    Active,
    /// Creation failed after the retry budget was exhausted.
    Error,
}

impl WalletStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Error => "error",
        }
    }

    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for WalletStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WalletStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown wallet status '{other}'")),
        }
    }
}

/// One user address on one network.
///
/// `address` is set exactly when the record is [`WalletStatus::Active`].
/// The USD value is never stored; derive it with [`WalletRecord::balance_in`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletRecord {
    id: WalletId,
    user_id: UserId,
    network: Network,
    address: Option<Address>,
    balance: Amount,
    status: WalletStatus,
    last_updated: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl WalletRecord {
    /// Create a fresh pending record for `network`.
    #[must_use]
    pub fn pending(user_id: UserId, network: Network) -> Self {
        Self {
            id: WalletId::new(),
            user_id,
            network,
            address: None,
            balance: Decimal::ZERO,
            status: WalletStatus::Pending,
            last_updated: None,
            created_at: Utc::now(),
        }
    }

    /// Rebuild a record from persisted fields.
    ///
    /// An address without an active status (or the reverse) is normalized so
    /// the address/status invariant holds for loaded data too.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn restore(
        id: WalletId,
        user_id: UserId,
        network: Network,
        address: Option<Address>,
        balance: Amount,
        status: WalletStatus,
        last_updated: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let (address, status) = match (address, status) {
            (Some(address), WalletStatus::Active) => (Some(address), WalletStatus::Active),
            (None, WalletStatus::Active) => (None, WalletStatus::Pending),
            (_, other) => (None, other),
        };
        Self {
            id,
            user_id,
            network,
            address,
            balance,
            status,
            last_updated,
            created_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> &WalletId {
        &self.id
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn network(&self) -> Network {
        self.network
    }

    #[must_use]
    pub fn address(&self) -> Option<&Address> {
        self.address.as_ref()
    }

    #[must_use]
    pub fn balance(&self) -> Amount {
        self.balance
    }

    #[must_use]
    pub fn status(&self) -> WalletStatus {
        self.status
    }

    #[must_use]
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Balance valued in `quote` using `snapshot`.
    ///
    /// `None` when there is no snapshot or it lacks this network's pair.
    #[must_use]
    pub fn balance_in(&self, snapshot: Option<&PriceSnapshot>, quote: &str) -> Option<Decimal> {
        snapshot.and_then(|s| convert(self.balance, s, &self.network.pair(quote)))
    }

    /// Transition `Pending -> Active` with the assigned address.
    ///
    /// Returns false, leaving the record untouched, when the record is not
    /// pending.
    pub fn activate(&mut self, address: Address) -> bool {
        if self.status != WalletStatus::Pending {
            return false;
        }
        self.address = Some(address);
        self.balance = Decimal::ZERO;
        self.status = WalletStatus::Active;
        true
    }

    /// Mark a pending record as failed once its retry budget is spent.
    pub fn fail(&mut self) -> bool {
        if self.status != WalletStatus::Pending {
            return false;
        }
        self.status = WalletStatus::Error;
        true
    }

    /// Put an errored record back into `Pending` for another attempt.
    pub fn reset_pending(&mut self) -> bool {
        if self.status != WalletStatus::Error {
            return false;
        }
        self.status = WalletStatus::Pending;
        true
    }

    /// Record a successful balance fetch.
    pub fn apply_balance(&mut self, balance: Amount, at: DateTime<Utc>) -> bool {
        if !self.is_active() {
            return false;
        }
        self.balance = balance;
        self.last_updated = Some(at);
        true
    }
}
