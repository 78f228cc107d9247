//! Supported blockchain networks.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::DomainError;
use super::price::PairKey;

/// A distinct blockchain with its own address format and balance source.
///
/// The identifier doubles as the ticker of the network's native asset, which
/// is how price pairs are keyed (`BTC_USD`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Network {
    #[serde(rename = "BTC")]
    Bitcoin,
    #[serde(rename = "ETH")]
    Ethereum,
    #[serde(rename = "SOL")]
    Solana,
    #[serde(rename = "BNB")]
    BnbChain,
    #[serde(rename = "MATIC")]
    Polygon,
    #[serde(rename = "TRX")]
    Tron,
}

impl Network {
    /// Every network known to the crate, in display order.
    pub const ALL: [Network; 6] = [
        Network::Bitcoin,
        Network::Ethereum,
        Network::Solana,
        Network::BnbChain,
        Network::Polygon,
        Network::Tron,
    ];

    /// Stable identifier used on the wire, in storage and in price pairs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bitcoin => "BTC",
            Self::Ethereum => "ETH",
            Self::Solana => "SOL",
            Self::BnbChain => "BNB",
            Self::Polygon => "MATIC",
            Self::Tron => "TRX",
        }
    }

    /// Human-readable chain name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Bitcoin => "Bitcoin",
            Self::Ethereum => "Ethereum",
            Self::Solana => "Solana",
            Self::BnbChain => "BNB Smart Chain",
            Self::Polygon => "Polygon",
            Self::Tron => "Tron",
        }
    }

    /// Price pair of this network's native asset against `quote`.
    #[must_use]
    pub fn pair(self, quote: &str) -> PairKey {
        PairKey::new(self.as_str(), quote)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim();
        Self::ALL
            .into_iter()
            .find(|n| n.as_str().eq_ignore_ascii_case(id))
            .ok_or_else(|| DomainError::UnknownNetwork { id: id.to_string() })
    }
}

/// Parse a list of identifiers into a network set.
///
/// # Errors
///
/// Returns [`DomainError::UnknownNetwork`] for the first identifier that does
/// not name a network.
pub fn parse_networks<I, S>(ids: I) -> Result<BTreeSet<Network>, DomainError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ids.into_iter().map(|id| id.as_ref().parse()).collect()
}
