//! Wallet generation configuration.

use std::collections::BTreeSet;
use std::time::Duration;

use serde::Deserialize;

use crate::application::generation::GenerationPolicy;
use crate::domain::Network;

/// Provisioning policy as written in the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    /// Networks users may provision.
    #[serde(default = "default_supported_networks")]
    pub supported_networks: Vec<Network>,
    /// Automatic retries per network after the first failed attempt.
    #[serde(default = "default_auto_retries")]
    pub auto_retries: u32,
    /// Fixed delay before an automatic retry (milliseconds).
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_supported_networks() -> Vec<Network> {
    vec![Network::Bitcoin, Network::Ethereum, Network::Solana]
}

const fn default_auto_retries() -> u32 {
    1
}

const fn default_retry_delay_ms() -> u64 {
    1_500
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            supported_networks: default_supported_networks(),
            auto_retries: default_auto_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl GenerationConfig {
    #[must_use]
    pub fn supported(&self) -> BTreeSet<Network> {
        self.supported_networks.iter().copied().collect()
    }

    #[must_use]
    pub fn to_policy(&self) -> GenerationPolicy {
        GenerationPolicy {
            supported_networks: self.supported(),
            auto_retries: self.auto_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}
