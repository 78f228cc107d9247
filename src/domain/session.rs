//! Generation session state.
//!
//! A session is one user-initiated attempt to provision wallets across a set
//! of networks. Per-network results arrive independently and are folded into
//! the session; the terminal status is decided only once every target has an
//! outcome.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::Address;
use super::network::Network;

/// Aggregate status of a generation session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Generating,
    Success,
    Error,
}

impl SessionStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Generating => "generating",
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    /// True once the session has settled on success or error.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed creation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkFailure {
    pub network: Network,
    pub message: String,
    /// Whether the upstream classified the failure as transient.
    pub retryable: bool,
    pub at: DateTime<Utc>,
}

/// Final result of provisioning one network within a round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Active(Address),
    Failed(String),
}

/// Outcome tagged with the network it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkOutcome {
    pub network: Network,
    pub outcome: Outcome,
}

/// Observable state of the current generation attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSession {
    status: SessionStatus,
    target_networks: BTreeSet<Network>,
    completed: BTreeSet<Network>,
    errors: Vec<NetworkFailure>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl GenerationSession {
    /// An idle session with no targets.
    #[must_use]
    pub fn idle() -> Self {
        Self::default()
    }

    /// Begin a session for `targets`, crediting networks already active.
    #[must_use]
    pub fn start(targets: BTreeSet<Network>, already_active: &BTreeSet<Network>) -> Self {
        let completed = targets.intersection(already_active).copied().collect();
        Self {
            status: SessionStatus::Generating,
            target_networks: targets,
            completed,
            errors: Vec::new(),
            started_at: Some(Utc::now()),
            finished_at: None,
        }
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn target_networks(&self) -> &BTreeSet<Network> {
        &self.target_networks
    }

    #[must_use]
    pub fn completed(&self) -> &BTreeSet<Network> {
        &self.completed
    }

    #[must_use]
    pub fn errors(&self) -> &[NetworkFailure] {
        &self.errors
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    #[must_use]
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Errors recorded for one network, oldest first.
    pub fn errors_for(&self, network: Network) -> impl Iterator<Item = &NetworkFailure> {
        self.errors.iter().filter(move |e| e.network == network)
    }

    /// Targets that have not reached `Active`.
    #[must_use]
    pub fn outstanding(&self) -> BTreeSet<Network> {
        self.target_networks
            .difference(&self.completed)
            .copied()
            .collect()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completed == self.target_networks
    }

    /// Append a failed attempt.
    pub fn record_failure(&mut self, network: Network, message: impl Into<String>, retryable: bool) {
        self.errors.push(NetworkFailure {
            network,
            message: message.into(),
            retryable,
            at: Utc::now(),
        });
    }

    /// Mark `network` as provisioned.
    pub fn record_completed(&mut self, network: Network) {
        if self.target_networks.contains(&network) {
            self.completed.insert(network);
        }
    }

    /// Re-open a settled session for a retry round.
    pub fn resume(&mut self) {
        self.status = SessionStatus::Generating;
        self.finished_at = None;
    }

    /// Settle the session once every target has an outcome.
    pub fn finish(&mut self) {
        self.status = if self.is_complete() {
            SessionStatus::Success
        } else {
            SessionStatus::Error
        };
        self.finished_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(networks: &[Network]) -> BTreeSet<Network> {
        networks.iter().copied().collect()
    }

    #[test]
    fn start_credits_already_active_networks() {
        let session = GenerationSession::start(
            targets(&[Network::Bitcoin, Network::Ethereum]),
            &targets(&[Network::Bitcoin, Network::Solana]),
        );
        assert_eq!(session.status(), SessionStatus::Generating);
        assert_eq!(session.completed(), &targets(&[Network::Bitcoin]));
        assert_eq!(session.outstanding(), targets(&[Network::Ethereum]));
    }

    #[test]
    fn finish_succeeds_only_when_all_targets_completed() {
        let mut session =
            GenerationSession::start(targets(&[Network::Bitcoin, Network::Solana]), &BTreeSet::new());
        session.record_completed(Network::Bitcoin);
        session.record_failure(Network::Solana, "timeout", true);
        session.finish();
        assert_eq!(session.status(), SessionStatus::Error);

        session.resume();
        session.record_completed(Network::Solana);
        session.finish();
        assert_eq!(session.status(), SessionStatus::Success);
        assert_eq!(session.errors().len(), 1);
    }

    #[test]
    fn completed_ignores_non_targets() {
        let mut session = GenerationSession::start(targets(&[Network::Bitcoin]), &BTreeSet::new());
        session.record_completed(Network::Tron);
        assert!(session.completed().is_empty());
    }

    #[test]
    fn errors_for_filters_by_network() {
        let mut session =
            GenerationSession::start(targets(&[Network::Bitcoin, Network::Ethereum]), &BTreeSet::new());
        session.record_failure(Network::Ethereum, "first", true);
        session.record_failure(Network::Bitcoin, "other", false);
        session.record_failure(Network::Ethereum, "second", true);

        let messages: Vec<_> = session
            .errors_for(Network::Ethereum)
            .map(|e| e.message.as_str())
            .collect();
        assert_eq!(messages, vec!["first", "second"]);
    }

    #[test]
    fn idle_session_is_not_terminal() {
        assert!(!GenerationSession::idle().status().is_terminal());
    }
}
