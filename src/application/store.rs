//! Authoritative wallet record store.
//!
//! The in-memory map is the source of truth for the running process; every
//! mutation is mirrored to the [`WalletRepository`] afterwards. A failed save
//! is logged and does not roll back memory.
//!
//! Ownership of writes is split by field: the generation coordinator creates
//! records and drives `status`/`address`, the refresh scheduler writes
//! `balance`/`last_updated`. Locks are held only for the in-memory update,
//! never across an await.
//!
//! Repository writes are serialized and always save the current in-memory
//! version, so a save that races a delete cannot bring the row back.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::domain::{
    Address, Amount, DomainError, Network, UserId, WalletId, WalletRecord, WalletStatus,
};
use crate::error::Result;
use crate::port::outbound::store::WalletRepository;

/// In-memory, persisted set of one user's wallet records.
pub struct WalletStore {
    user_id: UserId,
    records: RwLock<HashMap<WalletId, WalletRecord>>,
    repository: Arc<dyn WalletRepository>,
    write_lock: Mutex<()>,
    tx: watch::Sender<Vec<WalletRecord>>,
}

impl WalletStore {
    /// Create an empty store for `user_id` backed by `repository`.
    pub fn new(user_id: UserId, repository: Arc<dyn WalletRepository>) -> Self {
        let (tx, _rx) = watch::channel(Vec::new());
        Self {
            user_id,
            records: RwLock::new(HashMap::new()),
            repository,
            write_lock: Mutex::new(()),
            tx,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Load the user's records from the repository, replacing memory.
    ///
    /// Duplicate records for one network are collapsed: an active record wins,
    /// otherwise the oldest one is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository cannot be read.
    pub async fn load(&self) -> Result<usize> {
        let loaded = self.repository.load(&self.user_id).await?;

        let mut by_network: HashMap<Network, WalletRecord> = HashMap::new();
        for record in loaded {
            match by_network.get(&record.network()) {
                Some(existing) if !prefer(&record, existing) => {
                    warn!(
                        network = %record.network(),
                        kept = %existing.id(),
                        dropped = %record.id(),
                        "Duplicate wallet record for network"
                    );
                }
                _ => {
                    by_network.insert(record.network(), record);
                }
            }
        }

        let count = by_network.len();
        {
            let mut records = self.records.write();
            records.clear();
            for record in by_network.into_values() {
                records.insert(record.id().clone(), record);
            }
        }
        self.publish();
        info!(user = %self.user_id, wallets = count, "Wallet records loaded");
        Ok(count)
    }

    /// All records ordered by network.
    #[must_use]
    pub fn all(&self) -> Vec<WalletRecord> {
        let mut records: Vec<_> = self.records.read().values().cloned().collect();
        records.sort_by_key(|r| (r.network(), r.created_at()));
        records
    }

    #[must_use]
    pub fn get(&self, id: &WalletId) -> Option<WalletRecord> {
        self.records.read().get(id).cloned()
    }

    #[must_use]
    pub fn by_network(&self, network: Network) -> Option<WalletRecord> {
        self.records
            .read()
            .values()
            .find(|r| r.network() == network)
            .cloned()
    }

    /// Records currently eligible for balance refresh.
    #[must_use]
    pub fn active(&self) -> Vec<WalletRecord> {
        self.all().into_iter().filter(WalletRecord::is_active).collect()
    }

    #[must_use]
    pub fn active_networks(&self) -> BTreeSet<Network> {
        self.networks_with(WalletStatus::Active)
    }

    #[must_use]
    pub fn networks_with(&self, status: WalletStatus) -> BTreeSet<Network> {
        self.records
            .read()
            .values()
            .filter(|r| r.status() == status)
            .map(WalletRecord::network)
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribe to the wallet list. A new list is published after every
    /// mutation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<WalletRecord>> {
        self.tx.subscribe()
    }

    /// Return the record for `network` in `Pending` state, creating it if
    /// needed.
    ///
    /// An errored record is reset and reused and an active record is returned
    /// unchanged, so there is never more than one record per network.
    pub async fn ensure_pending(&self, network: Network) -> WalletRecord {
        let (record, changed) = {
            let mut records = self.records.write();
            match records.values_mut().find(|r| r.network() == network) {
                Some(existing) => {
                    let changed = existing.reset_pending();
                    (existing.clone(), changed)
                }
                None => {
                    let record = WalletRecord::pending(self.user_id.clone(), network);
                    records.insert(record.id().clone(), record.clone());
                    (record, true)
                }
            }
        };

        if changed {
            debug!(network = %network, wallet = %record.id(), "Wallet record pending");
            self.publish();
            self.persist(&record).await;
        }
        record
    }

    /// Transition a pending record to active with `address`.
    pub async fn activate(&self, id: &WalletId, address: Address) -> Option<WalletRecord> {
        self.mutate(id, |r| r.activate(address)).await
    }

    /// Mark a pending record as failed.
    pub async fn fail(&self, id: &WalletId) -> Option<WalletRecord> {
        self.mutate(id, WalletRecord::fail).await
    }

    /// Record a fetched balance for an active record.
    pub async fn apply_balance(
        &self,
        id: &WalletId,
        balance: Amount,
        at: DateTime<Utc>,
    ) -> Option<WalletRecord> {
        self.mutate(id, |r| r.apply_balance(balance, at)).await
    }

    /// Delete a record on explicit user request.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::WalletNotFound`] for unknown IDs, or the
    /// repository error if the delete cannot be persisted.
    pub async fn delete(&self, id: &WalletId) -> Result<WalletRecord> {
        let removed = self
            .records
            .write()
            .remove(id)
            .ok_or_else(|| DomainError::WalletNotFound { id: id.to_string() })?;
        self.publish();
        {
            let _write = self.write_lock.lock().await;
            self.repository.delete(id).await?;
        }
        info!(wallet = %id, network = %removed.network(), "Wallet record deleted");
        Ok(removed)
    }

    /// Apply `f` to the record and persist it if `f` reports a change.
    async fn mutate<F>(&self, id: &WalletId, f: F) -> Option<WalletRecord>
    where
        F: FnOnce(&mut WalletRecord) -> bool,
    {
        let updated = {
            let mut records = self.records.write();
            let record = records.get_mut(id)?;
            if !f(record) {
                return None;
            }
            record.clone()
        };
        self.publish();
        self.persist(&updated).await;
        Some(updated)
    }

    fn publish(&self) {
        self.tx.send_replace(self.all());
    }

    async fn persist(&self, record: &WalletRecord) {
        let _write = self.write_lock.lock().await;
        let Some(current) = self.get(record.id()) else {
            debug!(wallet = %record.id(), "Wallet record deleted before save, skipping");
            return;
        };
        if let Err(e) = self.repository.save(&current).await {
            warn!(wallet = %current.id(), network = %current.network(), error = %e, "Failed to persist wallet record");
        }
    }
}

/// Whether `candidate` should replace `existing` when loading duplicates.
fn prefer(candidate: &WalletRecord, existing: &WalletRecord) -> bool {
    match (candidate.is_active(), existing.is_active()) {
        (true, false) => true,
        (false, true) => false,
        _ => candidate.created_at() < existing.created_at(),
    }
}
