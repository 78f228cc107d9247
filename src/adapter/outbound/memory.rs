//! In-memory wallet repository.
//!
//! Used by tests and by callers that do not need records to outlive the
//! process.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::{UserId, WalletId, WalletRecord};
use crate::error::Result;
use crate::port::outbound::store::WalletRepository;

/// In-memory store for wallet records.
#[derive(Debug, Default)]
pub struct MemoryWalletRepository {
    records: RwLock<HashMap<WalletId, WalletRecord>>,
}

impl MemoryWalletRepository {
    /// Create a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository pre-populated with `records`.
    #[must_use]
    pub fn with_records(records: Vec<WalletRecord>) -> Self {
        Self {
            records: RwLock::new(
                records
                    .into_iter()
                    .map(|r| (r.id().clone(), r))
                    .collect(),
            ),
        }
    }

    #[must_use]
    pub fn get(&self, id: &WalletId) -> Option<WalletRecord> {
        self.records.read().get(id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl WalletRepository for MemoryWalletRepository {
    async fn load(&self, user_id: &UserId) -> Result<Vec<WalletRecord>> {
        Ok(self
            .records
            .read()
            .values()
            .filter(|r| r.user_id() == user_id)
            .cloned()
            .collect())
    }

    async fn save(&self, record: &WalletRecord) -> Result<()> {
        self.records
            .write()
            .insert(record.id().clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, id: &WalletId) -> Result<bool> {
        Ok(self.records.write().remove(id).is_some())
    }
}
