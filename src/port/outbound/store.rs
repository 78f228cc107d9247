//! Persistence port for wallet records.

use async_trait::async_trait;

use crate::domain::{UserId, WalletId, WalletRecord};
use crate::error::Result;

/// Storage operations for wallet records.
#[async_trait]
pub trait WalletRepository: Send + Sync {
    /// Load every record owned by `user_id`.
    async fn load(&self, user_id: &UserId) -> Result<Vec<WalletRecord>>;

    /// Save a record, replacing it if it exists.
    async fn save(&self, record: &WalletRecord) -> Result<()>;

    /// Delete a record by ID. Returns whether a record was removed.
    async fn delete(&self, id: &WalletId) -> Result<bool>;
}
