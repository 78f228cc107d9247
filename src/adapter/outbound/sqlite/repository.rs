//! SQLite wallet repository.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;

use super::connection::DbPool;
use super::model::WalletRow;
use super::schema::wallets;
use crate::domain::{Address, Network, UserId, WalletId, WalletRecord, WalletStatus};
use crate::error::{Error, Result};
use crate::port::outbound::store::WalletRepository;

/// SQLite-backed [`WalletRepository`].
pub struct SqliteWalletRepository {
    pool: DbPool,
}

impl SqliteWalletRepository {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn to_row(record: &WalletRecord) -> WalletRow {
        WalletRow {
            id: record.id().to_string(),
            user_id: record.user_id().to_string(),
            network: record.network().as_str().to_string(),
            address: record.address().map(ToString::to_string),
            balance: record.balance().to_string(),
            status: record.status().as_str().to_string(),
            last_updated: record.last_updated().map(|t| t.to_rfc3339()),
            created_at: record.created_at().to_rfc3339(),
        }
    }

    fn from_row(row: WalletRow) -> Result<WalletRecord> {
        let network = Network::from_str(&row.network)?;
        let status = WalletStatus::from_str(&row.status).map_err(Error::Parse)?;
        let balance = Decimal::from_str(&row.balance).map_err(|e| Error::Parse(e.to_string()))?;
        let last_updated = row.last_updated.as_deref().map(parse_timestamp).transpose()?;
        let created_at = parse_timestamp(&row.created_at)?;

        Ok(WalletRecord::restore(
            WalletId::from(row.id),
            UserId::new(row.user_id),
            network,
            row.address.map(Address::new),
            balance,
            status,
            last_updated,
            created_at,
        ))
    }

    fn connection(
        &self,
    ) -> Result<diesel::r2d2::PooledConnection<diesel::r2d2::ConnectionManager<SqliteConnection>>>
    {
        self.pool.get().map_err(|e| Error::Connection(e.to_string()))
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .map_err(|e| Error::Parse(e.to_string()))?
        .with_timezone(&Utc))
}

#[async_trait]
impl WalletRepository for SqliteWalletRepository {
    async fn load(&self, user_id: &UserId) -> Result<Vec<WalletRecord>> {
        let mut conn = self.connection()?;
        let rows: Vec<WalletRow> = wallets::table
            .filter(wallets::user_id.eq(user_id.as_str()))
            .order(wallets::created_at.asc())
            .select(WalletRow::as_select())
            .load(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        rows.into_iter().map(Self::from_row).collect()
    }

    async fn save(&self, record: &WalletRecord) -> Result<()> {
        let row = Self::to_row(record);
        let mut conn = self.connection()?;

        diesel::replace_into(wallets::table)
            .values(&row)
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, id: &WalletId) -> Result<bool> {
        let mut conn = self.connection()?;

        let deleted = diesel::delete(wallets::table.find(id.as_str()))
            .execute(&mut conn)
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(deleted > 0)
    }
}
