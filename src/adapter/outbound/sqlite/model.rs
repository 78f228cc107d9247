//! Database row types.

use diesel::prelude::*;

use super::schema::wallets;

/// Database row for a wallet record.
///
/// Balances are stored as decimal strings and timestamps as RFC 3339 so no
/// precision is lost to SQLite's numeric affinity.
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = wallets)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct WalletRow {
    pub id: String,
    pub user_id: String,
    pub network: String,
    pub address: Option<String>,
    pub balance: String,
    pub status: String,
    pub last_updated: Option<String>,
    pub created_at: String,
}
