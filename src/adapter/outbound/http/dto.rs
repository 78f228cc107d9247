//! Wire types for the upstream JSON APIs.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::Network;

#[derive(Serialize)]
pub(super) struct CreateWalletRequest<'a> {
    pub network: Network,
    #[serde(rename = "userId")]
    pub user_id: &'a str,
}

#[derive(Deserialize)]
pub(super) struct CreateWalletResponse {
    pub address: String,
}

#[derive(Deserialize)]
pub(super) struct BalanceResponse {
    pub balance: Decimal,
}

#[derive(Serialize)]
pub(super) struct PriceRequest<'a> {
    pub pairs: Vec<&'a str>,
}

#[derive(Deserialize)]
pub(super) struct PriceResponse {
    pub prices: HashMap<String, Decimal>,
    #[serde(rename = "fetchedAt", default)]
    pub fetched_at: Option<DateTime<Utc>>,
}
