//! Dashboard totals.
//!
//! Pure functions over a wallet list and a price snapshot. A total that
//! cannot be priced completely is reported as unknown rather than as a
//! partial sum. A total too large for `Decimal` is unknown as well.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::{PriceSnapshot, WalletRecord, WalletStatus};

const USD: &str = "USD";

/// Summary shown at the top of the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardTotals {
    /// Sum of active balances in USD. `None` when any active wallet cannot
    /// be priced.
    pub total_balance_usd: Option<Decimal>,
    pub active_count: usize,
    pub pending_count: usize,
    pub errored_count: usize,
}

impl DashboardTotals {
    #[must_use]
    pub fn wallet_count(&self) -> usize {
        self.active_count + self.pending_count + self.errored_count
    }
}

/// Compute totals over `wallets` priced in USD.
#[must_use]
pub fn aggregate(wallets: &[WalletRecord], snapshot: Option<&PriceSnapshot>) -> DashboardTotals {
    let mut totals = DashboardTotals {
        total_balance_usd: total_in(wallets, snapshot, USD),
        ..DashboardTotals::default()
    };
    for wallet in wallets {
        match wallet.status() {
            WalletStatus::Active => totals.active_count += 1,
            WalletStatus::Pending => totals.pending_count += 1,
            WalletStatus::Error => totals.errored_count += 1,
        }
    }
    totals
}

/// Sum of active balances valued in `quote`.
///
/// Zero for a list without active wallets, even with no snapshot.
#[must_use]
pub fn total_in(
    wallets: &[WalletRecord],
    snapshot: Option<&PriceSnapshot>,
    quote: &str,
) -> Option<Decimal> {
    wallets
        .iter()
        .filter(|w| w.is_active())
        .try_fold(Decimal::ZERO, |sum, w| {
            w.balance_in(snapshot, quote)
                .and_then(|value| sum.checked_add(value))
        })
}
