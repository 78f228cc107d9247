//! Shared renderers for wallets, totals and refresh reports.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tabled::settings::Style;
use tabled::{Table, Tabled};

use super::output;
use crate::application::dashboard::DashboardTotals;
use crate::application::refresh::{PriceRefresh, RefreshReport};
use crate::domain::{PriceSnapshot, WalletRecord, WalletStatus};

#[derive(Tabled)]
struct WalletRow {
    #[tabled(rename = "Network")]
    network: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Balance")]
    balance: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

fn status_label(status: WalletStatus) -> String {
    match status {
        WalletStatus::Active => output::positive(status),
        WalletStatus::Pending => output::caution(status),
        WalletStatus::Error => output::negative(status),
    }
}

fn timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(|| "never".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Format a currency amount with two decimals, or "unknown".
#[must_use]
pub fn money(value: Option<Decimal>, currency: &str) -> String {
    value.map_or_else(
        || "unknown".to_string(),
        |v| format!("{} {currency}", v.round_dp(2)),
    )
}

/// Render the wallet table, or a note when there are no wallets.
pub fn wallets(wallets: &[WalletRecord], snapshot: Option<&PriceSnapshot>, currency: &str) {
    if wallets.is_empty() {
        output::hint("No wallets yet. Run `coinkeeper generate BTC ETH` to create some.");
        return;
    }

    let rows: Vec<WalletRow> = wallets
        .iter()
        .map(|w| WalletRow {
            network: w.network().to_string(),
            status: status_label(w.status()),
            address: w
                .address()
                .map_or_else(|| output::muted("-"), |a| a.short()),
            balance: w.balance().normalize().to_string(),
            value: if w.is_active() {
                money(w.balance_in(snapshot, currency), currency)
            } else {
                output::muted("-")
            },
            updated: timestamp(w.last_updated()),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    output::lines(&table.to_string());
}

/// Render dashboard totals.
pub fn totals(totals: &DashboardTotals, display: Option<Decimal>, currency: &str, price_note: Option<String>) {
    output::section("Totals");
    output::field("Total (USD)", money(totals.total_balance_usd, "USD"));
    if !currency.eq_ignore_ascii_case("USD") {
        output::field(&format!("Total ({currency})"), money(display, currency));
    }
    output::field("Active", output::positive(totals.active_count));
    output::field("Pending", output::caution(totals.pending_count));
    output::field("Errored", output::negative(totals.errored_count));
    if let Some(note) = price_note {
        output::field("Prices", note);
    }
}

/// Describe the price snapshot age for humans.
#[must_use]
pub fn price_age(snapshot: Option<&PriceSnapshot>, stale: bool) -> String {
    match snapshot {
        None => "never fetched".to_string(),
        Some(s) if stale => format!("stale, {}s old", s.cache_age_seconds()),
        Some(s) => format!("{}s old", s.cache_age_seconds()),
    }
}

/// Render a refresh report.
pub fn report(report: &RefreshReport) {
    output::section("Refresh");
    output::field("Refreshed", output::positive(report.refreshed));
    output::field(
        "Failed",
        if report.failed > 0 {
            output::negative(report.failed)
        } else {
            report.failed.to_string()
        },
    );
    for failure in &report.failures {
        output::warning(&format!("{} ({}): {}", failure.network, failure.wallet_id, failure.error));
    }
    match &report.price {
        PriceRefresh::Updated => output::field("Prices", output::positive("updated")),
        PriceRefresh::Fresh => output::field("Prices", "fresh"),
        PriceRefresh::StaleDataOnly { error, age } => {
            let age = age.map_or_else(|| "no snapshot".to_string(), |a| format!("{}s old", a.as_secs()));
            output::warning(&format!("Price refresh failed, showing stale data ({age}): {error}"));
        }
    }
}

/// JSON form of a refresh report.
#[must_use]
pub fn report_json(report: &RefreshReport) -> Value {
    let price = match &report.price {
        PriceRefresh::Updated => json!({ "status": "updated" }),
        PriceRefresh::Fresh => json!({ "status": "fresh" }),
        PriceRefresh::StaleDataOnly { error, age } => json!({
            "status": "stale",
            "error": error.to_string(),
            "age_seconds": age.map(|a| a.as_secs()),
        }),
    };
    json!({
        "refreshed": report.refreshed,
        "failed": report.failed,
        "failures": report.failures.iter().map(|f| json!({
            "wallet_id": f.wallet_id.to_string(),
            "network": f.network,
            "kind": f.error.kind(),
            "error": f.error.to_string(),
        })).collect::<Vec<_>>(),
        "price": price,
    })
}

/// JSON form of the wallet list.
#[must_use]
pub fn wallets_json(wallets: &[WalletRecord]) -> Value {
    Value::Array(
        wallets
            .iter()
            .map(|w| {
                json!({
                    "id": w.id().to_string(),
                    "network": w.network(),
                    "status": w.status(),
                    "address": w.address().map(|a| a.as_str().to_string()),
                    "balance": w.balance().to_string(),
                    "last_updated": w.last_updated(),
                })
            })
            .collect(),
    )
}
