//! Handler for the `status` command.

use anyhow::Context;
use serde_json::json;

use super::{output, view};
use crate::infrastructure::bootstrap::build_service;
use crate::infrastructure::config::Config;

/// Print the wallet table and totals from the local database.
pub async fn execute(config: &Config) -> anyhow::Result<()> {
    let service = build_service(config)
        .await
        .context("failed to open wallet database")?;
    let wallets = service.wallets();
    let snapshot = service.price_snapshot();
    let totals = service.totals();

    if output::is_json() {
        output::json_output(json!({
            "command": "status",
            "user": service.user_id().to_string(),
            "wallets": view::wallets_json(&wallets),
            "totals": totals,
        }));
        return Ok(());
    }
    if output::is_quiet() {
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    output::field("User", service.user_id());
    output::field("Database", &config.database);
    println!();
    view::wallets(&wallets, snapshot.as_deref(), service.display_currency());
    view::totals(
        &totals,
        service.display_total(),
        service.display_currency(),
        Some(view::price_age(snapshot.as_deref(), service.prices_stale())),
    );
    if snapshot.is_none() && totals.active_count > 0 {
        output::hint("Run `coinkeeper refresh` to fetch balances and prices.");
    }
    Ok(())
}
