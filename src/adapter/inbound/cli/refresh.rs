//! Handler for the `refresh` command.

use anyhow::Context;
use serde_json::json;

use super::{output, view};
use crate::infrastructure::bootstrap::build_service;
use crate::infrastructure::config::Config;

/// Run one refresh cycle and print the report and totals.
pub async fn execute(config: &Config) -> anyhow::Result<()> {
    let service = build_service(config)
        .await
        .context("failed to open wallet database")?;

    let report = service.refresh_all().await;
    let totals = service.totals();

    if output::is_json() {
        output::json_output(json!({
            "command": "refresh",
            "report": view::report_json(&report),
            "totals": totals,
        }));
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    view::report(&report);
    let snapshot = service.price_snapshot();
    view::totals(
        &totals,
        service.display_total(),
        service.display_currency(),
        Some(view::price_age(snapshot.as_deref(), service.prices_stale())),
    );
    Ok(())
}
