//! Handler for the `run` command.

use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use serde_json::json;
use tokio::signal;
use tracing::info;

use super::command::RunArgs;
use super::{output, view};
use crate::infrastructure::bootstrap::build_service;
use crate::infrastructure::config::Config;

/// Auto-refresh in the foreground and print totals whenever they change,
/// until Ctrl-C.
pub async fn execute(config: &Config, args: &RunArgs) -> anyhow::Result<()> {
    let service = build_service(config)
        .await
        .context("failed to open wallet database")?;

    let interval = args
        .interval
        .map_or(service_interval(config), Duration::from_secs);
    anyhow::ensure!(!interval.is_zero(), "refresh interval must be greater than 0");

    output::header(env!("CARGO_PKG_VERSION"));
    output::field("User", service.user_id());
    output::field("Wallets", service.wallets().len());
    output::field("Interval", format!("{}s", interval.as_secs_f64()));
    output::hint("Press Ctrl-C to stop.");

    let mut totals = service.subscribe_totals();
    let mut reports = service.subscribe_reports();
    service.start_auto_refresh(interval);
    info!(interval_ms = interval.as_millis() as u64, "coinkeeper running");

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }

            changed = totals.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = totals.borrow_and_update().clone();
                let now = Utc::now().format("%H:%M:%S").to_string();
                if output::is_json() {
                    output::json_output(json!({ "type": "totals", "at": now, "totals": current }));
                } else {
                    output::event(
                        &now,
                        "totals",
                        &format!(
                            "{} across {} active wallet(s)",
                            view::money(current.total_balance_usd, "USD"),
                            current.active_count
                        ),
                    );
                }
            }

            changed = reports.changed() => {
                if changed.is_err() {
                    break;
                }
                let report = reports.borrow_and_update().clone();
                if let Some(report) = report.filter(|r| !r.is_clean()) {
                    let now = Utc::now().format("%H:%M:%S").to_string();
                    output::event(
                        &now,
                        "refresh",
                        &format!("{} refreshed, {} failed", report.refreshed, report.failed),
                    );
                }
            }
        }
    }

    service.stop_auto_refresh();
    if let Some(report) = service.drain().await {
        info!(
            refreshed = report.refreshed,
            failed = report.failed,
            "Finished in-flight refresh"
        );
    }
    info!("coinkeeper stopped");
    Ok(())
}

fn service_interval(config: &Config) -> Duration {
    Duration::from_millis(config.refresh.interval_ms)
}
