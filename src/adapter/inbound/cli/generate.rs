//! Handler for the `generate` command.

use anyhow::{bail, Context};
use serde_json::json;

use super::command::GenerateArgs;
use super::output;
use crate::domain::{GenerationSession, SessionStatus};
use crate::infrastructure::bootstrap::build_service;
use crate::infrastructure::config::Config;

/// Provision wallets on the requested networks and report per-network
/// results. Fails when any network did not end up active.
pub async fn execute(config: &Config, args: &GenerateArgs) -> anyhow::Result<()> {
    let service = build_service(config)
        .await
        .context("failed to open wallet database")?;

    output::header(env!("CARGO_PKG_VERSION"));
    let session = service.generate_ids(&args.networks).await?;
    let wallets = service.wallets();

    if output::is_json() {
        output::json_output(json!({
            "command": "generate",
            "session": session,
            "wallets": super::view::wallets_json(&wallets),
        }));
    } else {
        print_session(&session, &wallets);
    }

    if session.status() == SessionStatus::Error {
        let failed = session.target_networks().len() - session.completed().len();
        bail!("{failed} network(s) could not be provisioned; run `coinkeeper generate` again to retry");
    }
    Ok(())
}

fn print_session(session: &GenerationSession, wallets: &[crate::domain::WalletRecord]) {
    output::section("Generation");
    for network in session.target_networks() {
        if session.completed().contains(network) {
            let address = wallets
                .iter()
                .find(|w| w.network() == *network)
                .and_then(|w| w.address())
                .map(ToString::to_string)
                .unwrap_or_default();
            output::success(&format!("{} {}", network.display_name(), output::muted(address)));
        } else {
            let reason = session
                .errors_for(*network)
                .last()
                .map_or("no attempt recorded", |e| e.message.as_str());
            output::error(&format!("{}: {reason}", network.display_name()));
        }
    }
    let attempts_failed = session.errors().len();
    if attempts_failed > 0 {
        output::field("Failed tries", attempts_failed);
    }
}
