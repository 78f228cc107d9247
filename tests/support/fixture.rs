//! Service fixtures shared by integration tests.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use coinkeeper::adapter::outbound::memory::MemoryWalletRepository;
use coinkeeper::application::generation::GenerationPolicy;
use coinkeeper::application::refresh::RefreshPolicy;
use coinkeeper::application::service::WalletService;
use coinkeeper::domain::{Network, UserId};
use coinkeeper::port::outbound::store::WalletRepository;
use coinkeeper::testkit::client::ScriptedClient;

pub const USER: &str = "integration-user";

pub fn networks(list: &[Network]) -> BTreeSet<Network> {
    list.iter().copied().collect()
}

/// Generation policy with a near-zero retry delay.
pub fn fast_generation() -> GenerationPolicy {
    GenerationPolicy {
        retry_delay: Duration::from_millis(1),
        ..GenerationPolicy::default()
    }
}

/// Refresh policy requesting USD prices for every network.
pub fn usd_refresh(interval: Duration) -> RefreshPolicy {
    RefreshPolicy {
        interval,
        pairs: Network::ALL.iter().map(|n| n.pair("USD")).collect(),
        ..RefreshPolicy::default()
    }
}

pub fn service_with(
    client: Arc<ScriptedClient>,
    repository: Arc<dyn WalletRepository>,
) -> WalletService {
    WalletService::new(
        UserId::from(USER),
        fast_generation(),
        usd_refresh(Duration::from_secs(60)),
        "USD",
        client,
        repository,
    )
}

pub fn memory_service(client: Arc<ScriptedClient>) -> (WalletService, Arc<MemoryWalletRepository>) {
    let repository = Arc::new(MemoryWalletRepository::new());
    (service_with(client, repository.clone()), repository)
}

/// Write a config file pointing the database into `dir`.
pub fn write_config(dir: &Path, extra: &str) -> PathBuf {
    let path = dir.join("coinkeeper.toml");
    let database = dir.join("wallets.db");
    let contents = format!(
        "user_id = \"cli-user\"\ndatabase = \"{}\"\n\n[logging]\nlevel = \"warn\"\n{extra}",
        database.display()
    );
    std::fs::write(&path, contents).expect("write temp config");
    path
}
