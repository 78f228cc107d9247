//! Infrastructure bootstrap helpers for runtime wiring.

use std::sync::Arc;

use tracing::{debug, info};

use crate::adapter::outbound::http::HttpNetworkClient;
use crate::adapter::outbound::sqlite::connection::open;
use crate::adapter::outbound::sqlite::SqliteWalletRepository;
use crate::application::service::WalletService;
use crate::error::Result;
use crate::infrastructure::config::settings::Config;
use crate::port::outbound::store::WalletRepository;
use crate::port::outbound::upstream::NetworkClient;

/// Open the configured database and build the SQLite repository.
///
/// # Errors
///
/// Returns an error if the database cannot be opened or migrated.
pub fn build_repository(config: &Config) -> Result<Arc<dyn WalletRepository>> {
    let pool = open(&config.database)?;
    info!(database = %config.database, "Database ready");
    Ok(Arc::new(SqliteWalletRepository::new(pool)))
}

/// Build the HTTP client for the configured upstream services.
///
/// # Errors
///
/// Returns an error if an upstream URL is invalid.
pub fn build_client(config: &Config) -> Result<Arc<dyn NetworkClient>> {
    if config.upstream.api_key.is_none() {
        debug!("No upstream API key set, requests are sent unauthenticated");
    }
    Ok(Arc::new(HttpNetworkClient::from_config(&config.upstream)?))
}

/// Build a [`WalletService`] from the loaded configuration.
#[must_use]
pub fn service_from_config(
    config: &Config,
    client: Arc<dyn NetworkClient>,
    repository: Arc<dyn WalletRepository>,
) -> WalletService {
    WalletService::new(
        config.user(),
        config.generation.to_policy(),
        config.refresh.to_policy(config.price_pairs()),
        config.prices.display_currency.clone(),
        client,
        repository,
    )
}

/// Wire a [`WalletService`] and load the user's persisted wallets.
///
/// # Errors
///
/// Returns an error if the database or upstream client cannot be set up,
/// or the stored wallets cannot be read.
pub async fn build_service(config: &Config) -> Result<WalletService> {
    let repository = build_repository(config)?;
    let client = build_client(config)?;
    let service = service_from_config(config, client, repository);
    service.load().await?;
    Ok(service)
}
