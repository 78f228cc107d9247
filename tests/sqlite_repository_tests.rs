mod support;

use std::sync::Arc;

use coinkeeper::adapter::outbound::sqlite::{open, SqliteWalletRepository};
use coinkeeper::domain::{Network, WalletStatus};
use coinkeeper::port::outbound::upstream::UpstreamError;
use coinkeeper::testkit::client::ScriptedClient;
use rust_decimal_macros::dec;
use tempfile::TempDir;
use tokio_test::assert_ok;

use support::fixture::{networks, service_with};

fn repository(dir: &TempDir) -> Arc<SqliteWalletRepository> {
    let path = dir.path().join("wallets.db");
    let pool = open(path.to_str().unwrap()).unwrap();
    Arc::new(SqliteWalletRepository::new(pool))
}

#[tokio::test]
async fn wallets_survive_a_restart() {
    let dir = TempDir::new().unwrap();
    let client = Arc::new(
        ScriptedClient::new()
            .with_creation(
                Network::Tron,
                vec![Err(UpstreamError::QuotaExceeded("plan limit".into()))],
            )
            .with_balance("btc-addr-1", dec!(0.25)),
    );

    {
        let service = service_with(client.clone(), repository(&dir));
        service
            .generate(networks(&[Network::Bitcoin, Network::Tron]))
            .await
            .unwrap();
        service.refresh_all().await;
    }

    let reopened = service_with(client, repository(&dir));
    let loaded = assert_ok!(reopened.load().await);
    assert_eq!(loaded, 2);

    let wallets = reopened.wallets();
    let btc = wallets.iter().find(|w| w.network() == Network::Bitcoin).unwrap();
    let trx = wallets.iter().find(|w| w.network() == Network::Tron).unwrap();
    assert_eq!(btc.status(), WalletStatus::Active);
    assert_eq!(btc.address().map(|a| a.as_str()), Some("btc-addr-1"));
    assert_eq!(btc.balance(), dec!(0.25));
    assert!(btc.last_updated().is_some());
    assert_eq!(trx.status(), WalletStatus::Error);
    assert!(trx.address().is_none());
}

#[tokio::test]
async fn deleted_wallet_stays_deleted() {
    let dir = TempDir::new().unwrap();
    let client = Arc::new(ScriptedClient::new());

    {
        let service = service_with(client.clone(), repository(&dir));
        service
            .generate(networks(&[Network::Ethereum, Network::Solana]))
            .await
            .unwrap();
        let eth = service
            .wallets()
            .into_iter()
            .find(|w| w.network() == Network::Ethereum)
            .unwrap();
        service.delete_wallet(eth.id()).await.unwrap();
    }

    let reopened = service_with(client, repository(&dir));
    assert_ok!(reopened.load().await);
    let wallets = reopened.wallets();
    assert_eq!(wallets.len(), 1);
    assert_eq!(wallets[0].network(), Network::Solana);
}
