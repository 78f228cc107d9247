mod support;

use std::sync::Arc;

use coinkeeper::domain::{DomainError, Network, SessionStatus, WalletStatus};
use coinkeeper::port::outbound::upstream::UpstreamError;
use coinkeeper::testkit::client::ScriptedClient;

use support::fixture::{memory_service, networks};

#[tokio::test]
async fn one_transient_failure_is_absorbed_by_auto_retry() {
    let client = Arc::new(ScriptedClient::new().failing_times(Network::Ethereum, 1));
    let (service, _repo) = memory_service(client.clone());

    let session = service
        .generate(networks(&[Network::Bitcoin, Network::Ethereum]))
        .await
        .unwrap();

    assert_eq!(session.status(), SessionStatus::Success);
    assert_eq!(session.completed(), &networks(&[Network::Bitcoin, Network::Ethereum]));
    assert_eq!(session.errors_for(Network::Ethereum).count(), 1);
    assert_eq!(session.errors_for(Network::Bitcoin).count(), 0);
    assert_eq!(client.create_calls_for(Network::Ethereum), 2);
    assert!(service.wallets().iter().all(|w| w.is_active()));
}

#[tokio::test]
async fn exhausted_retries_leave_network_errored() {
    let client = Arc::new(ScriptedClient::new().failing_times(Network::Solana, 2));
    let (service, repo) = memory_service(client);

    let session = service
        .generate(networks(&[Network::Bitcoin, Network::Solana]))
        .await
        .unwrap();

    assert_eq!(session.status(), SessionStatus::Error);
    assert_eq!(session.completed(), &networks(&[Network::Bitcoin]));
    let sol = service
        .wallets()
        .into_iter()
        .find(|w| w.network() == Network::Solana)
        .unwrap();
    assert_eq!(sol.status(), WalletStatus::Error);
    assert!(sol.address().is_none());
    assert_eq!(repo.get(sol.id()).unwrap().status(), WalletStatus::Error);
    assert_eq!(service.totals().errored_count, 1);
}

#[tokio::test]
async fn retry_without_errors_changes_nothing() {
    let client = Arc::new(ScriptedClient::new());
    let (service, _repo) = memory_service(client.clone());
    service.generate(networks(&[Network::Bitcoin])).await.unwrap();
    let before = service.session();
    let calls = client.create_calls();

    assert!(service.retry_generation().await.is_none());

    assert_eq!(service.session(), before);
    assert_eq!(client.create_calls(), calls);
}

#[tokio::test]
async fn retry_only_touches_errored_networks() {
    let client = Arc::new(ScriptedClient::new().with_creation(
        Network::Tron,
        vec![Err(UpstreamError::InvalidNetwork("not enabled".into()))],
    ));
    let (service, _repo) = memory_service(client.clone());

    let first = service
        .generate(networks(&[Network::Ethereum, Network::Tron]))
        .await
        .unwrap();
    assert_eq!(first.status(), SessionStatus::Error);
    assert_eq!(client.create_calls_for(Network::Tron), 1);

    let retried = service.retry_generation().await.unwrap();

    assert_eq!(retried.status(), SessionStatus::Success);
    assert_eq!(client.create_calls_for(Network::Ethereum), 1);
    assert_eq!(client.create_calls_for(Network::Tron), 2);
}

#[tokio::test]
async fn session_progress_is_observable() {
    let client = Arc::new(ScriptedClient::new());
    client.hold();
    let (service, _repo) = memory_service(client.clone());
    let service = Arc::new(service);
    let mut session_rx = service.subscribe_session();

    let task = {
        let service = service.clone();
        tokio::spawn(async move { service.generate(networks(&[Network::Polygon])).await })
    };

    let generating = session_rx
        .wait_for(|s| s.status() == SessionStatus::Generating)
        .await
        .unwrap()
        .clone();
    assert!(generating.completed().is_empty());
    let wallets = service.wallets();
    assert_eq!(wallets.len(), 1);
    assert_eq!(wallets[0].status(), WalletStatus::Pending);

    client.release();
    let session = task.await.unwrap().unwrap();
    assert_eq!(session.status(), SessionStatus::Success);
}

#[tokio::test]
async fn validation_errors_do_not_create_records() {
    let client = Arc::new(ScriptedClient::new());
    let (service, repo) = memory_service(client.clone());

    assert_eq!(
        service.generate_ids::<&str>(&[]).await.unwrap_err(),
        DomainError::EmptyNetworkSet
    );
    assert!(matches!(
        service.generate_ids(&["BTC", "XRP"]).await.unwrap_err(),
        DomainError::UnknownNetwork { .. }
    ));
    assert_eq!(client.create_calls(), 0);
    assert!(repo.is_empty());
}
