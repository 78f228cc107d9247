use std::time::Duration;

use coinkeeper::domain::Network;
use coinkeeper::infrastructure::config::Config;
use tempfile::TempDir;

#[test]
fn loads_full_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("coinkeeper.toml");
    std::fs::write(
        &path,
        r#"
user_id = "alice"
database = "alice.db"

[logging]
level = "debug"

[upstream]
creation_url = "http://127.0.0.1:9000/wallets"
balance_url = "http://127.0.0.1:9000/balances"
price_url = "http://127.0.0.1:9000/prices"
timeout_ms = 1000

[generation]
supported_networks = ["BTC", "ETH"]
auto_retries = 3
retry_delay_ms = 10

[refresh]
interval_ms = 5000
backoff_multiplier = 1.5
max_backoff_ms = 20000
refresh_on_start = false

[prices]
quote_currencies = ["USD", "EUR"]
display_currency = "EUR"
"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();

    let generation = config.generation.to_policy();
    assert_eq!(generation.max_attempts(), 4);
    assert_eq!(generation.retry_delay, Duration::from_millis(10));
    assert!(!generation.supported_networks.contains(&Network::Solana));

    let refresh = config.refresh.to_policy(config.price_pairs());
    assert_eq!(refresh.interval, Duration::from_secs(5));
    assert_eq!(refresh.max_backoff, Duration::from_secs(20));
    assert!(!refresh.refresh_on_start);
    assert_eq!(refresh.pairs.len(), 4);
    assert!(refresh.pairs.contains(&Network::Ethereum.pair("EUR")));
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let config = Config::load_or_default(dir.path().join("absent.toml")).unwrap();

    assert_eq!(config.database, "coinkeeper.db");
    assert_eq!(config.price_pairs().len(), 3);
}

#[test]
fn load_reports_missing_file() {
    let dir = TempDir::new().unwrap();
    assert!(Config::load(dir.path().join("absent.toml")).is_err());
}
