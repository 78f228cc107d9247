//! Reqwest-based [`NetworkClient`].
//!
//! One HTTP request per call. Transport errors and non-success statuses are
//! mapped to [`UpstreamError`] so the application layer can tell transient
//! failures from terminal ones.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use super::dto::{
    BalanceResponse, CreateWalletRequest, CreateWalletResponse, PriceRequest, PriceResponse,
};
use crate::domain::{Address, Amount, Network, PairKey, UserId};
use crate::error::Result;
use crate::infrastructure::config::upstream::UpstreamConfig;
use crate::port::outbound::upstream::{NetworkClient, PriceQuote, UpstreamError};

/// Longest error body excerpt carried into an error message.
const BODY_EXCERPT: usize = 200;

/// Which upstream call a response belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateWallet,
    FetchBalance,
    FetchPrices,
}

/// HTTP client for the three upstream services.
#[derive(Debug, Clone)]
pub struct HttpNetworkClient {
    http: Client,
    creation_url: Url,
    balance_url: Url,
    price_url: Url,
    api_key: Option<String>,
}

impl HttpNetworkClient {
    /// Build a client from the `[upstream]` section.
    ///
    /// # Errors
    ///
    /// Returns an error if a URL is invalid or the HTTP client cannot be
    /// built.
    pub fn from_config(config: &UpstreamConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(concat!("coinkeeper/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            creation_url: Url::parse(&config.creation_url)?,
            balance_url: Url::parse(&config.balance_url)?,
            price_url: Url::parse(&config.price_url)?,
            api_key: config.api_key.clone(),
        })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation: Operation,
        request: RequestBuilder,
    ) -> std::result::Result<T, UpstreamError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        trace!(?operation, %status, "Upstream response");
        if !status.is_success() {
            let retry_after = retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            let error = classify_status(operation, status, retry_after, &body);
            debug!(?operation, %status, kind = error.kind(), "Upstream request rejected");
            return Err(error);
        }

        response
            .json::<T>()
            .await
            .map_err(|e| UpstreamError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl NetworkClient for HttpNetworkClient {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn create_wallet(
        &self,
        network: Network,
        user_id: &UserId,
    ) -> std::result::Result<Address, UpstreamError> {
        let body = CreateWalletRequest {
            network,
            user_id: user_id.as_str(),
        };
        let response: CreateWalletResponse = self
            .execute(
                Operation::CreateWallet,
                self.http.post(self.creation_url.clone()).json(&body),
            )
            .await?;

        let address = response.address.trim();
        if address.is_empty() {
            return Err(UpstreamError::MalformedResponse(
                "creation response has an empty address".into(),
            ));
        }
        Ok(Address::new(address))
    }

    async fn fetch_balance(
        &self,
        network: Network,
        address: &Address,
    ) -> std::result::Result<Amount, UpstreamError> {
        let request = self
            .http
            .get(self.balance_url.clone())
            .query(&[("network", network.as_str()), ("address", address.as_str())]);
        let response: BalanceResponse = self.execute(Operation::FetchBalance, request).await?;
        Ok(response.balance)
    }

    async fn fetch_prices(&self, pairs: &[PairKey]) -> std::result::Result<PriceQuote, UpstreamError> {
        let body = PriceRequest {
            pairs: pairs.iter().map(PairKey::as_str).collect(),
        };
        let response: PriceResponse = self
            .execute(
                Operation::FetchPrices,
                self.http.post(self.price_url.clone()).json(&body),
            )
            .await?;

        Ok(PriceQuote {
            prices: response
                .prices
                .into_iter()
                .map(|(pair, rate)| (PairKey::from(pair), rate))
                .collect(),
            fetched_at: response.fetched_at,
        })
    }
}

/// Map a non-success HTTP status to an upstream error.
#[must_use]
pub fn classify_status(
    operation: Operation,
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
) -> UpstreamError {
    let message = excerpt(body, status);
    match status.as_u16() {
        429 => UpstreamError::RateLimited { retry_after },
        402 | 403 => UpstreamError::QuotaExceeded(message),
        400 | 404 | 422 if operation == Operation::CreateWallet => {
            UpstreamError::InvalidNetwork(message)
        }
        code if status.is_server_error() => {
            UpstreamError::NetworkUnavailable(format!("status {code}: {message}"))
        }
        code => UpstreamError::Rejected {
            status: code,
            message,
        },
    }
}

fn classify_transport(error: reqwest::Error) -> UpstreamError {
    if error.is_decode() {
        UpstreamError::MalformedResponse(error.to_string())
    } else {
        UpstreamError::NetworkUnavailable(error.to_string())
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn excerpt(body: &str, status: StatusCode) -> String {
    let body = body.trim();
    if body.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string();
    }
    body.chars().take(BODY_EXCERPT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one canned HTTP response and hand back the raw request.
    async fn serve_once(status: &str, extra_headers: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n{extra_headers}\r\n{body}",
            body.len()
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                if n == 0 || request_complete(&request) {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).into_owned()
        });
        (base, handle)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(end) = text.find("\r\n\r\n") else {
            return false;
        };
        let length = text[..end]
            .lines()
            .find_map(|l| {
                let (name, value) = l.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        raw.len() >= end + 4 + length
    }

    fn client_for(base: &str, api_key: Option<&str>) -> HttpNetworkClient {
        HttpNetworkClient::from_config(&UpstreamConfig {
            creation_url: format!("{base}/v1/wallets"),
            balance_url: format!("{base}/v1/balances"),
            price_url: format!("{base}/v1/prices"),
            timeout_ms: 2_000,
            api_key: api_key.map(str::to_string),
        })
        .unwrap()
    }

    #[test]
    fn classifies_statuses() {
        let create = Operation::CreateWallet;
        let balance = Operation::FetchBalance;

        assert!(matches!(
            classify_status(create, StatusCode::SERVICE_UNAVAILABLE, None, ""),
            UpstreamError::NetworkUnavailable(_)
        ));
        assert_eq!(
            classify_status(balance, StatusCode::TOO_MANY_REQUESTS, Some(Duration::from_secs(3)), ""),
            UpstreamError::RateLimited {
                retry_after: Some(Duration::from_secs(3))
            }
        );
        assert!(matches!(
            classify_status(create, StatusCode::UNPROCESSABLE_ENTITY, None, "bad network"),
            UpstreamError::InvalidNetwork(m) if m == "bad network"
        ));
        assert!(matches!(
            classify_status(create, StatusCode::FORBIDDEN, None, ""),
            UpstreamError::QuotaExceeded(_)
        ));
        assert!(matches!(
            classify_status(balance, StatusCode::NOT_FOUND, None, ""),
            UpstreamError::Rejected { status: 404, .. }
        ));
    }

    #[test]
    fn error_message_is_truncated() {
        let body = "x".repeat(1_000);
        match classify_status(Operation::FetchPrices, StatusCode::BAD_REQUEST, None, &body) {
            UpstreamError::Rejected { message, .. } => assert_eq!(message.len(), BODY_EXCERPT),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, "7".parse().unwrap());
        assert_eq!(retry_after(&headers), Some(Duration::from_secs(7)));

        headers.insert(RETRY_AFTER, "Wed, 21 Oct 2015 07:28:00 GMT".parse().unwrap());
        assert_eq!(retry_after(&headers), None);
    }

    #[tokio::test]
    async fn create_wallet_posts_network_and_user() {
        let (base, server) = serve_once("201 Created", "", r#"{"address":"bc1qexample"}"#).await;
        let client = client_for(&base, Some("secret"));

        let address = client
            .create_wallet(Network::Bitcoin, &UserId::from("u-1"))
            .await
            .unwrap();

        assert_eq!(address.as_str(), "bc1qexample");
        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1/wallets"));
        assert!(request.to_ascii_lowercase().contains("authorization: bearer secret"));
        assert!(request.contains(r#""network":"BTC""#));
        assert!(request.contains(r#""userId":"u-1""#));
    }

    #[tokio::test]
    async fn fetch_balance_sends_query() {
        let (base, server) = serve_once("200 OK", "", r#"{"balance":"1.5"}"#).await;
        let client = client_for(&base, None);

        let balance = client
            .fetch_balance(Network::Ethereum, &Address::from("0xabc"))
            .await
            .unwrap();

        assert_eq!(balance, dec!(1.5));
        let request = server.await.unwrap();
        assert!(request.starts_with("GET /v1/balances?network=ETH&address=0xabc"));
    }

    #[tokio::test]
    async fn rate_limit_carries_retry_after() {
        let (base, _server) = serve_once("429 Too Many Requests", "retry-after: 2\r\n", "{}").await;
        let client = client_for(&base, None);

        let err = client.fetch_prices(&[PairKey::from("BTC_USD")]).await.unwrap_err();

        assert_eq!(
            err,
            UpstreamError::RateLimited {
                retry_after: Some(Duration::from_secs(2))
            }
        );
    }

    #[tokio::test]
    async fn undecodable_body_is_malformed() {
        let (base, _server) = serve_once("200 OK", "", "<html>oops</html>").await;
        let client = client_for(&base, None);

        let err = client
            .fetch_balance(Network::Solana, &Address::from("sol1"))
            .await
            .unwrap_err();

        assert!(matches!(err, UpstreamError::MalformedResponse(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn empty_address_is_malformed() {
        let (base, _server) = serve_once("200 OK", "", r#"{"address":"  "}"#).await;
        let client = client_for(&base, None);

        let err = client
            .create_wallet(Network::Tron, &UserId::from("u"))
            .await
            .unwrap_err();

        assert!(matches!(err, UpstreamError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_network_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);
        let client = client_for(&base, None);

        let err = client
            .fetch_balance(Network::Bitcoin, &Address::from("bc1q"))
            .await
            .unwrap_err();

        assert!(matches!(err, UpstreamError::NetworkUnavailable(_)));
    }

    #[tokio::test]
    async fn prices_are_keyed_by_pair() {
        let (base, server) = serve_once(
            "200 OK",
            "",
            r#"{"prices":{"btc_usd":"60000","ETH_USD":3000},"fetchedAt":"2026-10-19T00:00:00Z"}"#,
        )
        .await;
        let client = client_for(&base, None);

        let quote = client
            .fetch_prices(&[PairKey::from("BTC_USD"), PairKey::from("ETH_USD")])
            .await
            .unwrap();

        assert_eq!(quote.prices[&PairKey::from("BTC_USD")], dec!(60000));
        assert_eq!(quote.prices[&PairKey::from("ETH_USD")], dec!(3000));
        assert!(quote.fetched_at.is_some());
        assert!(server.await.unwrap().contains(r#""pairs":["BTC_USD","ETH_USD"]"#));
    }
}
