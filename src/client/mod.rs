use crate::config::ApiConfig;
use crate::error::FetchError;
use crate::models::{Allocation, AllocationBucket, Holding, PerformanceData, RemoteSummary};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{debug, warn};
use url::Url;

// ── Endpoints ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Holdings,
    Summary,
    Allocation,
    Performance,
    MarketCap,
}

impl Endpoint {
    pub const ALL: [Endpoint; 5] = [
        Endpoint::Holdings,
        Endpoint::Summary,
        Endpoint::Allocation,
        Endpoint::Performance,
        Endpoint::MarketCap,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Holdings => "/api/portfolio/holdings",
            Endpoint::Summary => "/api/portfolio/summary",
            Endpoint::Allocation => "/api/portfolio/allocation",
            Endpoint::Performance => "/api/portfolio/performance",
            Endpoint::MarketCap => "/api/portfolio/marketcap",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

// ── Source trait ──────────────────────────────────────────────────────────────

/// Swappable backend abstraction, one call per data slice.
#[async_trait]
pub trait PortfolioSource: Send + Sync {
    async fn fetch_holdings(&self) -> Result<Vec<Holding>, FetchError>;
    async fn fetch_summary(&self) -> Result<RemoteSummary, FetchError>;
    async fn fetch_allocation(&self) -> Result<Allocation, FetchError>;
    async fn fetch_performance(&self) -> Result<PerformanceData, FetchError>;
    async fn fetch_market_cap(&self) -> Result<Vec<AllocationBucket>, FetchError>;
}

// ── REST client ───────────────────────────────────────────────────────────────

pub struct ApiClient {
    inner: reqwest::Client,
    base_url: Url,
    max_retries: usize,
    retry_base_ms: u64,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .build()
            .context("Failed to build HTTP client")?;

        // Endpoint paths are joined relative to the base, so keep any prefix.
        let mut base = config.base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base)
            .with_context(|| format!("Invalid API base URL {:?}", config.base_url))?;

        Ok(Self {
            inner,
            base_url,
            max_retries: config.max_retries,
            retry_base_ms: config.retry_base_ms,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn url_for(&self, endpoint: Endpoint) -> Result<Url, FetchError> {
        self.base_url
            .join(endpoint.path().trim_start_matches('/'))
            .map_err(|source| FetchError::Url { endpoint, source })
    }

    async fn get_once<T: DeserializeOwned>(&self, endpoint: Endpoint) -> Result<T, FetchError> {
        let url = self.url_for(endpoint)?;
        debug!("GET {}", url);

        let resp = self
            .inner
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport { endpoint, source })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status { endpoint, status });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|source| FetchError::Transport { endpoint, source })?;

        serde_json::from_slice(&body).map_err(|source| FetchError::Decode { endpoint, source })
    }

    /// GET + decode, retrying transient failures with exponential backoff.
    async fn get_json<T: DeserializeOwned>(&self, endpoint: Endpoint) -> Result<T, FetchError> {
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(self.retry_base_ms)
            .max_delay(Duration::from_secs(10))
            .map(jitter)
            .take(self.max_retries);

        RetryIf::start(
            strategy,
            || self.get_once::<T>(endpoint),
            |e: &FetchError| {
                let retry = e.is_retryable();
                if retry {
                    warn!("{}; retrying", e);
                }
                retry
            },
        )
        .await
    }
}

#[async_trait]
impl PortfolioSource for ApiClient {
    async fn fetch_holdings(&self) -> Result<Vec<Holding>, FetchError> {
        self.get_json(Endpoint::Holdings).await
    }

    async fn fetch_summary(&self) -> Result<RemoteSummary, FetchError> {
        self.get_json(Endpoint::Summary).await
    }

    async fn fetch_allocation(&self) -> Result<Allocation, FetchError> {
        self.get_json(Endpoint::Allocation).await
    }

    async fn fetch_performance(&self) -> Result<PerformanceData, FetchError> {
        self.get_json(Endpoint::Performance).await
    }

    async fn fetch_market_cap(&self) -> Result<Vec<AllocationBucket>, FetchError> {
        self.get_json(Endpoint::MarketCap).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> ApiConfig {
        ApiConfig {
            base_url: base_url.to_string(),
            max_retries: 0,
            ..ApiConfig::default()
        }
    }

    #[test]
    fn test_url_keeps_prefix() {
        let client = ApiClient::new(&config("http://localhost:8000/backend/")).unwrap();
        let url = client.url_for(Endpoint::Holdings).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/backend/api/portfolio/holdings");

        let client = ApiClient::new(&config("http://localhost:8000")).unwrap();
        let url = client.url_for(Endpoint::MarketCap).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/portfolio/marketcap");
    }

    #[test]
    fn test_bad_base_url() {
        assert!(ApiClient::new(&config("not a url")).is_err());
    }

    #[tokio::test]
    async fn test_fetch_holdings() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/portfolio/holdings")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"[{"symbol":"HDFC","name":"HDFC Bank","quantity":10,"avgPrice":1500.0,
                    "currentPrice":1650.0,"sector":"Banking","marketCap":"Large",
                    "value":16500.0,"gainLoss":1500.0,"gainLossPercent":10.0}]"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&config(&server.url())).unwrap();
        let holdings = client.fetch_holdings().await.unwrap();

        mock.assert_async().await;
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].symbol, "HDFC");
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/portfolio/summary")
            .with_status(404)
            .create_async()
            .await;

        let client = ApiClient::new(&config(&server.url())).unwrap();
        let err = client.fetch_summary().await.unwrap_err();
        assert!(matches!(
            err,
            FetchError::Status { endpoint: Endpoint::Summary, status } if status.as_u16() == 404
        ));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/portfolio/marketcap")
            .with_status(200)
            .with_body("{not json")
            .create_async()
            .await;

        let client = ApiClient::new(&config(&server.url())).unwrap();
        let err = client.fetch_market_cap().await.unwrap_err();
        assert!(matches!(err, FetchError::Decode { endpoint: Endpoint::MarketCap, .. }));
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/portfolio/allocation")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let cfg = ApiConfig {
            base_url: server.url(),
            max_retries: 2,
            retry_base_ms: 1,
            ..ApiConfig::default()
        };
        let client = ApiClient::new(&cfg).unwrap();
        let err = client.fetch_allocation().await.unwrap_err();

        mock.assert_async().await;
        assert!(err.is_retryable());
    }
}
