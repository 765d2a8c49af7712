// =============================================================================
// Yahoo Finance REST Client — live quote lookup over the public chart API
// =============================================================================
//
// Uses the unauthenticated v8 chart endpoint; the most recent market price is
// carried in the response meta block. Yahoo rejects requests without a
// browser-like User-Agent, so the client pins one at construction.
// =============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::quotes::QuoteSource;

/// Request timeout for every quote lookup (seconds).
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Yahoo Finance REST client for live quote lookups.
#[derive(Debug, Clone)]
pub struct YahooQuoteClient {
    base_url: String,
    client: reqwest::Client,
}

impl YahooQuoteClient {
    /// Create a client against the public Yahoo Finance API.
    pub fn new() -> Self {
        Self::with_base_url("https://query1.finance.yahoo.com")
    }

    /// Create a client against an alternative base URL (used by tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent("Mozilla/5.0 (compatible; quoteflow/1.0)")
            .build()
            .expect("failed to build reqwest client");

        let base_url = base_url.into();
        debug!(base_url = %base_url, "YahooQuoteClient initialised");

        Self { base_url, client }
    }

    /// GET /v8/finance/chart/{symbol} — latest regular-market price.
    #[instrument(skip(self), name = "yahoo::latest_price")]
    pub async fn latest_price(&self, symbol: &str) -> Result<f64> {
        let url = format!(
            "{}/v8/finance/chart/{}?range=1d&interval=1m",
            self.base_url, symbol
        );

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("GET /v8/finance/chart request failed")?;

        let status = resp.status();
        let body: serde_json::Value = resp
            .json()
            .await
            .context("failed to parse chart response")?;

        if !status.is_success() {
            anyhow::bail!(
                "Yahoo GET /v8/finance/chart returned {}: {}",
                status,
                body
            );
        }

        let price = body["chart"]["result"][0]["meta"]["regularMarketPrice"]
            .as_f64()
            .context("chart response missing regularMarketPrice")?;

        debug!(symbol, price, "live quote fetched");
        Ok(price)
    }
}

impl Default for YahooQuoteClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuoteSource for YahooQuoteClient {
    async fn fetch(&self, symbol: &str) -> Result<f64> {
        self.latest_price(symbol).await
    }
}
