pub mod client;

// Re-export the concrete client for convenient access (e.g. `use crate::quotes::YahooQuoteClient`).
pub use client::YahooQuoteClient;

use anyhow::Result;
use async_trait::async_trait;

/// The quote-source collaborator: a synchronous-looking fetch that may fail.
///
/// Call latency and failure modes are opaque to the pipeline; a failed fetch
/// is logged and skipped, never retried.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetch the current price for `symbol`.
    async fn fetch(&self, symbol: &str) -> Result<f64>;
}
