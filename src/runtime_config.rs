// =============================================================================
// Runtime Configuration — pipeline settings loaded once at startup
// =============================================================================
//
// All tunables for a pipeline run live here and are passed by value into the
// orchestrator at construction. There is no process-wide singleton; a config
// is loaded exactly once in main and injected everywhere it is needed.
//
// All fields carry `#[serde(default)]` so that adding new fields never breaks
// loading an older config file.
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbols() -> Vec<String> {
    vec![
        "AAPL".to_string(),
        "MSFT".to_string(),
        "GOOG".to_string(),
        "AMZN".to_string(),
    ]
}

fn default_conversion_rate() -> f64 {
    // USD → DKK.
    6.8
}

fn default_log_file() -> String {
    "quoteflow.log".to_string()
}

fn default_acquisition_workers() -> usize {
    2
}

fn default_transform_pool_size() -> usize {
    10
}

fn default_fetch_duration_secs() -> u64 {
    10
}

fn default_fetch_interval_secs() -> u64 {
    1
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level configuration for one quoteflow pipeline run.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Symbols the pipeline fetches quotes for, in configuration order.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    /// Multiplier applied to each price to produce the secondary price.
    #[serde(default = "default_conversion_rate")]
    pub conversion_rate: f64,

    /// Path of the log file the file logging layer writes to.
    #[serde(default = "default_log_file")]
    pub log_file: String,

    /// Number of concurrent fetch workers the symbol set is partitioned over.
    #[serde(default = "default_acquisition_workers")]
    pub acquisition_workers: usize,

    /// Maximum number of concurrently running transform tasks.
    #[serde(default = "default_transform_pool_size")]
    pub transform_pool_size: usize,

    /// How long each fetch worker keeps polling, in seconds.
    #[serde(default = "default_fetch_duration_secs")]
    pub fetch_duration_secs: u64,

    /// Pause between successive passes over a worker's symbols, in seconds.
    #[serde(default = "default_fetch_interval_secs")]
    pub fetch_interval_secs: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            conversion_rate: default_conversion_rate(),
            log_file: default_log_file(),
            acquisition_workers: default_acquisition_workers(),
            transform_pool_size: default_transform_pool_size(),
            fetch_duration_secs: default_fetch_duration_secs(),
            fetch_interval_secs: default_fetch_interval_secs(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// Returns an error if the file is missing or malformed so the caller can
    /// fall back to defaults with a warning. No logging happens here: load
    /// runs before the tracing subscriber is installed (the log file path
    /// comes from this very config).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        Ok(config)
    }

    /// Per-worker fetch time budget.
    pub fn fetch_duration(&self) -> Duration {
        Duration::from_secs(self.fetch_duration_secs)
    }

    /// Pause between fetch passes.
    pub fn fetch_interval(&self) -> Duration {
        Duration::from_secs(self.fetch_interval_secs)
    }
}
