// =============================================================================
// Quoteflow — Main Entry Point
// =============================================================================
//
// One invocation is one pipeline run: load config, run the setup phase for
// all three stages sequentially, run the stages concurrently, wait for
// completion. There are no runtime arguments; unhandled pipeline errors are
// logged, not surfaced as a nonzero exit.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod acquisition;
mod channel;
mod pipeline;
mod quotes;
mod runtime_config;
mod stats;
mod storage;
mod transform;
mod types;

use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::pipeline::Pipeline;
use crate::quotes::YahooQuoteClient;
use crate::runtime_config::RuntimeConfig;
use crate::storage::LogStore;

#[tokio::main]
async fn main() {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    let config_path =
        std::env::var("QUOTEFLOW_CONFIG").unwrap_or_else(|_| "quoteflow.json".into());

    // Config is loaded before the subscriber exists (the log file path lives
    // in the config), so any load error is reported after logging comes up.
    let (mut config, load_error) = match RuntimeConfig::load(&config_path) {
        Ok(config) => (config, None),
        Err(e) => (RuntimeConfig::default(), Some(e)),
    };

    // ── 2. Logging: console + file, installed once ───────────────────────
    init_logging(&config.log_file);

    match load_error {
        None => info!(path = %config_path, symbols = ?config.symbols, "runtime config loaded"),
        Some(e) => {
            warn!(path = %config_path, error = %format!("{e:#}"), "failed to load runtime config — using defaults");
        }
    }

    // Override symbols from env if available.
    if let Ok(syms) = std::env::var("QUOTEFLOW_SYMBOLS") {
        let parsed: Vec<String> = syms
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        if !parsed.is_empty() {
            info!(symbols = ?parsed, "symbol list overridden from QUOTEFLOW_SYMBOLS");
            config.symbols = parsed;
        }
    }

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║          Quoteflow Pipeline — Starting Up                ║");
    info!("╚══════════════════════════════════════════════════════════╝");
    info!(
        symbols = ?config.symbols,
        conversion_rate = config.conversion_rate,
        workers = config.acquisition_workers,
        pool_size = config.transform_pool_size,
        duration_secs = config.fetch_duration_secs,
        interval_secs = config.fetch_interval_secs,
        "configuration"
    );

    // ── 3. Collaborators ─────────────────────────────────────────────────
    let source = Arc::new(YahooQuoteClient::new());
    let store = Arc::new(LogStore);

    // ── 4. Setup phase, then one concurrent pipeline run ─────────────────
    let pipeline = Pipeline::new(config, source, store);
    pipeline.setup().await;
    pipeline.run().await;

    info!("completed the entire pipeline run");
}

/// Install the global tracing subscriber: an env-filtered console layer plus
/// a plain-text file layer writing to `log_file`.
///
/// If the log file cannot be opened, console logging still comes up and the
/// failure is reported there.
fn init_logging(log_file: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, file_error) = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
    {
        Ok(file) => (
            Some(fmt::layer().with_ansi(false).with_writer(Arc::new(file))),
            None,
        ),
        Err(e) => (None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    match file_error {
        None => info!(path = log_file, "file logging enabled"),
        Some(e) => warn!(path = log_file, error = %e, "failed to open log file — console logging only"),
    }
}
