// =============================================================================
// Pipeline Orchestrator — wires the three stages and runs them to completion
// =============================================================================
//
// Owns the configuration and the two collaborators (quote source, store).
// One call to `run` is one pipeline run: build the two channels, spawn the
// three stage tasks, join all of them, log the summary. Channels live for
// the duration of the run and are dropped once both markers have been
// consumed.
//
// Control flows from here outward at start and converges back at join; data
// flows strictly acquisition → transform → storage.
// =============================================================================

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::channel;
use crate::quotes::QuoteSource;
use crate::runtime_config::RuntimeConfig;
use crate::stats::PipelineStats;
use crate::storage::{self, Store};
use crate::types::{PricePoint, ProcessedPricePoint};
use crate::{acquisition, transform};

/// A fully wired, single-run quote pipeline.
pub struct Pipeline {
    config: RuntimeConfig,
    source: Arc<dyn QuoteSource>,
    store: Arc<dyn Store>,
    stats: Arc<PipelineStats>,
}

impl Pipeline {
    /// Wire a pipeline from an explicit config and its two collaborators.
    pub fn new(config: RuntimeConfig, source: Arc<dyn QuoteSource>, store: Arc<dyn Store>) -> Self {
        Self {
            config,
            source,
            store,
            stats: Arc::new(PipelineStats::new()),
        }
    }

    /// Shared stats handle, usable while and after the pipeline runs.
    pub fn stats(&self) -> Arc<PipelineStats> {
        self.stats.clone()
    }

    /// One-time setup phase, run sequentially for all three stages before
    /// anything is spawned.
    ///
    /// The acquisition health check fetches the first configured symbol once.
    /// Failure is logged but NOT fatal: the pipeline runs regardless, at the
    /// risk of burning its whole duration without fetching anything.
    pub async fn setup(&self) {
        info!("starting pipeline setup phase");

        match self.config.symbols.first() {
            Some(symbol) => match self.source.fetch(symbol).await {
                Ok(price) => {
                    info!(symbol = %symbol, price, "acquisition health check passed");
                }
                Err(e) => {
                    error!(symbol = %symbol, error = %e, "acquisition health check failed");
                    warn!("proceeding despite failed health check — quotes may be unavailable for the entire run");
                }
            },
            None => warn!("no symbols configured — acquisition will emit nothing"),
        }

        info!("transform stage setup complete");
        info!("storage stage setup complete");
        info!("pipeline setup phase complete");
    }

    /// Run all three stages concurrently and wait for every one to finish.
    pub async fn run(self) {
        let (acq_tx, acq_rx) = channel::unbounded::<PricePoint>();
        let (proc_tx, proc_rx) = channel::unbounded::<ProcessedPricePoint>();

        info!(
            symbols = self.config.symbols.len(),
            workers = self.config.acquisition_workers,
            pool_size = self.config.transform_pool_size,
            "starting pipeline run"
        );

        let acquisition = tokio::spawn(acquisition::run(
            self.config.symbols.clone(),
            self.config.acquisition_workers,
            self.config.fetch_duration(),
            self.config.fetch_interval(),
            self.source.clone(),
            acq_tx,
            self.stats.clone(),
        ));

        let transform = tokio::spawn(transform::run(
            acq_rx,
            proc_tx,
            self.config.transform_pool_size,
            self.config.conversion_rate,
            self.stats.clone(),
        ));

        let storage = tokio::spawn(storage::run(proc_rx, self.store.clone(), self.stats.clone()));

        for (name, handle) in [
            ("acquisition", acquisition),
            ("transform", transform),
            ("storage", storage),
        ] {
            if let Err(e) = handle.await {
                error!(stage = name, error = %e, "stage task failed");
            }
        }

        let snap = self.stats.snapshot();
        info!(
            fetched = snap.points_fetched,
            fetch_errors = snap.fetch_errors,
            transformed = snap.points_transformed,
            malformed_dropped = snap.malformed_dropped,
            delivered = snap.points_delivered,
            "pipeline run complete"
        );
    }
}
