// =============================================================================
// Acquisition Stage — partitioned fetch workers feeding the transform channel
// =============================================================================
//
// The symbol set is split into contiguous, near-equal chunks, one per worker.
// Each worker polls its chunk on a fixed interval until its time budget runs
// out, emitting a PricePoint per successful fetch. A failed fetch is logged
// and skipped; there is no retry, backoff, or circuit breaking.
//
// After every worker has finished, the stage enqueues exactly one
// EndOfStream marker — the only shutdown signal the downstream stages get.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::channel::StreamSender;
use crate::quotes::QuoteSource;
use crate::stats::PipelineStats;
use crate::types::{PricePoint, Stage, StageState};

/// Split `symbols` into exactly `worker_count` contiguous chunks.
///
/// Chunk size is `ceil(len / worker_count)`, so later chunks may be smaller —
/// or empty when there are more workers than symbols. Returns no chunks when
/// `worker_count` is zero.
pub fn partition_symbols(symbols: &[String], worker_count: usize) -> Vec<Vec<String>> {
    if worker_count == 0 {
        return Vec::new();
    }

    let chunk_size = (symbols.len() + worker_count - 1) / worker_count;

    (0..worker_count)
        .map(|i| {
            let start = (i * chunk_size).min(symbols.len());
            let end = ((i + 1) * chunk_size).min(symbols.len());
            symbols[start..end].to_vec()
        })
        .collect()
}

/// Run the acquisition stage to completion.
///
/// Spawns one fetch worker per chunk, waits for all of them to exhaust their
/// time budget, then enqueues the end-of-stream marker on `out`.
pub async fn run(
    symbols: Vec<String>,
    worker_count: usize,
    duration: Duration,
    interval: Duration,
    source: Arc<dyn QuoteSource>,
    out: StreamSender<PricePoint>,
    stats: Arc<PipelineStats>,
) {
    stats.transition(Stage::Acquisition, StageState::Running);

    let chunks = partition_symbols(&symbols, worker_count);
    info!(
        symbols = symbols.len(),
        workers = chunks.len(),
        duration_secs = duration.as_secs(),
        interval_secs = interval.as_secs(),
        "acquisition stage started"
    );

    let mut workers = Vec::with_capacity(chunks.len());
    for (worker_id, chunk) in chunks.into_iter().enumerate() {
        let source = source.clone();
        let tx = out.clone();
        let stats = stats.clone();
        workers.push(tokio::spawn(fetch_worker(
            worker_id, chunk, duration, interval, source, tx, stats,
        )));
    }

    for handle in workers {
        if let Err(e) = handle.await {
            error!(error = %e, "acquisition worker panicked");
        }
    }

    // All workers are done; the marker is the last item on the channel.
    if out.finish().is_err() {
        warn!("transform channel closed before the end-of-stream marker");
    }

    stats.transition(Stage::Acquisition, StageState::Terminated);
    info!("acquisition stage terminated");
}

/// One fetch worker: poll every symbol in `chunk`, in chunk order, once per
/// pass; sleep `interval` between passes; stop when `duration` has elapsed
/// (measured from this worker's own start).
async fn fetch_worker(
    worker_id: usize,
    chunk: Vec<String>,
    duration: Duration,
    interval: Duration,
    source: Arc<dyn QuoteSource>,
    tx: StreamSender<PricePoint>,
    stats: Arc<PipelineStats>,
) {
    if chunk.is_empty() {
        debug!(worker_id, "no symbols assigned — worker exiting");
        return;
    }

    debug!(worker_id, symbols = ?chunk, "fetch worker started");
    let started = tokio::time::Instant::now();

    while started.elapsed() < duration {
        for symbol in &chunk {
            match source.fetch(symbol).await {
                Ok(price) => {
                    let point = PricePoint {
                        symbol: symbol.clone(),
                        price,
                        timestamp: Utc::now(),
                    };
                    debug!(worker_id, symbol = %symbol, price, "quote fetched");
                    stats.record_fetched();

                    if tx.send(point).is_err() {
                        warn!(
                            worker_id,
                            symbol = %symbol,
                            "transform channel closed — worker stopping early"
                        );
                        return;
                    }
                }
                Err(e) => {
                    stats.record_fetch_error();
                    warn!(worker_id, symbol = %symbol, error = %e, "quote fetch failed — skipping");
                }
            }
        }

        tokio::time::sleep(interval).await;
    }

    debug!(worker_id, "fetch time budget exhausted — worker exiting");
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicU64, Ordering};

    use anyhow::Result;
    use async_trait::async_trait;

    use crate::channel::{self, StreamItem};

    fn syms(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    /// Quote source returning a fixed price, counting calls.
    struct FixedSource {
        price: f64,
        calls: AtomicU64,
    }

    impl FixedSource {
        fn new(price: f64) -> Self {
            Self {
                price,
                calls: AtomicU64::new(0),
            }
        }
    }

    #[async_trait]
    impl QuoteSource for FixedSource {
        async fn fetch(&self, _symbol: &str) -> Result<f64> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(self.price)
        }
    }

    /// Quote source that always fails.
    struct UnreachableSource;

    #[async_trait]
    impl QuoteSource for UnreachableSource {
        async fn fetch(&self, symbol: &str) -> Result<f64> {
            anyhow::bail!("quote source unreachable for {symbol}")
        }
    }

    // ---- partition_symbols -------------------------------------------------

    #[test]
    fn partition_even_split() {
        let chunks = partition_symbols(&syms(&["AAPL", "MSFT", "GOOG", "AMZN"]), 2);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], syms(&["AAPL", "MSFT"]));
        assert_eq!(chunks[1], syms(&["GOOG", "AMZN"]));
    }

    #[test]
    fn partition_ceil_leaves_empty_tail() {
        // ceil(4/3) = 2 → sizes [2, 2, 0].
        let chunks = partition_symbols(&syms(&["AAPL", "MSFT", "GOOG", "AMZN"]), 3);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], syms(&["AAPL", "MSFT"]));
        assert_eq!(chunks[1], syms(&["GOOG", "AMZN"]));
        assert!(chunks[2].is_empty());
    }

    #[test]
    fn partition_more_workers_than_symbols() {
        let chunks = partition_symbols(&syms(&["AAPL", "MSFT"]), 4);
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0], syms(&["AAPL"]));
        assert_eq!(chunks[1], syms(&["MSFT"]));
        assert!(chunks[2].is_empty());
        assert!(chunks[3].is_empty());
    }

    #[test]
    fn partition_zero_workers_yields_no_chunks() {
        assert!(partition_symbols(&syms(&["AAPL"]), 0).is_empty());
    }

    #[test]
    fn partition_empty_symbol_list() {
        let chunks = partition_symbols(&[], 2);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.is_empty()));
    }

    #[test]
    fn partition_preserves_configuration_order() {
        let chunks = partition_symbols(&syms(&["A", "B", "C", "D", "E"]), 2);
        assert_eq!(chunks[0], syms(&["A", "B", "C"]));
        assert_eq!(chunks[1], syms(&["D", "E"]));
    }

    // ---- run ---------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn run_emits_points_then_single_marker() {
        let (tx, mut rx) = channel::unbounded::<PricePoint>();
        let source = Arc::new(FixedSource::new(150.25));
        let stats = Arc::new(PipelineStats::new());

        run(
            syms(&["AAPL"]),
            2,
            Duration::from_secs(1),
            Duration::from_secs(1),
            source,
            tx,
            stats.clone(),
        )
        .await;

        let mut items = Vec::new();
        let mut markers = 0;
        while let Some(received) = rx.recv().await {
            match received {
                StreamItem::Item(point) => {
                    assert_eq!(markers, 0, "item observed after the marker");
                    items.push(point);
                }
                StreamItem::EndOfStream => markers += 1,
            }
        }

        assert!(!items.is_empty());
        assert!(items.iter().all(|p| p.symbol == "AAPL"));
        assert!(items.iter().all(|p| (p.price - 150.25).abs() < f64::EPSILON));
        assert_eq!(markers, 1);
        assert_eq!(stats.snapshot().points_fetched, items.len() as u64);
        assert_eq!(
            stats.stage_state(Stage::Acquisition),
            StageState::Terminated
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetches_are_skipped_not_fatal() {
        let (tx, mut rx) = channel::unbounded::<PricePoint>();
        let stats = Arc::new(PipelineStats::new());

        run(
            syms(&["AAPL", "MSFT"]),
            1,
            Duration::from_secs(1),
            Duration::from_secs(1),
            Arc::new(UnreachableSource),
            tx,
            stats.clone(),
        )
        .await;

        // No items, but the marker still arrives and both symbols were tried.
        assert_eq!(rx.recv().await, Some(StreamItem::EndOfStream));
        assert_eq!(rx.recv().await, None);

        let snap = stats.snapshot();
        assert_eq!(snap.points_fetched, 0);
        assert_eq!(snap.fetch_errors, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_symbol_list_still_produces_marker() {
        let (tx, mut rx) = channel::unbounded::<PricePoint>();
        let stats = Arc::new(PipelineStats::new());

        run(
            Vec::new(),
            2,
            Duration::from_secs(1),
            Duration::from_secs(1),
            Arc::new(FixedSource::new(1.0)),
            tx,
            stats,
        )
        .await;

        assert_eq!(rx.recv().await, Some(StreamItem::EndOfStream));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn workers_poll_repeatedly_until_duration_elapses() {
        let (tx, mut rx) = channel::unbounded::<PricePoint>();
        let source = Arc::new(FixedSource::new(42.0));
        let stats = Arc::new(PipelineStats::new());

        // 3 s budget with 1 s interval → passes at t = 0, 1, 2 → 3 fetches.
        run(
            syms(&["AAPL"]),
            1,
            Duration::from_secs(3),
            Duration::from_secs(1),
            source.clone(),
            tx,
            stats,
        )
        .await;

        let mut count = 0;
        while let Some(StreamItem::Item(_)) = rx.recv().await {
            count += 1;
        }
        assert_eq!(count, 3);
        assert_eq!(source.calls.load(Ordering::Relaxed), 3);
    }
}
