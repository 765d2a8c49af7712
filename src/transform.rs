// =============================================================================
// Transform Stage — bounded worker pool converting raw points
// =============================================================================
//
// A single reader drains the acquisition channel until the end-of-stream
// marker, dispatching each point to a semaphore-bounded pool of transform
// tasks. Nothing is forwarded while the reader is still active: results are
// awaited and pushed downstream only in the drain phase, as they complete.
//
// A malformed point (non-finite price) is logged and dropped. It never aborts
// the pool and never reaches the sink channel; there is no failure threshold.
// =============================================================================

use std::sync::Arc;

use futures_util::stream::{FuturesUnordered, StreamExt};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::channel::{StreamItem, StreamReceiver, StreamSender};
use crate::stats::PipelineStats;
use crate::types::{PricePoint, ProcessedPricePoint, Stage, StageState};

/// A per-item transform failure. Terminal only to the item that produced it.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The price is NaN or infinite — the only malformed payload this type
    /// system can carry.
    #[error("malformed price point for {symbol}: price {price} is not a finite number")]
    MalformedPrice { symbol: String, price: f64 },
}

/// Convert a raw point into its processed form.
///
/// `secondary_price = price * conversion_rate`, computed only for points
/// whose price is a finite number.
pub fn convert(
    point: PricePoint,
    conversion_rate: f64,
) -> Result<ProcessedPricePoint, TransformError> {
    if !point.price.is_finite() {
        return Err(TransformError::MalformedPrice {
            symbol: point.symbol,
            price: point.price,
        });
    }

    Ok(ProcessedPricePoint {
        secondary_price: point.price * conversion_rate,
        symbol: point.symbol,
        price: point.price,
        timestamp: point.timestamp,
    })
}

/// Run the transform stage to completion.
///
/// Reads until the end-of-stream marker, then drains the pool and enqueues
/// exactly one marker on `out`.
pub async fn run(
    mut input: StreamReceiver<PricePoint>,
    out: StreamSender<ProcessedPricePoint>,
    pool_size: usize,
    conversion_rate: f64,
    stats: Arc<PipelineStats>,
) {
    stats.transition(Stage::Transform, StageState::Running);
    info!(pool_size, conversion_rate, "transform stage started");

    let pool = Arc::new(Semaphore::new(pool_size.max(1)));
    let mut pending: FuturesUnordered<JoinHandle<Result<ProcessedPricePoint, TransformError>>> =
        FuturesUnordered::new();

    // Reader loop: dispatch every item, stop on the marker.
    loop {
        match input.recv().await {
            Some(StreamItem::Item(point)) => {
                let permit = pool
                    .clone()
                    .acquire_owned()
                    .await
                    .expect("transform pool semaphore is never closed");

                pending.push(tokio::spawn(async move {
                    let result = convert(point, conversion_rate);
                    drop(permit);
                    result
                }));
            }
            Some(StreamItem::EndOfStream) => {
                debug!("end of stream observed — entering drain phase");
                break;
            }
            None => {
                warn!("input channel closed without an end-of-stream marker");
                break;
            }
        }
    }

    // Drain phase: forward results as they complete, in completion order.
    stats.transition(Stage::Transform, StageState::Draining);
    debug!(pending = pending.len(), "draining transform pool");

    while let Some(joined) = pending.next().await {
        match joined {
            Ok(Ok(processed)) => {
                stats.record_transformed();
                if out.send(processed).is_err() {
                    warn!("storage channel closed — dropping processed point");
                }
            }
            Ok(Err(e)) => {
                stats.record_malformed();
                warn!(error = %e, "dropping malformed price point");
            }
            Err(e) => {
                stats.record_malformed();
                error!(error = %e, "transform task panicked — item dropped");
            }
        }
    }

    if out.finish().is_err() {
        warn!("storage channel closed before the end-of-stream marker");
    }

    stats.transition(Stage::Transform, StageState::Terminated);
    info!("transform stage terminated");
}
