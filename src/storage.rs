// =============================================================================
// Storage Stage — terminal consumer delivering processed points to the store
// =============================================================================
//
// Drains the transform channel with a blocking receive until the
// end-of-stream marker arrives. Delivery is fire-and-forget: the store's
// acknowledgement is neither required nor checked, and a delivery failure is
// logged without stopping the loop. No filtering, batching, or retry.
// =============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::channel::{StreamItem, StreamReceiver};
use crate::stats::PipelineStats;
use crate::types::{ProcessedPricePoint, Stage, StageState};

/// The persistent-store collaborator.
#[async_trait]
pub trait Store: Send + Sync {
    /// Deliver one processed point to the store.
    async fn deliver(&self, item: &ProcessedPricePoint) -> Result<()>;
}

/// Log-emitting store: serialises each point to JSON and writes it to the
/// log at info level. Stands in for a real persistent backend.
pub struct LogStore;

#[async_trait]
impl Store for LogStore {
    async fn deliver(&self, item: &ProcessedPricePoint) -> Result<()> {
        let payload = serde_json::to_string(item)
            .context("failed to serialise processed price point")?;
        info!(item = %payload, "stored processed price point");
        Ok(())
    }
}

/// Run the storage stage to completion.
///
/// Stops on the end-of-stream marker, or on channel closure if the upstream
/// stage died before sending one.
pub async fn run(
    mut input: StreamReceiver<ProcessedPricePoint>,
    store: Arc<dyn Store>,
    stats: Arc<PipelineStats>,
) {
    stats.transition(Stage::Storage, StageState::Running);
    info!("storage stage started");

    loop {
        match input.recv().await {
            Some(StreamItem::Item(item)) => match store.deliver(&item).await {
                Ok(()) => {
                    stats.record_delivered();
                    debug!(symbol = %item.symbol, secondary_price = item.secondary_price, "point delivered");
                }
                Err(e) => {
                    warn!(symbol = %item.symbol, error = %e, "store delivery failed — item dropped");
                }
            },
            Some(StreamItem::EndOfStream) => {
                info!("no more data to store");
                break;
            }
            None => {
                warn!("transform channel closed without an end-of-stream marker");
                break;
            }
        }
    }

    stats.transition(Stage::Storage, StageState::Terminated);
    info!("storage stage terminated");
}
