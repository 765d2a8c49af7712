// =============================================================================
// Stream Channel — unbounded FIFO queue with an explicit end-of-stream marker
// =============================================================================
//
// The inter-stage primitive for the pipeline. Every value on the wire is a
// `StreamItem`: either a payload or the distinguished `EndOfStream` marker.
// Carrying the marker in the element type means the terminal condition can
// never be confused with a legitimately absent value.
//
// Protocol invariants:
//   - Senders are cheap clones; any number of producers may share a channel.
//   - `finish()` consumes the sender handle, so a given handle can enqueue
//     the terminal marker at most once.
//   - The stage that owns the channel's write side sends exactly one
//     `EndOfStream` per run, after all of its producers have stopped, so the
//     marker is the last item enqueued.
//   - Capacity is unbounded: a stalled consumer grows memory, there is no
//     backpressure.
// =============================================================================

use thiserror::Error;
use tokio::sync::mpsc;

/// A single value on a stream channel: a payload or the terminal marker.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamItem<T> {
    Item(T),
    EndOfStream,
}

/// Returned when the receiving side of a channel has been dropped.
#[derive(Debug, Error)]
#[error("stream channel closed: receiving side dropped")]
pub struct ChannelClosed;

/// Write side of a stream channel. Clone freely to add producers.
pub struct StreamSender<T> {
    tx: mpsc::UnboundedSender<StreamItem<T>>,
}

impl<T> Clone for StreamSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> StreamSender<T> {
    /// Enqueue a payload item.
    pub fn send(&self, value: T) -> Result<(), ChannelClosed> {
        self.tx
            .send(StreamItem::Item(value))
            .map_err(|_| ChannelClosed)
    }

    /// Enqueue the end-of-stream marker and consume this handle.
    ///
    /// Call only after every other producer clone has finished sending, so
    /// that the marker is the last item on the channel.
    pub fn finish(self) -> Result<(), ChannelClosed> {
        self.tx
            .send(StreamItem::EndOfStream)
            .map_err(|_| ChannelClosed)
    }
}

/// Read side of a stream channel. Single consumer per channel.
pub struct StreamReceiver<T> {
    rx: mpsc::UnboundedReceiver<StreamItem<T>>,
}

impl<T> StreamReceiver<T> {
    /// Receive the next item, suspending until one is available.
    ///
    /// Returns `None` only if every sender was dropped without a marker;
    /// consumers treat that as an abnormal termination.
    pub async fn recv(&mut self) -> Option<StreamItem<T>> {
        self.rx.recv().await
    }

    /// Non-blocking probe: take the next item if one is queued.
    pub fn try_recv(&mut self) -> Option<StreamItem<T>> {
        self.rx.try_recv().ok()
    }
}

/// Create a new unbounded stream channel.
pub fn unbounded<T>() -> (StreamSender<T>, StreamReceiver<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (StreamSender { tx }, StreamReceiver { rx })
}
