use crate::decoder::MessageDecoder;
use crate::sink::{StorageBackend, StorageSink};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    Written,
    Dropped,
    WriteFailed,
}

#[derive(Debug, Default)]
pub struct BridgeStats {
    pub received: AtomicU64,
    pub written: AtomicU64,
    pub dropped: AtomicU64,
    pub write_failures: AtomicU64,
}

impl BridgeStats {
    fn record(&self, outcome: MessageOutcome) {
        let counter = match outcome {
            MessageOutcome::Written => &self.written,
            MessageOutcome::Dropped => &self.dropped,
            MessageOutcome::WriteFailed => &self.write_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn log_summary(&self) {
        tracing::info!(
            received = self.received.load(Ordering::Relaxed),
            written = self.written.load(Ordering::Relaxed),
            dropped = self.dropped.load(Ordering::Relaxed),
            write_failures = self.write_failures.load(Ordering::Relaxed),
            "bridge message totals"
        );
    }
}

/// Runs decode → write for each inbound message. Every per-message failure
/// is logged and contained here so the subscription loop never sees it.
pub struct Bridge<B> {
    decoder: MessageDecoder,
    sink: StorageSink<B>,
    stats: BridgeStats,
}

impl<B: StorageBackend> Bridge<B> {
    /// `sink` must already have a database selected.
    pub fn new(decoder: MessageDecoder, sink: StorageSink<B>) -> Self {
        Self {
            decoder,
            sink,
            stats: BridgeStats::default(),
        }
    }

    pub fn stats(&self) -> &BridgeStats {
        &self.stats
    }

    pub async fn handle_message(&self, topic: &str, payload: &[u8]) -> MessageOutcome {
        self.stats.received.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(topic = %topic, bytes = payload.len(), "message received");

        let outcome = match self.decoder.decode(topic, payload) {
            Ok(record) => match self.sink.write(&record).await {
                Ok(()) => {
                    tracing::trace!(topic = %topic, fields = record.fields.len(), "point written");
                    MessageOutcome::Written
                }
                Err(err) => {
                    tracing::warn!(error = %err, topic = %topic, "failed to write point; dropping message");
                    MessageOutcome::WriteFailed
                }
            },
            Err(err) => {
                tracing::warn!(error = %err, topic = %topic, "failed to decode payload; dropping message");
                MessageOutcome::Dropped
            }
        };
        self.stats.record(outcome);
        outcome
    }
}
