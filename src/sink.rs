//! Reporting sinks: where finished records go.

use crate::model::ProductRecord;
use std::io::Write;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// One-way destination for records. Delivery never fails from the caller's
/// point of view; sinks log and drop what they cannot pass on.
pub trait ReportSink: Send + Sync {
    fn deliver(&self, record: ProductRecord);
}

/// Forwards records into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProductRecord>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<ProductRecord>) -> Self {
        Self { tx }
    }

    /// Sink together with the receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProductRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl ReportSink for ChannelSink {
    fn deliver(&self, record: ProductRecord) {
        info!("Reporting {} (success: {})", record.url, record.success);
        if self.tx.send(record).is_err() {
            warn!("Report receiver dropped; record discarded");
        }
    }
}

/// Writes each record as one JSON object per line.
pub struct JsonLinesSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl JsonLinesSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ReportSink for JsonLinesSink<W> {
    fn deliver(&self, record: ProductRecord) {
        info!("Reporting {} (success: {})", record.url, record.success);
        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to serialize record for {}: {}", record.url, e);
                return;
            }
        };

        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(out, "{line}").and_then(|_| out.flush()) {
            warn!("Failed to write record: {}", e);
        }
    }
}
