//! Asynchronous record dispatch.
//!
//! Many request tasks produce records; one sender task drains a bounded
//! queue, serializes each record and writes it through the
//! [`TransportClient`]. Records therefore reach the wire in queue order.

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::capture::{LogRecord, RecordSink};
use crate::observability::metrics::{self, DropReason};
use crate::transport::client::TransportClient;

/// Non-blocking front door to the collector transport.
#[derive(Clone)]
pub struct AsyncDispatcher {
    tx: Option<mpsc::Sender<LogRecord>>,
}

impl AsyncDispatcher {
    /// Spawn the sender task and return a handle for producers.
    ///
    /// When the transport is disabled no task is started and
    /// [`enqueue`](Self::enqueue) does nothing.
    pub fn start(
        transport: Arc<TransportClient>,
        capacity: usize,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        if !transport.is_enabled() {
            return Self::disabled();
        }

        let (tx, rx) = mpsc::channel(capacity.max(1));
        tokio::spawn(run_sender(transport, rx, shutdown));
        Self { tx: Some(tx) }
    }

    /// A dispatcher that discards everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Queue a record for transmission. Never waits.
    pub fn enqueue(&self, record: LogRecord) {
        let Some(tx) = &self.tx else {
            return;
        };

        match tx.try_send(record) {
            Ok(()) => metrics::record_enqueued(),
            Err(TrySendError::Full(record)) => {
                tracing::warn!(trace_id = %record.trace_id, "Log record queue full, dropping record");
                metrics::record_dropped(DropReason::QueueFull);
            }
            Err(TrySendError::Closed(record)) => {
                tracing::debug!(trace_id = %record.trace_id, "Dispatcher stopped, dropping record");
                metrics::record_dropped(DropReason::QueueClosed);
            }
        }
    }
}

impl RecordSink for AsyncDispatcher {
    fn submit(&self, record: LogRecord) {
        self.enqueue(record);
    }
}

async fn run_sender(
    transport: Arc<TransportClient>,
    mut rx: mpsc::Receiver<LogRecord>,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut listening = true;
    loop {
        tokio::select! {
            record = rx.recv() => match record {
                Some(record) => deliver(&transport, record).await,
                None => break,
            },
            signal = shutdown.recv(), if listening => match signal {
                Err(RecvError::Closed) => listening = false,
                _ => {
                    tracing::debug!(pending = rx.len(), "Dispatcher shutting down, queued records dropped");
                    break;
                }
            },
        }
    }
}

async fn deliver(transport: &Arc<TransportClient>, record: LogRecord) {
    let line = match serde_json::to_string(&record) {
        Ok(line) => line,
        Err(e) => {
            tracing::error!(trace_id = %record.trace_id, error = %e, "Failed to serialize log record");
            metrics::record_dropped(DropReason::Serialize);
            return;
        }
    };

    tracing::trace!(trace_id = %record.trace_id, "Dispatching log record");
    // Failures are logged by the transport and the record is lost.
    let _ = transport.send(&line).await;
}
