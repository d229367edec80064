//! Shutdown coordination.

use tokio::sync::broadcast;

/// Broadcast coordinator for graceful shutdown.
///
/// The HTTP server and the dispatcher's sender task each hold a receiver
/// from [`subscribe`](Self::subscribe).
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Notify every subscriber. Calling it twice is harmless.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Subscribers that have not been dropped yet.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve on Ctrl-C, then trigger `shutdown`.
///
/// If the signal handler cannot be installed the error is logged and
/// shutdown is triggered immediately rather than running unstoppable.
pub async fn wait_for_signal(shutdown: Shutdown) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl-C"),
    }
    shutdown.trigger();
}
