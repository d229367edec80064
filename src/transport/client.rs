//! TCP client for the remote log collector.
//!
//! # Responsibilities
//! - Own the single outbound connection and its state
//! - Write one newline-terminated record per `send`, flushed immediately
//! - Detect broken connections (write errors, collector closing the stream)
//! - Run the fixed-interval reconnect loop
//!
//! # Design Decisions
//! - Records sent while not connected are dropped, not buffered
//! - Each connection carries a generation number so a stale stream watcher
//!   can never tear down a newer connection
//! - Errors are logged here and never reach request handling

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::config::CollectorConfig;
use crate::observability::metrics::{self, DropReason};
use crate::resilience::{ReconnectGuard, ReconnectPermit, ReconnectPolicy};
use crate::transport::state::{AtomicConnectionState, ConnectionState};

/// Error type for collector transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to collector at {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("timed out connecting to collector at {addr} after {timeout:?}")]
    ConnectTimeout { addr: String, timeout: Duration },

    #[error("failed to write to collector: {0}")]
    Write(#[from] io::Error),

    #[error("collector transport is disabled")]
    Disabled,

    #[error("collector transport is closed")]
    Closed,
}

/// What happened to a record handed to [`TransportClient::send`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Written and flushed.
    Sent,
    /// Not connected; the record was discarded.
    Dropped,
}

/// A live connection to the collector.
struct Connection {
    writer: BufWriter<OwnedWriteHalf>,
    generation: u64,
}

impl Connection {
    async fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await
    }
}

/// Client owning the connection to the collector.
///
/// Construct once and share as `Arc<TransportClient>`.
pub struct TransportClient {
    addr: String,
    host: String,
    port: u16,
    enabled: bool,
    connect_timeout: Duration,
    policy: ReconnectPolicy,
    state: AtomicConnectionState,
    connection: Mutex<Option<Connection>>,
    generation: AtomicU64,
    reconnect: ReconnectGuard,
    closed: AtomicBool,
}

impl TransportClient {
    /// Create a client from configuration. Does not connect.
    pub fn new(config: &CollectorConfig) -> Arc<Self> {
        Arc::new(Self {
            addr: format!("{}:{}", config.host, config.port),
            host: config.host.clone(),
            port: config.port,
            enabled: config.enabled,
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            policy: ReconnectPolicy::fixed(Duration::from_millis(config.reconnect_interval_ms)),
            state: AtomicConnectionState::default(),
            connection: Mutex::new(None),
            generation: AtomicU64::new(0),
            reconnect: ReconnectGuard::new(),
            closed: AtomicBool::new(false),
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.state.load()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Collector address as `host:port`.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// True while a reconnect loop is running.
    pub fn is_reconnecting(&self) -> bool {
        self.reconnect.is_active()
    }

    /// Kick off the first connection attempt in the background.
    pub fn start(self: &Arc<Self>) {
        if !self.enabled {
            tracing::info!("Collector transport disabled");
            return;
        }
        let client = Arc::clone(self);
        tokio::spawn(async move {
            let _ = client.connect().await;
        });
    }

    /// Attempt to connect once, scheduling the reconnect loop on failure.
    pub async fn connect(self: &Arc<Self>) -> Result<(), TransportError> {
        if !self.enabled {
            return Err(TransportError::Disabled);
        }
        let result = self.try_connect().await;
        if result.is_err() {
            self.schedule_reconnect();
        }
        result
    }

    /// Write one record followed by a newline and flush it.
    ///
    /// When not connected the record is discarded and only noted at debug
    /// level. A write failure drops the connection, schedules the reconnect
    /// loop and loses this record.
    pub async fn send(self: &Arc<Self>, line: &str) -> Result<Delivery, TransportError> {
        if self.state() != ConnectionState::Connected {
            tracing::debug!(record = %line, "Collector offline, dropping record");
            metrics::record_dropped(DropReason::Disconnected);
            return Ok(Delivery::Dropped);
        }

        let mut slot = self.connection.lock().await;
        let Some(connection) = slot.as_mut() else {
            tracing::debug!(record = %line, "Collector offline, dropping record");
            metrics::record_dropped(DropReason::Disconnected);
            return Ok(Delivery::Dropped);
        };

        match connection.write_line(line).await {
            Ok(()) => {
                metrics::record_sent();
                Ok(Delivery::Sent)
            }
            Err(e) => {
                *slot = None;
                drop(slot);
                self.transition(ConnectionState::Disconnected);
                tracing::error!(addr = %self.addr, error = %e, "Failed to send record to collector");
                metrics::record_dropped(DropReason::WriteError);
                self.schedule_reconnect();
                Err(TransportError::Write(e))
            }
        }
    }

    /// Stop reconnecting and close the current connection.
    ///
    /// Records still queued upstream are not drained.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let connection = self.connection.lock().await.take();
        if let Some(mut connection) = connection {
            let _ = connection.writer.shutdown().await;
        }
        self.transition(ConnectionState::Disconnected);
        tracing::info!(addr = %self.addr, "Collector transport closed");
    }

    async fn try_connect(self: &Arc<Self>) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }

        self.transition(ConnectionState::Connecting);

        let attempt = TcpStream::connect((self.host.as_str(), self.port));
        let stream = match tokio::time::timeout(self.connect_timeout, attempt).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                self.transition(ConnectionState::Disconnected);
                tracing::error!(addr = %self.addr, error = %source, "Failed to connect to collector");
                return Err(TransportError::Connect {
                    addr: self.addr.clone(),
                    source,
                });
            }
            Err(_) => {
                self.transition(ConnectionState::Disconnected);
                tracing::error!(addr = %self.addr, timeout = ?self.connect_timeout, "Timed out connecting to collector");
                return Err(TransportError::ConnectTimeout {
                    addr: self.addr.clone(),
                    timeout: self.connect_timeout,
                });
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "Failed to set TCP_NODELAY on collector socket");
        }

        let (reader, writer) = stream.into_split();
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;

        *self.connection.lock().await = Some(Connection {
            writer: BufWriter::new(writer),
            generation,
        });
        self.transition(ConnectionState::Connected);
        tracing::info!(addr = %self.addr, generation, "Connected to collector");

        self.watch_stream(reader, generation);
        Ok(())
    }

    /// Start the reconnect loop unless one is already running.
    fn schedule_reconnect(self: &Arc<Self>) {
        if !self.enabled || self.closed.load(Ordering::Acquire) {
            return;
        }
        let Some(permit) = self.reconnect.try_begin() else {
            tracing::trace!("Reconnect loop already running");
            return;
        };
        let client = Arc::clone(self);
        tokio::spawn(client.reconnect_loop(permit));
    }

    async fn reconnect_loop(self: Arc<Self>, permit: ReconnectPermit) {
        let mut attempt: u32 = 0;
        loop {
            tokio::time::sleep(self.policy.interval()).await;
            attempt = attempt.saturating_add(1);

            if self.closed.load(Ordering::Acquire) {
                return;
            }

            tracing::info!(addr = %self.addr, attempt, "Attempting to reconnect to collector");
            metrics::record_reconnect_attempt();
            if self.try_connect().await.is_ok() {
                break;
            }
        }

        drop(permit);
        // A failure between the successful connect and the release above
        // found the slot taken; pick it up here.
        if self.state() == ConnectionState::Disconnected {
            self.schedule_reconnect();
        }
    }

    /// Watch the read side so a collector-side close is noticed without
    /// waiting for the next write.
    fn watch_stream(self: &Arc<Self>, mut reader: OwnedReadHalf, generation: u64) {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            let mut buf = [0u8; 512];
            let reason = loop {
                match reader.read(&mut buf).await {
                    Ok(0) => break "closed by collector".to_string(),
                    Ok(_) => continue,
                    Err(e) => break e.to_string(),
                }
            };
            client.connection_lost(generation, &reason).await;
        });
    }

    async fn connection_lost(self: &Arc<Self>, generation: u64, reason: &str) {
        let mut slot = self.connection.lock().await;
        if slot.as_ref().map(|c| c.generation) != Some(generation) {
            return;
        }
        *slot = None;
        drop(slot);

        self.transition(ConnectionState::Disconnected);
        tracing::error!(addr = %self.addr, generation, reason, "Collector connection lost");
        self.schedule_reconnect();
    }

    fn transition(&self, to: ConnectionState) {
        let from = self.state.swap(to);
        if from != to {
            tracing::trace!(from = %from, to = %to, "Collector connection state changed");
            metrics::record_connection_state(to);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    fn config(port: u16) -> CollectorConfig {
        CollectorConfig {
            host: "127.0.0.1".into(),
            port,
            reconnect_interval_ms: 50,
            connect_timeout_secs: 1,
            ..Default::default()
        }
    }

    /// A port with nothing listening on it.
    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn new_client_is_disconnected() {
        let client = TransportClient::new(&config(1));
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(client.addr(), "127.0.0.1:1");
    }

    #[tokio::test]
    async fn send_while_disconnected_drops() {
        let client = TransportClient::new(&config(1));
        assert_eq!(client.send("{}").await.unwrap(), Delivery::Dropped);
    }

    #[tokio::test]
    async fn disabled_client_never_connects() {
        let mut cfg = config(1);
        cfg.enabled = false;
        let client = TransportClient::new(&cfg);
        assert!(matches!(client.connect().await, Err(TransportError::Disabled)));
        assert!(!client.is_reconnecting());
    }

    #[tokio::test]
    async fn failed_connect_schedules_single_reconnect_loop() {
        let client = TransportClient::new(&config(closed_port().await));

        assert!(client.connect().await.is_err());
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(client.is_reconnecting());

        // A second failure must not start another loop.
        assert!(client.connect().await.is_err());
        assert!(client.is_reconnecting());

        client.close().await;
    }

    #[tokio::test]
    async fn writes_newline_terminated_records() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let client = TransportClient::new(&config(port));

        client.connect().await.unwrap();
        assert_eq!(client.state(), ConnectionState::Connected);

        let (socket, _) = listener.accept().await.unwrap();
        let mut lines = BufReader::new(socket).lines();

        assert_eq!(client.send(r#"{"n":1}"#).await.unwrap(), Delivery::Sent);
        assert_eq!(client.send(r#"{"n":2}"#).await.unwrap(), Delivery::Sent);

        assert_eq!(lines.next_line().await.unwrap().unwrap(), r#"{"n":1}"#);
        assert_eq!(lines.next_line().await.unwrap().unwrap(), r#"{"n":2}"#);
    }

    #[tokio::test]
    async fn collector_close_triggers_reconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let client = TransportClient::new(&config(port));

        client.connect().await.unwrap();
        let (socket, _) = listener.accept().await.unwrap();
        drop(socket);

        // Watcher notices EOF, reconnect loop dials again.
        let (socket, _) = tokio::time::timeout(Duration::from_secs(5), listener.accept())
            .await
            .expect("client reconnected")
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while client.state() != ConnectionState::Connected {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("client reports connected");

        let mut lines = BufReader::new(socket).lines();
        assert_eq!(client.send("after").await.unwrap(), Delivery::Sent);
        assert_eq!(lines.next_line().await.unwrap().unwrap(), "after");
    }

    #[tokio::test]
    async fn close_stops_reconnecting() {
        let client = TransportClient::new(&config(closed_port().await));
        let _ = client.connect().await;
        client.close().await;

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!client.is_reconnecting());
        assert!(matches!(client.connect().await, Err(TransportError::Closed)));
    }
}
