//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};

use http_log_shipper::config::{CaptureConfig, CollectorConfig};
use http_log_shipper::http::{handlers, instrument};
use http_log_shipper::transport::ConnectionState;
use http_log_shipper::{AsyncDispatcher, Shutdown, TransportClient};

/// Reconnect interval used by tests instead of the 5 s default.
pub const FAST_RECONNECT_MS: u64 = 50;

/// A local TCP server that collects newline-delimited records.
pub struct MockCollector {
    pub addr: SocketAddr,
    lines: mpsc::UnboundedReceiver<String>,
    server: JoinHandle<()>,
}

impl MockCollector {
    pub async fn start() -> Self {
        Self::start_on("127.0.0.1:0".parse().unwrap()).await
    }

    pub async fn start_on(addr: SocketAddr) -> Self {
        let listener = TcpListener::bind(addr).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, lines) = mpsc::unbounded_channel();

        let server = tokio::spawn(async move {
            // Readers live in the set so stopping the server closes them.
            let mut readers = JoinSet::new();
            while let Ok((socket, _)) = listener.accept().await {
                let tx = tx.clone();
                readers.spawn(async move {
                    let mut reader = BufReader::new(socket).lines();
                    while let Ok(Some(line)) = reader.next_line().await {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                });
            }
        });

        Self { addr, lines, server }
    }

    /// Close the listener and every accepted connection.
    pub async fn stop(self) {
        self.server.abort();
        let _ = self.server.await;
    }

    /// Next record parsed as JSON, or `None` if nothing arrives in time.
    pub async fn next_record(&mut self, within: Duration) -> Option<Value> {
        let line = tokio::time::timeout(within, self.lines.recv())
            .await
            .ok()
            .flatten()?;
        Some(serde_json::from_str(&line).expect("collector received invalid JSON"))
    }

    pub async fn expect_record(&mut self) -> Value {
        self.next_record(Duration::from_secs(5))
            .await
            .expect("no record reached the collector")
    }
}

/// An address that refuses connections at the time of the call.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn collector_config(addr: SocketAddr) -> CollectorConfig {
    CollectorConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        reconnect_interval_ms: FAST_RECONNECT_MS,
        connect_timeout_secs: 1,
        queue_capacity: 1_000,
        ..Default::default()
    }
}

pub async fn wait_for_state(client: &TransportClient, wanted: ConnectionState, within: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if client.state() == wanted {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    client.state() == wanted
}

/// Transport and dispatcher connected to `collector`.
pub async fn connected_pipeline(collector: &MockCollector, shutdown: &Shutdown) -> (Arc<TransportClient>, AsyncDispatcher) {
    let transport = TransportClient::new(&collector_config(collector.addr));
    transport.connect().await.unwrap();
    let dispatcher = AsyncDispatcher::start(transport.clone(), 1_000, shutdown.subscribe());
    (transport, dispatcher)
}

async fn explode() -> &'static str {
    panic!("route exploded")
}

/// Serve the demo routes plus `/foo`, a panicking `/explode` and the default bypass paths, with
/// records going to `dispatcher`. Returns the HTTP address.
pub async fn start_app(dispatcher: AsyncDispatcher, shutdown: &Shutdown) -> SocketAddr {
    let app = instrument(
        Router::new()
            .route("/health", get(handlers::health))
            .route("/test", post(handlers::echo))
            .route("/foo", get(|| async { "foo" }))
            .route("/explode", get(explode))
            .route("/actuator/health", get(|| async { "UP" }))
            .route("/favicon.ico", get(|| async { "" })),
        &CaptureConfig::default(),
        Arc::new(dispatcher),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let mut stop = shutdown.subscribe();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = stop.recv().await;
        })
        .await
        .unwrap();
    });
    addr
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
