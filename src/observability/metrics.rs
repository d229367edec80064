//! Metrics collection and exposition.
//!
//! # Metrics
//! - `log_records_enqueued_total` (counter): records accepted by the dispatcher
//! - `log_records_sent_total` (counter): records written and flushed to the collector
//! - `log_records_dropped_total` (counter): records lost, by reason
//! - `collector_reconnect_attempts_total` (counter): reconnect loop attempts
//! - `collector_connection_state` (gauge): 0=disconnected, 1=connecting, 2=connected

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::transport::ConnectionState;

/// Why a record never reached the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Disconnected,
    QueueFull,
    QueueClosed,
    Serialize,
    WriteError,
}

impl DropReason {
    fn as_str(self) -> &'static str {
        match self {
            DropReason::Disconnected => "disconnected",
            DropReason::QueueFull => "queue_full",
            DropReason::QueueClosed => "queue_closed",
            DropReason::Serialize => "serialize",
            DropReason::WriteError => "write_error",
        }
    }
}

/// Initialize the Prometheus exporter on the given address.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);

    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Prometheus metrics exporter started"),
        Err(e) => tracing::error!(error = %e, "Failed to install Prometheus exporter"),
    }
}

pub fn record_enqueued() {
    counter!("log_records_enqueued_total").increment(1);
}

pub fn record_sent() {
    counter!("log_records_sent_total").increment(1);
}

pub fn record_dropped(reason: DropReason) {
    counter!("log_records_dropped_total", "reason" => reason.as_str()).increment(1);
}

pub fn record_reconnect_attempt() {
    counter!("collector_reconnect_attempts_total").increment(1);
}

pub fn record_connection_state(state: ConnectionState) {
    gauge!("collector_connection_state").set(f64::from(state as u8));
}
