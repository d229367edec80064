//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files.
//! Every section has defaults, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

/// Root configuration for the log shipper.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ShipperConfig {
    /// Listener configuration for the demo HTTP server.
    pub listener: ListenerConfig,

    /// Remote collector connection settings.
    pub collector: CollectorConfig,

    /// Which requests are captured.
    pub capture: CaptureConfig,

    /// Local diagnostics settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Collector connection configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Collector host name or IP.
    pub host: String,

    /// Collector TCP port.
    pub port: u16,

    /// Gates both connection attempts and enqueue.
    pub enabled: bool,

    /// Fixed delay between reconnect attempts in milliseconds.
    pub reconnect_interval_ms: u64,

    /// Upper bound on a single connection attempt in seconds.
    pub connect_timeout_secs: u64,

    /// Records held between producers and the sender task.
    pub queue_capacity: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5000,
            enabled: true,
            reconnect_interval_ms: 5000,
            connect_timeout_secs: 5,
            queue_capacity: 10_000,
        }
    }
}

/// Request capture configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Path prefixes that are never logged (operational endpoints).
    pub bypass_prefixes: Vec<String>,

    /// Exact paths that are never logged.
    pub bypass_paths: Vec<String>,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            bypass_prefixes: vec!["/actuator".to_string()],
            bypass_paths: vec!["/favicon.ico".to_string()],
        }
    }
}

/// Output format for local diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human readable or JSON lines.
    pub log_format: LogFormat,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
