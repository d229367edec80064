//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and formats.
//! All problems are reported at once rather than stopping at the first.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::ShipperConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("bypass prefix must start with '/': {0}")]
    RelativeBypass(String),

    #[error("unknown log level: {0}")]
    UnknownLogLevel(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ShipperConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    let collector = &config.collector;
    if collector.host.trim().is_empty() {
        errors.push(ValidationError::Empty { field: "collector.host" });
    }
    if collector.port == 0 {
        errors.push(ValidationError::Zero { field: "collector.port" });
    }
    if collector.reconnect_interval_ms == 0 {
        errors.push(ValidationError::Zero { field: "collector.reconnect_interval_ms" });
    }
    if collector.connect_timeout_secs == 0 {
        errors.push(ValidationError::Zero { field: "collector.connect_timeout_secs" });
    }
    if collector.queue_capacity == 0 {
        errors.push(ValidationError::Zero { field: "collector.queue_capacity" });
    }

    for path in config
        .capture
        .bypass_prefixes
        .iter()
        .chain(&config.capture.bypass_paths)
    {
        if !path.starts_with('/') {
            errors.push(ValidationError::RelativeBypass(path.clone()));
        }
    }

    let observability = &config.observability;
    if !LOG_LEVELS.contains(&observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::UnknownLogLevel(observability.log_level.clone()));
    }
    if observability.metrics_enabled
        && observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
