//! Log record assembly.

use std::time::Duration;

use chrono::Utc;

use crate::capture::record::{LogLevel, LogRecord};
use crate::capture::sanitizer::sanitize;

/// Everything the interceptor observed about one request/response exchange.
#[derive(Debug, Clone, Default)]
pub struct CapturedExchange {
    pub method: String,
    /// URI path plus `?query` when a query string was present.
    pub path: String,
    pub status_code: Option<u16>,
    pub user_id: Option<String>,
    pub ip_address: String,
    pub user_agent: Option<String>,
    /// Raw captured request body, before redaction.
    pub request_body: Option<String>,
    /// Raw captured response body, before redaction.
    pub response_body: Option<String>,
}

/// Build the immutable record for one exchange.
///
/// The level is `ERROR` exactly when `error_message` is present. Both bodies
/// are redacted independently.
pub fn build_log_record(
    exchange: CapturedExchange,
    trace_id: &str,
    elapsed: Duration,
    error_message: Option<String>,
) -> LogRecord {
    let level = if error_message.is_some() {
        LogLevel::Error
    } else {
        LogLevel::Info
    };

    LogRecord {
        timestamp: Utc::now(),
        level,
        method: exchange.method,
        path: exchange.path,
        status_code: exchange.status_code,
        response_time_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        user_id: exchange.user_id,
        ip_address: exchange.ip_address,
        user_agent: exchange.user_agent,
        request_body: sanitize(exchange.request_body.as_deref()),
        response_body: sanitize(exchange.response_body.as_deref()),
        error_message,
        trace_id: trace_id.to_string(),
    }
}
