//! The log record shipped to the collector.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of a request log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// The downstream handler returned normally.
    Info,
    /// The downstream handler failed.
    Error,
}

/// One structured record per intercepted request.
///
/// Built once by [`build_log_record`](crate::capture::builder::build_log_record)
/// and never mutated afterwards. Absent optional fields serialize as `null`
/// so the collector always sees the same set of keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub method: String,
    pub path: String,
    pub status_code: Option<u16>,
    pub response_time_ms: u64,
    pub user_id: Option<String>,
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub request_body: Option<String>,
    pub response_body: Option<String>,
    pub error_message: Option<String>,
    pub trace_id: String,
}
