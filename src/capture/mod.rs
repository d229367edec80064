//! Request capture subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → request.rs (bypass check, trace ID, client IP, path)
//!     → body.rs (tee request body)
//!     → interceptor.rs (call handler exactly once, catch panics)
//!     → body.rs (tee response body on its way to the client)
//!     → pending.rs (on stream end, failure or drop: one record)
//!     → builder.rs + sanitizer.rs (assemble redacted LogRecord)
//!     → RecordSink (non-blocking hand-off to the transport)
//! ```
//!
//! # Design Decisions
//! - Logging never changes the handler's outcome; errors pass through as-is
//! - Bodies stream through; the logged copy is capped at 1 MiB per direction
//! - Redaction is top-level and case-sensitive

pub mod body;
pub mod builder;
pub mod interceptor;
pub mod pending;
pub mod record;
pub mod request;
pub mod sanitizer;

pub use builder::{build_log_record, CapturedExchange};
pub use interceptor::{RecordSink, RequestLogLayer, RequestLogService};
pub use record::{LogLevel, LogRecord};
pub use request::{AuthenticatedUser, BypassRules, TraceId, X_TRACE_ID};
pub use sanitizer::sanitize;
