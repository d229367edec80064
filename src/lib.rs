//! HTTP request log shipper.
//!
//! Captures every inbound request, builds a redacted [`LogRecord`] and
//! ships it as one JSON line to a TCP log collector without blocking the
//! request path.
//!
//! # Architecture Overview
//!
//! ```text
//!  request ──▶ capture::RequestLogLayer ──▶ handler
//!                  │
//!                  ▼
//!          capture::build_log_record (sanitize bodies)
//!                  │
//!                  ▼  RecordSink::submit (try_send)
//!          transport::AsyncDispatcher ──▶ single sender task
//!                                              │
//!                                              ▼
//!          transport::TransportClient ──▶ collector (host:port)
//!              ▲          │
//!              │          ▼ on failure
//!              └── resilience::reconnect (fixed interval)
//! ```

// Core pipeline
pub mod capture;
pub mod transport;

// Application surface
pub mod config;
pub mod http;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use capture::{LogRecord, RecordSink, RequestLogLayer};
pub use config::ShipperConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use transport::{AsyncDispatcher, TransportClient};
