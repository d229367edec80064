//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Local diagnostics (never shipped to the collector):
//!     → logging.rs (tracing subscriber, pretty or JSON)
//!     → metrics.rs (pipeline counters, connection state gauge)
//! ```
//!
//! # Design Decisions
//! - Transport failures are visible here only; callers never see them
//! - Metrics are cheap (atomic increments), exporter is optional

pub mod logging;
pub mod metrics;
