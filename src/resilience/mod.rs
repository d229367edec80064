//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Collector connection lost or never established:
//!     → reconnect.rs (claim the single reconnect slot)
//!     → wait fixed interval, attempt connect, repeat until connected
//! ```
//!
//! # Design Decisions
//! - Retrying never touches the request path
//! - Records produced while disconnected are dropped, not buffered

pub mod reconnect;

pub use reconnect::{ReconnectGuard, ReconnectPermit, ReconnectPolicy};
