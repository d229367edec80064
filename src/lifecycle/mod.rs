//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Ctrl-C → Shutdown::trigger → HTTP server stops accepting
//!                                → dispatcher sender task exits
//!     main → TransportClient::close (no further reconnects)
//! ```
//!
//! # Design Decisions
//! - One broadcast channel; every long-running task subscribes
//! - Queued records are not drained on exit

pub mod shutdown;

pub use shutdown::{wait_for_signal, Shutdown};
