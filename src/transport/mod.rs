//! Collector transport subsystem.
//!
//! # Data Flow
//! ```text
//! RecordSink::submit (request task)
//!     → dispatcher.rs (bounded queue, try_send, never waits)
//!     → single sender task (serialize to one JSON line)
//!     → client.rs (write + flush over TCP)
//!     → collector
//!
//! On failure:
//!     client.rs marks Disconnected (state.rs)
//!     → resilience::reconnect loop until Connected again
//! ```
//!
//! # Design Decisions
//! - One connection per process, owned by `TransportClient`
//! - Single consumer keeps per-process send order deterministic
//! - Lossy while disconnected and on shutdown; bounded memory

pub mod client;
pub mod dispatcher;
pub mod state;

pub use client::{Delivery, TransportClient, TransportError};
pub use dispatcher::AsyncDispatcher;
pub use state::ConnectionState;
