//! HTTP surface of the demo binary.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, ConnectInfo, graceful shutdown)
//!     → TraceLayer (local request spans)
//!     → capture::RequestLogLayer (one record per request)
//!     → handlers.rs (/health, /test)
//! ```

pub mod handlers;
pub mod server;

pub use server::{instrument, HttpServer};
