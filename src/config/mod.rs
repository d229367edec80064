//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ShipperConfig (validated, immutable)
//!     → CLI overrides applied in main
//!     → handed by value to the transport and capture layers
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CaptureConfig, CollectorConfig, ListenerConfig, LogFormat, ObservabilityConfig, ShipperConfig,
};
