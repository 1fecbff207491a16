//! scalebridged — the scalebridge daemon.
//!
//! Assembles the subsystems into one process:
//! - Status store (in-memory, process lifetime)
//! - External-scaler gRPC service + health service
//! - HTTP event submission API
//!
//! # Usage
//!
//! ```text
//! scalebridged --config /etc/scalebridge/config.yaml -v 1
//! ```

pub mod bridge;
pub mod config;
pub mod telemetry;

pub use bridge::Bridge;
pub use config::{BridgeConfig, ConfigError};
