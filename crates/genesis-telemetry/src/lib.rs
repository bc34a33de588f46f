//! Genesis Telemetry - logging for the Genesis addon runtime.
//!
//! Installs a global `tracing` subscriber from a [`LogConfig`]. Runtime
//! crates log with structured fields; lifecycle events always carry the
//! `addon` field so a failure can be traced to the addon that caused it.
//!
//! # Example
//!
//! ```rust,no_run
//! use genesis_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), genesis_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("genesis_addons=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!(addon = "weather", "Addon loaded");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
