//! Prelude module - commonly used types for convenient import.
//!
//! Use `use genesis_telemetry::prelude::*;` to import all essential types.

pub use crate::{
    FileRotation, LogConfig, LogFormat, LogTarget, TelemetryError, TelemetryResult,
    setup_logging,
};
