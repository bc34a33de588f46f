//! Prelude module - commonly used test helpers.
//!
//! Use `use genesis_test::prelude::*;` in test modules.

pub use crate::fixtures::{TestRuntime, init_test_logging, test_update, write_manifest};
pub use crate::mocks::{MockModule, RecordingMessenger, SentMessage};
