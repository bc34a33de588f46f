//! Genesis Test - shared test utilities for the Genesis runtime.
//!
//! Mock addon modules, a recording messenger and on-disk fixtures for use
//! as a dev-dependency.
//!
//! ```rust,ignore
//! use genesis_test::{MockModule, TestRuntime};
//! use genesis_addons::{AddonStatus, LifecycleHook};
//!
//! #[tokio::test]
//! async fn test_load() {
//!     let weather = MockModule::new("weather").with_command("forecast");
//!     let rt = TestRuntime::new().with_addon("weather", AddonStatus::Enabled, &weather);
//!     let controller = rt.start();
//!     controller.load("weather").await.unwrap();
//!     assert_eq!(weather.calls(), vec![LifecycleHook::Load]);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
