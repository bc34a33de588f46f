//! Addon registry and lifecycle controller for the Genesis runtime.
//!
//! An addon is a directory under the addons root with an `addon.toml`
//! manifest, paired with a compiled-in [`AddonModule`] that may provide a
//! command node, an event node and lifecycle hooks.
//!
//! - [`AddonRegistry`]: discovers addons, answers listings and capability
//!   probes, persists status changes
//! - [`LifecycleController`]: enable/disable/load/unload with per-addon
//!   failure isolation, attaching nodes under the two [`Roots`]
//! - [`LoadedSet`]: which addons are currently attached
//!
//! With the `watch` feature, [`watcher::AddonWatcher`] reports manifest
//! changes so the runtime can [`reconcile`](LifecycleController::reconcile)
//! without a restart.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod addon;
pub mod discovery;
pub mod error;
pub mod lifecycle;
pub mod loaded;
pub mod manifest;
pub mod module;
pub mod prelude;
pub mod registry;
#[cfg(feature = "watch")]
pub mod watcher;

pub use addon::{Addon, AddonRef};
pub use discovery::{MANIFEST_FILE_NAME, load_manifest, load_manifests_from_dir, save_manifest};
pub use error::{AddonError, AddonResult, HookError};
pub use lifecycle::{BatchReport, LifecycleController, Roots};
pub use loaded::LoadedSet;
pub use manifest::{AddonManifest, AddonStatus, Requirement};
pub use module::{AddonModule, Capabilities, LifecycleHook, ModuleCatalog, ModuleFactory};
pub use registry::AddonRegistry;
