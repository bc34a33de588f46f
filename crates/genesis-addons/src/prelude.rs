//! Prelude module - commonly used types for convenient import.
//!
//! Use `use genesis_addons::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use genesis_addons::prelude::*;
//!
//! struct Quiet;
//!
//! impl AddonModule for Quiet {}
//!
//! let catalog = ModuleCatalog::new().with("quiet", |_| Arc::new(Quiet) as Arc<dyn AddonModule>);
//! let registry = Arc::new(AddonRegistry::new("addons", catalog));
//! let controller = LifecycleController::new(registry, Arc::new(LoadedSet::new()), Roots::new());
//! assert!(controller.loaded().is_empty());
//! ```

// Addons
pub use crate::{Addon, AddonManifest, AddonRef, AddonStatus};

// Code modules
pub use crate::{AddonModule, HookError, LifecycleHook, ModuleCatalog};

// Runtime
pub use crate::{AddonRegistry, BatchReport, LifecycleController, LoadedSet, Roots};

// Errors
pub use crate::{AddonError, AddonResult};
