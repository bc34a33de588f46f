//! On-disk fixtures and a ready-made runtime.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use genesis_addons::{
    AddonManifest, AddonRegistry, AddonStatus, LifecycleController, LoadedSet, MANIFEST_FILE_NAME,
    ModuleCatalog, Roots, save_manifest,
};
use genesis_dispatch::Update;
use tempfile::TempDir;

use crate::mocks::MockModule;

/// Write `<root>/<name>/addon.toml` and return the addon directory.
///
/// # Panics
///
/// Panics if the fixture cannot be written.
pub fn write_manifest(root: &Path, name: &str, status: AddonStatus) -> PathBuf {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap_or_else(|e| panic!("create {}: {e}", dir.display()));
    let manifest = AddonManifest::new(name, "1.0.0")
        .with_author("tests")
        .with_description(format!("{name} test addon"))
        .with_status(status);
    save_manifest(&dir, &manifest).unwrap_or_else(|e| panic!("write manifest: {e}"));
    dir
}

/// Status recorded in `<root>/<name>/addon.toml`.
///
/// # Panics
///
/// Panics if the manifest cannot be read.
#[must_use]
pub fn status_on_disk(root: &Path, name: &str) -> AddonStatus {
    genesis_addons::load_manifest(&root.join(name).join(MANIFEST_FILE_NAME))
        .unwrap_or_else(|e| panic!("read manifest: {e}"))
        .status
}

/// An outgoing update from the owner in chat 1.
#[must_use]
pub fn test_update(text: &str) -> Update {
    Update::outgoing(1, 1, text)
}

/// Install a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A temporary addons root with mock modules, built step by step.
pub struct TestRuntime {
    /// The addons root.
    pub dir: TempDir,
    catalog: ModuleCatalog,
}

impl TestRuntime {
    /// An empty addons root.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap_or_else(|e| panic!("tempdir: {e}")),
            catalog: ModuleCatalog::new(),
        }
    }

    /// Add an addon on disk backed by `module`.
    #[must_use]
    pub fn with_addon(mut self, name: &str, status: AddonStatus, module: &MockModule) -> Self {
        write_manifest(self.dir.path(), name, status);
        let module = module.clone();
        self.catalog.register(name, move |_| module.as_module());
        self
    }

    /// The addons root path.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Discover the addons and build a controller over fresh roots.
    ///
    /// # Panics
    ///
    /// Panics if discovery fails.
    #[must_use]
    pub fn start(&self) -> LifecycleController {
        let registry = Arc::new(AddonRegistry::new(self.dir.path(), self.catalog.clone()));
        registry
            .discover()
            .unwrap_or_else(|e| panic!("discover: {e}"));
        LifecycleController::new(registry, Arc::new(LoadedSet::new()), Roots::new())
    }
}

impl Default for TestRuntime {
    fn default() -> Self {
        Self::new()
    }
}
