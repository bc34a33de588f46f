//! Addon registry.
//!
//! Catalog of the addons found under the addons root plus the built-in main
//! addon. Answers name lookups, status listings and capability probes, and
//! persists status changes back to each addon's manifest.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use genesis_dispatch::{DispatchNode, NodeKind};
use tracing::{debug, info, warn};

use crate::addon::{Addon, AddonRef};
use crate::discovery::{self, MANIFEST_FILE_NAME};
use crate::error::{AddonError, AddonResult};
use crate::loaded::LoadedSet;
use crate::manifest::{AddonManifest, AddonStatus};
use crate::module::{LifecycleHook, ModuleCatalog};

/// Registry of known addons.
pub struct AddonRegistry {
    root: PathBuf,
    catalog: ModuleCatalog,
    addons: RwLock<BTreeMap<String, Arc<Addon>>>,
    main_addon: RwLock<Option<Arc<Addon>>>,
}

impl AddonRegistry {
    /// Create an empty registry over the addons root `root`.
    ///
    /// Nothing is read until [`discover`](Self::discover) is called.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, catalog: ModuleCatalog) -> Self {
        Self {
            root: root.into(),
            catalog,
            addons: RwLock::new(BTreeMap::new()),
            main_addon: RwLock::new(None),
        }
    }

    /// The addons root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, Arc<Addon>>> {
        self.addons.read().unwrap_or_else(|e| {
            warn!("Addon registry lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, Arc<Addon>>> {
        self.addons.write().unwrap_or_else(|e| {
            warn!("Addon registry lock poisoned, recovering");
            e.into_inner()
        })
    }

    /// Scan the addons root.
    ///
    /// New addons are registered with their compiled-in module, if any.
    /// Known addons get their metadata refreshed; their status is left to
    /// the lifecycle controller. Returns the number of newly registered
    /// addons. A missing root is logged and yields zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the root exists but cannot be read.
    pub fn discover(&self) -> AddonResult<usize> {
        if !self.root.is_dir() {
            warn!(path = %self.root.display(), "Addons root does not exist, skipping discovery");
            return Ok(0);
        }

        let main_name = self.main_addon().map(|a| a.name().to_string());
        let mut added = 0usize;
        for (manifest, dir) in discovery::load_manifests_from_dir(&self.root)? {
            if main_name.as_deref() == Some(manifest.name.as_str()) {
                warn!(addon = %manifest.name, "Addon shadows the main addon, ignoring");
                continue;
            }
            if let Some(known) = self.get(&manifest.name) {
                if known.dir() == Some(dir.as_path()) {
                    known.refresh_metadata(&manifest);
                } else {
                    warn!(
                        addon = %manifest.name,
                        path = %dir.display(),
                        "Duplicate addon name, keeping the first one"
                    );
                }
                continue;
            }

            let module = self.catalog.instantiate(&manifest);
            if module.is_none() {
                debug!(addon = %manifest.name, "No compiled module for addon");
            }
            self.insert(Addon::new(manifest, dir, module));
            added = added.saturating_add(1);
        }

        info!(added, total = self.read().len(), "Discovered addons");
        Ok(added)
    }

    /// Re-scan the addons root after a change on disk.
    ///
    /// # Errors
    ///
    /// See [`discover`](Self::discover).
    pub fn rescan(&self) -> AddonResult<usize> {
        self.discover()
    }

    fn insert(&self, addon: Addon) -> Arc<Addon> {
        let addon = Arc::new(addon);
        self.write()
            .insert(addon.name().to_string(), Arc::clone(&addon));
        addon
    }

    /// Register an addon that was not found by discovery.
    ///
    /// # Errors
    ///
    /// Returns [`AddonError::InvalidState`] if the name is taken.
    pub fn register(&self, addon: Addon) -> AddonResult<Arc<Addon>> {
        if self.get(addon.name()).is_some() {
            return Err(AddonError::InvalidState {
                addon: addon.name().to_string(),
                message: "already registered".to_string(),
            });
        }
        Ok(self.insert(addon))
    }

    /// Install the built-in main addon.
    ///
    /// # Errors
    ///
    /// Returns [`AddonError::InvariantViolation`] if `addon` is not a
    /// built-in addon, and [`AddonError::InvalidState`] if its name clashes
    /// with a discovered addon.
    pub fn set_main_addon(&self, addon: Arc<Addon>) -> AddonResult<()> {
        if !addon.is_builtin() {
            return Err(AddonError::InvariantViolation(format!(
                "{} is not a built-in addon",
                addon.name()
            )));
        }
        if self.read().contains_key(addon.name()) {
            return Err(AddonError::InvalidState {
                addon: addon.name().to_string(),
                message: "name is used by a discovered addon".to_string(),
            });
        }
        info!(addon = %addon.name(), "Main addon set");
        *self.main_addon.write().unwrap_or_else(|e| {
            warn!("Main addon lock poisoned, recovering");
            e.into_inner()
        }) = Some(addon);
        Ok(())
    }

    /// The built-in main addon, if one was installed.
    #[must_use]
    pub fn main_addon(&self) -> Option<Arc<Addon>> {
        self.main_addon
            .read()
            .unwrap_or_else(|e| {
                warn!("Main addon lock poisoned, recovering");
                e.into_inner()
            })
            .clone()
    }

    /// Look up an addon by name, including the main addon.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Addon>> {
        if let Some(addon) = self.read().get(name) {
            return Some(Arc::clone(addon));
        }
        self.main_addon().filter(|main| main.name() == name)
    }

    /// Resolve a reference to the registry's own handle.
    ///
    /// # Errors
    ///
    /// Returns [`AddonError::NotFound`] for an unknown name and
    /// [`AddonError::InvariantViolation`] for a handle the registry does not
    /// own (stale after a re-registration, or never registered).
    pub fn resolve(&self, reference: &AddonRef) -> AddonResult<Arc<Addon>> {
        match reference {
            AddonRef::Name(name) => self
                .get(name)
                .ok_or_else(|| AddonError::NotFound(name.clone())),
            AddonRef::Addon(handle) => match self.get(handle.name()) {
                Some(owned) if Arc::ptr_eq(&owned, handle) => Ok(owned),
                _ => Err(AddonError::InvariantViolation(format!(
                    "addon handle {} is not owned by this registry",
                    handle.name()
                ))),
            },
        }
    }

    /// The discovered addon living in `dir`.
    #[must_use]
    pub fn find_by_dir(&self, dir: &Path) -> Option<Arc<Addon>> {
        self.read()
            .values()
            .find(|addon| addon.dir().is_some_and(|d| d.components().eq(dir.components())))
            .cloned()
    }

    fn listing(&self, keep: impl Fn(&Addon) -> bool) -> Vec<Arc<Addon>> {
        let mut addons: Vec<Arc<Addon>> = self
            .read()
            .values()
            .filter(|addon| keep(addon))
            .cloned()
            .collect();
        addons.sort_by_cached_key(|addon| addon.sort_key());
        addons
    }

    /// Every discovered addon, sorted by author then name.
    #[must_use]
    pub fn all(&self) -> Vec<Arc<Addon>> {
        self.listing(|_| true)
    }

    /// Discovered addons with enabled status, whether loaded or not.
    #[must_use]
    pub fn enabled(&self) -> Vec<Arc<Addon>> {
        self.listing(Addon::is_enabled)
    }

    /// Discovered addons with disabled status.
    #[must_use]
    pub fn disabled(&self) -> Vec<Arc<Addon>> {
        self.listing(|addon| !addon.is_enabled())
    }

    /// Discovered addons currently in `loaded`.
    #[must_use]
    pub fn loaded(&self, loaded: &LoadedSet) -> Vec<Arc<Addon>> {
        self.listing(|addon| loaded.contains(addon.name()))
    }

    /// Whether the addon provides a command node.
    #[must_use]
    pub fn has_command_node(&self, addon: &Addon) -> bool {
        addon.capabilities().command_node
    }

    /// Whether the addon provides an event node.
    #[must_use]
    pub fn has_event_node(&self, addon: &Addon) -> bool {
        addon.capabilities().event_node
    }

    /// Whether the addon implements `hook`.
    #[must_use]
    pub fn has_hook(&self, addon: &Addon, hook: LifecycleHook) -> bool {
        addon.has_hook(hook)
    }

    /// The addon's command node, if it provides one.
    #[must_use]
    pub fn command_node(&self, addon: &Addon) -> Option<Arc<DispatchNode>> {
        addon.node(NodeKind::Command).cloned()
    }

    /// The addon's event node, if it provides one.
    #[must_use]
    pub fn event_node(&self, addon: &Addon) -> Option<Arc<DispatchNode>> {
        addon.node(NodeKind::Event).cloned()
    }

    /// The addon's node of `kind`.
    #[must_use]
    pub fn node(&self, addon: &Addon, kind: NodeKind) -> Option<Arc<DispatchNode>> {
        match kind {
            NodeKind::Command => self.command_node(addon),
            NodeKind::Event => self.event_node(addon),
        }
    }

    /// Change and persist an addon's status.
    ///
    /// The manifest on disk is written first; the in-memory status only
    /// changes once that succeeded. The built-in addon is memory-only.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be read or written.
    pub(crate) fn set_status(&self, addon: &Addon, status: AddonStatus) -> AddonResult<()> {
        if let Some(dir) = addon.dir() {
            let mut manifest = match discovery::load_manifest(&dir.join(MANIFEST_FILE_NAME)) {
                Ok(on_disk) => on_disk,
                Err(e) => {
                    debug!(addon = %addon.name(), error = %e, "Rewriting manifest from memory");
                    addon.manifest()
                },
            };
            manifest.status = status;
            discovery::save_manifest(dir, &manifest)?;
        }
        addon.set_status(status);
        debug!(addon = %addon.name(), %status, "Addon status changed");
        Ok(())
    }

    /// Read the addon's manifest from disk without applying it.
    ///
    /// Returns `None` for the built-in addon.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be read or parsed.
    pub fn read_manifest(&self, addon: &Addon) -> AddonResult<Option<AddonManifest>> {
        addon
            .dir()
            .map(|dir| discovery::load_manifest(&dir.join(MANIFEST_FILE_NAME)))
            .transpose()
    }
}

impl std::fmt::Debug for AddonRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddonRegistry")
            .field("root", &self.root)
            .field("addons", &self.read().keys().collect::<Vec<_>>())
            .field("main_addon", &self.main_addon().map(|a| a.name().to_string()))
            .finish_non_exhaustive()
    }
}
