//! Registered addons and the ways callers refer to them.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use genesis_dispatch::{DispatchNode, NodeKind};
use tracing::warn;

use crate::manifest::{AddonManifest, AddonStatus, Requirement};
use crate::module::{AddonModule, Capabilities, LifecycleHook};

/// An addon known to the registry.
///
/// The name is fixed for the addon's lifetime. Manifest fields may be
/// refreshed from disk; the status changes only through the lifecycle
/// controller.
pub struct Addon {
    name: String,
    manifest: RwLock<AddonManifest>,
    dir: Option<PathBuf>,
    module: Option<Arc<dyn AddonModule>>,
    capabilities: Capabilities,
    command_node: Option<Arc<DispatchNode>>,
    event_node: Option<Arc<DispatchNode>>,
    builtin: bool,
}

impl Addon {
    /// An addon discovered in `dir`.
    ///
    /// Capabilities and node handles are taken from `module` here and never
    /// again.
    #[must_use]
    pub fn new(
        manifest: AddonManifest,
        dir: PathBuf,
        module: Option<Arc<dyn AddonModule>>,
    ) -> Self {
        Self::build(manifest, Some(dir), module, false)
    }

    /// The built-in main addon. It has no directory and its status is never
    /// persisted.
    #[must_use]
    pub fn builtin(manifest: AddonManifest, module: Arc<dyn AddonModule>) -> Self {
        Self::build(manifest, None, Some(module), true)
    }

    fn build(
        manifest: AddonManifest,
        dir: Option<PathBuf>,
        module: Option<Arc<dyn AddonModule>>,
        builtin: bool,
    ) -> Self {
        let (command_node, event_node) = module
            .as_deref()
            .map_or((None, None), |m| (m.command_node(), m.event_node()));
        let capabilities = Capabilities {
            command_node: command_node.is_some(),
            event_node: event_node.is_some(),
            hooks: module
                .as_deref()
                .map(|m| m.hooks().iter().copied().collect())
                .unwrap_or_default(),
        };
        Self {
            name: manifest.name.clone(),
            manifest: RwLock::new(manifest),
            dir,
            module,
            capabilities,
            command_node,
            event_node,
            builtin,
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, AddonManifest> {
        self.manifest.read().unwrap_or_else(|e| {
            warn!(addon = %self.name, "Addon manifest lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, AddonManifest> {
        self.manifest.write().unwrap_or_else(|e| {
            warn!(addon = %self.name, "Addon manifest lock poisoned, recovering");
            e.into_inner()
        })
    }

    /// Unique addon name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of the current manifest.
    #[must_use]
    pub fn manifest(&self) -> AddonManifest {
        self.read().clone()
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> AddonStatus {
        self.read().status
    }

    /// Whether the status is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.status().is_enabled()
    }

    /// Version string.
    #[must_use]
    pub fn version(&self) -> String {
        self.read().version.clone()
    }

    /// Author string.
    #[must_use]
    pub fn author(&self) -> String {
        self.read().author.clone()
    }

    /// Description, if any.
    #[must_use]
    pub fn description(&self) -> Option<String> {
        self.read().description.clone()
    }

    /// Declared dependencies.
    #[must_use]
    pub fn requirements(&self) -> Vec<Requirement> {
        self.read().requirements.clone()
    }

    /// Directory the addon was discovered in. `None` for the built-in addon.
    #[must_use]
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// The code module, if it is compiled in.
    #[must_use]
    pub fn module(&self) -> Option<&Arc<dyn AddonModule>> {
        self.module.as_ref()
    }

    /// Capabilities probed at registration.
    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// The node of `kind` captured at registration. Load and unload always
    /// act on this instance.
    #[must_use]
    pub fn node(&self, kind: NodeKind) -> Option<&Arc<DispatchNode>> {
        match kind {
            NodeKind::Command => self.command_node.as_ref(),
            NodeKind::Event => self.event_node.as_ref(),
        }
    }

    /// Whether `hook` is implemented.
    #[must_use]
    pub fn has_hook(&self, hook: LifecycleHook) -> bool {
        self.capabilities.has_hook(hook)
    }

    /// Whether this is the built-in main addon.
    #[must_use]
    pub fn is_builtin(&self) -> bool {
        self.builtin
    }

    pub(crate) fn set_status(&self, status: AddonStatus) {
        self.write().status = status;
    }

    /// Take over everything from a freshly read manifest except the status.
    pub(crate) fn refresh_metadata(&self, fresh: &AddonManifest) {
        let mut manifest = self.write();
        manifest.version.clone_from(&fresh.version);
        manifest.author.clone_from(&fresh.author);
        manifest.description.clone_from(&fresh.description);
        manifest.requirements.clone_from(&fresh.requirements);
    }

    /// Listing order: author first, then name.
    pub(crate) fn sort_key(&self) -> (String, String) {
        (self.author(), self.name.clone())
    }
}

impl fmt::Debug for Addon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Addon")
            .field("name", &self.name)
            .field("status", &self.status())
            .field("dir", &self.dir)
            .field("capabilities", &self.capabilities)
            .field("builtin", &self.builtin)
            .finish_non_exhaustive()
    }
}

/// How a caller names an addon: by name, or by a handle it already holds.
///
/// Handles are checked against the registry; one the registry does not own
/// is an invariant violation, not a lookup miss.
#[derive(Debug, Clone)]
pub enum AddonRef {
    /// Look up by name.
    Name(String),
    /// A handle previously obtained from the registry.
    Addon(Arc<Addon>),
}

impl AddonRef {
    /// The name this reference points at.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Addon(addon) => addon.name(),
        }
    }
}

impl From<&str> for AddonRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for AddonRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<&String> for AddonRef {
    fn from(name: &String) -> Self {
        Self::Name(name.clone())
    }
}

impl From<Arc<Addon>> for AddonRef {
    fn from(addon: Arc<Addon>) -> Self {
        Self::Addon(addon)
    }
}

impl From<&Arc<Addon>> for AddonRef {
    fn from(addon: &Arc<Addon>) -> Self {
        Self::Addon(Arc::clone(addon))
    }
}

impl fmt::Display for AddonRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
