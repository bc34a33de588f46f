//! The code side of an addon.
//!
//! Addon code is compiled into the binary and looked up by name in a
//! [`ModuleCatalog`]. The manifest on disk decides whether that code runs.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use genesis_dispatch::DispatchNode;

use crate::error::HookError;
use crate::manifest::AddonManifest;

/// Optional callbacks invoked around lifecycle transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleHook {
    /// Before the addon's nodes are attached.
    Load,
    /// Before the addon's nodes are detached.
    Unload,
    /// After the addon's status is set to enabled.
    Enable,
    /// Before the addon is unloaded and its status set to disabled.
    Disable,
}

impl LifecycleHook {
    /// Every hook, in declaration order.
    pub const ALL: [Self; 4] = [Self::Load, Self::Unload, Self::Enable, Self::Disable];

    /// Conventional hook name (`on_load`, ...).
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Load => "on_load",
            Self::Unload => "on_unload",
            Self::Enable => "on_enable",
            Self::Disable => "on_disable",
        }
    }
}

impl fmt::Display for LifecycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What an addon module provides, probed once when the addon is registered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// The module provides a command node.
    pub command_node: bool,
    /// The module provides an event node.
    pub event_node: bool,
    /// Hooks the module implements.
    pub hooks: BTreeSet<LifecycleHook>,
}

impl Capabilities {
    /// Probe a module.
    #[must_use]
    pub fn probe(module: &dyn AddonModule) -> Self {
        Self {
            command_node: module.command_node().is_some(),
            event_node: module.event_node().is_some(),
            hooks: module.hooks().iter().copied().collect(),
        }
    }

    /// Whether `hook` is implemented.
    #[must_use]
    pub fn has_hook(&self, hook: LifecycleHook) -> bool {
        self.hooks.contains(&hook)
    }
}

/// An addon's code module.
///
/// Every method has a default, so a module implements only what it offers.
/// Node accessors are read once, when the addon is registered; the runtime
/// attaches and detaches the instances returned then.
#[async_trait]
pub trait AddonModule: Send + Sync {
    /// The node holding the addon's commands.
    fn command_node(&self) -> Option<Arc<DispatchNode>> {
        None
    }

    /// The node holding the addon's event handlers.
    fn event_node(&self) -> Option<Arc<DispatchNode>> {
        None
    }

    /// Hooks this module implements. Hooks not listed are never invoked.
    fn hooks(&self) -> &[LifecycleHook] {
        &[]
    }

    /// Run one lifecycle hook.
    ///
    /// # Errors
    ///
    /// Any error aborts the transition for this addon only.
    async fn run_hook(&self, hook: LifecycleHook) -> Result<(), HookError> {
        let _ = hook;
        Ok(())
    }
}

impl fmt::Debug for dyn AddonModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddonModule")
            .field("hooks", &self.hooks())
            .finish_non_exhaustive()
    }
}

/// Builds a module instance for a discovered manifest.
pub type ModuleFactory = Arc<dyn Fn(&AddonManifest) -> Arc<dyn AddonModule> + Send + Sync>;

/// Compiled-in addon modules keyed by addon name.
#[derive(Clone, Default)]
pub struct ModuleCatalog {
    factories: HashMap<String, ModuleFactory>,
}

impl ModuleCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the factory for the addon called `name`.
    ///
    /// Replaces any earlier factory under the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&AddonManifest) -> Arc<dyn AddonModule> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&AddonManifest) -> Arc<dyn AddonModule> + Send + Sync + 'static,
    {
        self.register(name, factory);
        self
    }

    /// Instantiate the module for `manifest`, if its code is compiled in.
    #[must_use]
    pub fn instantiate(&self, manifest: &AddonManifest) -> Option<Arc<dyn AddonModule>> {
        self.factories
            .get(&manifest.name)
            .map(|factory| factory(manifest))
    }

    /// Whether code for `name` is available.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Number of registered modules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for ModuleCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("ModuleCatalog")
            .field("modules", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use genesis_dispatch::{NodeKind, NodeOwner};

    use super::*;

    struct Commands {
        node: Arc<DispatchNode>,
    }

    #[async_trait]
    impl AddonModule for Commands {
        fn command_node(&self) -> Option<Arc<DispatchNode>> {
            Some(Arc::clone(&self.node))
        }

        fn hooks(&self) -> &[LifecycleHook] {
            &[LifecycleHook::Load]
        }
    }

    struct Bare;

    impl AddonModule for Bare {}

    #[test]
    fn test_probe_reports_only_what_is_provided() {
        let module = Commands {
            node: DispatchNode::new(NodeKind::Command, NodeOwner::addon("a")),
        };
        let caps = Capabilities::probe(&module);
        assert!(caps.command_node);
        assert!(!caps.event_node);
        assert!(caps.has_hook(LifecycleHook::Load));
        assert!(!caps.has_hook(LifecycleHook::Unload));

        assert_eq!(Capabilities::probe(&Bare), Capabilities::default());
    }

    #[test]
    fn test_catalog_instantiates_by_name() {
        let catalog = ModuleCatalog::new().with("bare", |_| Arc::new(Bare) as Arc<dyn AddonModule>);
        assert!(catalog.contains("bare"));
        assert_eq!(catalog.len(), 1);
        assert!(catalog.instantiate(&AddonManifest::new("bare", "1")).is_some());
        assert!(catalog.instantiate(&AddonManifest::new("other", "1")).is_none());
    }

    #[tokio::test]
    async fn test_default_hook_is_a_no_op() {
        assert!(Bare.run_hook(LifecycleHook::Enable).await.is_ok());
        assert_eq!(LifecycleHook::Disable.to_string(), "on_disable");
    }
}
