//! Membership set of addons currently attached to the root trees.

use std::collections::BTreeSet;
use std::sync::RwLock;

use tracing::warn;

/// Names of the addons whose nodes are currently attached.
///
/// Constructed empty at startup and shared by `Arc`. Only the lifecycle
/// controller writes to it.
#[derive(Debug, Default)]
pub struct LoadedSet {
    names: RwLock<BTreeSet<String>>,
}

impl LoadedSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeSet<String>> {
        self.names.read().unwrap_or_else(|e| {
            warn!("Loaded set lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeSet<String>> {
        self.names.write().unwrap_or_else(|e| {
            warn!("Loaded set lock poisoned, recovering");
            e.into_inner()
        })
    }

    /// Whether `name` is loaded.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.read().contains(name)
    }

    /// Mark `name` loaded. Returns `false` if it already was.
    pub(crate) fn insert(&self, name: &str) -> bool {
        self.write().insert(name.to_string())
    }

    /// Mark `name` unloaded. Returns `false` if it was not loaded.
    pub(crate) fn remove(&self, name: &str) -> bool {
        self.write().remove(name)
    }

    /// Loaded names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.read().iter().cloned().collect()
    }

    /// Number of loaded addons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether nothing is loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}
