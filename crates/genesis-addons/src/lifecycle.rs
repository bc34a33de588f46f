//! Addon lifecycle controller.
//!
//! Drives the enable/disable/load/unload transitions of every addon and
//! attaches or detaches its nodes under the two root trees.
//!
//! # States
//!
//! ```text
//!               enable                    load
//!   Disabled ───────────▶ EnabledUnloaded ─────▶ EnabledLoaded
//!      ▲                        │  ▲   unload          │
//!      └──────── disable ───────┘  └───────────────────┘
//! ```
//!
//! An addon is never in the [`LoadedSet`] while disabled: `disable` unloads
//! before it flips the status.
//!
//! # Failure isolation
//!
//! Every operation acts on one addon. Batch forms run the single operation
//! for each addon in turn and collect the outcomes in a [`BatchReport`]; one
//! failing addon never stops the rest.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};

use futures::FutureExt;
use genesis_dispatch::{DispatchNode, NodeKind};
use tracing::{debug, error, info, warn};

use crate::addon::{Addon, AddonRef};
use crate::error::{AddonError, AddonResult};
use crate::loaded::LoadedSet;
use crate::manifest::AddonStatus;
use crate::module::LifecycleHook;
use crate::registry::AddonRegistry;

/// The two fixed roots every addon subtree attaches under.
#[derive(Debug, Clone)]
pub struct Roots {
    /// Root of all command nodes.
    pub commands: Arc<DispatchNode>,
    /// Root of all event nodes.
    pub events: Arc<DispatchNode>,
}

impl Roots {
    /// Fresh built-in roots.
    #[must_use]
    pub fn new() -> Self {
        Self {
            commands: DispatchNode::root(NodeKind::Command),
            events: DispatchNode::root(NodeKind::Event),
        }
    }

    /// The root for nodes of `kind`.
    #[must_use]
    pub fn for_kind(&self, kind: NodeKind) -> &Arc<DispatchNode> {
        match kind {
            NodeKind::Command => &self.commands,
            NodeKind::Event => &self.events,
        }
    }
}

impl Default for Roots {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of a batch operation.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Addons the operation succeeded for.
    pub succeeded: Vec<String>,
    /// Addons skipped because they lack the node the operation works on.
    pub skipped: Vec<String>,
    /// Addons the operation failed for, with the reason.
    pub failed: Vec<(String, AddonError)>,
}

impl BatchReport {
    /// Whether no addon failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Names of the failed addons.
    #[must_use]
    pub fn failed_names(&self) -> Vec<&str> {
        self.failed.iter().map(|(name, _)| name.as_str()).collect()
    }
}

/// Whether a node-level operation did anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Done,
    Skipped,
}

/// Orchestrates addon state transitions.
///
/// Operations on the same addon are serialized through a per-addon async
/// mutex. Operations on different addons run independently.
pub struct LifecycleController {
    registry: Arc<AddonRegistry>,
    loaded: Arc<LoadedSet>,
    roots: Roots,
    guards: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl LifecycleController {
    /// Create a controller over `registry`, recording membership in `loaded`.
    #[must_use]
    pub fn new(registry: Arc<AddonRegistry>, loaded: Arc<LoadedSet>, roots: Roots) -> Self {
        Self {
            registry,
            loaded,
            roots,
            guards: Mutex::new(HashMap::new()),
        }
    }

    /// The registry this controller resolves addons through.
    #[must_use]
    pub fn registry(&self) -> &Arc<AddonRegistry> {
        &self.registry
    }

    /// The set of loaded addons.
    #[must_use]
    pub fn loaded(&self) -> &Arc<LoadedSet> {
        &self.loaded
    }

    /// The root trees.
    #[must_use]
    pub fn roots(&self) -> &Roots {
        &self.roots
    }

    fn guard(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut guards = self.guards.lock().unwrap_or_else(|e| {
            warn!("Lifecycle guard table poisoned, recovering");
            e.into_inner()
        });
        Arc::clone(guards.entry(name.to_string()).or_default())
    }

    fn resolve(&self, reference: &AddonRef) -> AddonResult<Arc<Addon>> {
        self.registry.resolve(reference).inspect_err(|e| {
            warn!(addon = %reference, error = %e, "Cannot resolve addon");
        })
    }

    /// Set the addon's status to enabled and run its `on_enable` hook.
    ///
    /// With `attach_after`, the addon is loaded afterwards.
    ///
    /// # Errors
    ///
    /// [`AddonError::NotFound`] for unknown names, [`AddonError::HookFailed`]
    /// when the hook fails, plus anything [`load`](Self::load) returns.
    pub async fn enable(
        &self,
        addon: impl Into<AddonRef>,
        attach_after: bool,
    ) -> AddonResult<()> {
        let addon = self.resolve(&addon.into())?;
        let lock = self.guard(addon.name());
        let _guard = lock.lock().await;
        self.enable_locked(&addon, attach_after).await
    }

    /// Run the addon's `on_disable` hook, unload it when `detach_first`, then
    /// set its status to disabled.
    ///
    /// Unloading an addon that is not loaded only warns. Without
    /// `detach_first` the addon must not be loaded.
    ///
    /// # Errors
    ///
    /// [`AddonError::NotFound`] for unknown names,
    /// [`AddonError::InvalidState`] for a loaded addon when `detach_first` is
    /// unset, and [`AddonError::HookFailed`] when a hook fails. The status is
    /// left unchanged on error.
    pub async fn disable(
        &self,
        addon: impl Into<AddonRef>,
        detach_first: bool,
    ) -> AddonResult<()> {
        let addon = self.resolve(&addon.into())?;
        let lock = self.guard(addon.name());
        let _guard = lock.lock().await;
        self.disable_locked(&addon, detach_first).await
    }

    /// Run the addon's `on_load` hook and attach its nodes.
    ///
    /// # Errors
    ///
    /// [`AddonError::InvalidState`] if the addon is disabled or already
    /// loaded, [`AddonError::HookFailed`] if the hook or an attach fails.
    /// On failure the addon is left unloaded and detached.
    pub async fn load(&self, addon: impl Into<AddonRef>) -> AddonResult<()> {
        let addon = self.resolve(&addon.into())?;
        let lock = self.guard(addon.name());
        let _guard = lock.lock().await;
        self.load_locked(&addon).await
    }

    /// Run the addon's `on_unload` hook and detach its nodes.
    ///
    /// # Errors
    ///
    /// [`AddonError::InvalidState`] if the addon is disabled,
    /// [`AddonError::HookFailed`] if the hook fails. A hook failure leaves
    /// the addon attached.
    pub async fn unload(&self, addon: impl Into<AddonRef>) -> AddonResult<()> {
        let addon = self.resolve(&addon.into())?;
        let lock = self.guard(addon.name());
        let _guard = lock.lock().await;
        self.unload_locked(&addon).await
    }

    /// Load each addon in `addons`, or every enabled addon when empty.
    ///
    /// # Errors
    ///
    /// Only [`AddonError::InvariantViolation`] aborts the batch; every other
    /// failure is recorded in the report.
    pub async fn load_many(&self, addons: Vec<AddonRef>) -> AddonResult<BatchReport> {
        let mut report = BatchReport::default();
        for target in self.include_targets(addons) {
            let name = target.name().to_string();
            let result = self.load(target).await.map(|()| Outcome::Done);
            record(&mut report, name, result)?;
        }
        Ok(report)
    }

    /// Unload each addon in `addons`.
    ///
    /// # Errors
    ///
    /// [`AddonError::MissingArgument`] when `addons` is empty. Otherwise as
    /// [`load_many`](Self::load_many).
    pub async fn unload_many(&self, addons: Vec<AddonRef>) -> AddonResult<BatchReport> {
        let addons = require_targets(addons, "unload")?;
        let mut report = BatchReport::default();
        for target in addons {
            let name = target.name().to_string();
            let result = self.unload(target).await.map(|()| Outcome::Done);
            record(&mut report, name, result)?;
        }
        Ok(report)
    }

    /// Attach the command node of each addon, or of every enabled addon when
    /// `addons` is empty. Addons without a command node are skipped.
    ///
    /// # Errors
    ///
    /// As [`load_many`](Self::load_many).
    pub async fn include_commands(&self, addons: Vec<AddonRef>) -> AddonResult<BatchReport> {
        self.attach_many(self.include_targets(addons), NodeKind::Command)
            .await
    }

    /// Detach the command node of each addon in `addons`.
    ///
    /// # Errors
    ///
    /// [`AddonError::MissingArgument`] when `addons` is empty. Otherwise as
    /// [`load_many`](Self::load_many).
    pub async fn exclude_commands(&self, addons: Vec<AddonRef>) -> AddonResult<BatchReport> {
        let addons = require_targets(addons, "exclude_commands")?;
        self.detach_many(addons, NodeKind::Command).await
    }

    /// Attach the event node of each addon, or of every enabled addon when
    /// `addons` is empty. Addons without an event node are skipped.
    ///
    /// # Errors
    ///
    /// As [`load_many`](Self::load_many).
    pub async fn include_events(&self, addons: Vec<AddonRef>) -> AddonResult<BatchReport> {
        self.attach_many(self.include_targets(addons), NodeKind::Event)
            .await
    }

    /// Detach the event node of each addon in `addons`.
    ///
    /// # Errors
    ///
    /// [`AddonError::MissingArgument`] when `addons` is empty. Otherwise as
    /// [`load_many`](Self::load_many).
    pub async fn exclude_events(&self, addons: Vec<AddonRef>) -> AddonResult<BatchReport> {
        let addons = require_targets(addons, "exclude_events")?;
        self.detach_many(addons, NodeKind::Event).await
    }

    /// Converge the live state of an addon with its manifest on disk.
    ///
    /// Disabled on disk while enabled in memory disables and unloads it.
    /// Enabled on disk while disabled in memory enables and loads it. An
    /// enabled addon that is not loaded gets loaded. Returns the status the
    /// addon ends up with.
    ///
    /// # Errors
    ///
    /// Manifest read errors and anything the triggered transition returns.
    pub async fn reconcile(&self, addon: impl Into<AddonRef>) -> AddonResult<AddonStatus> {
        let addon = self.resolve(&addon.into())?;
        let lock = self.guard(addon.name());
        let _guard = lock.lock().await;

        let Some(on_disk) = self.registry.read_manifest(&addon)? else {
            return Ok(addon.status());
        };
        addon.refresh_metadata(&on_disk);

        let loaded = self.loaded.contains(addon.name());
        match (on_disk.status, addon.status()) {
            (AddonStatus::Disabled, AddonStatus::Enabled) => {
                info!(addon = %addon.name(), "Addon disabled on disk, unloading");
                self.disable_locked(&addon, true).await?;
            },
            (AddonStatus::Enabled, AddonStatus::Disabled) => {
                info!(addon = %addon.name(), "Addon enabled on disk, loading");
                self.enable_locked(&addon, true).await?;
            },
            (AddonStatus::Enabled, AddonStatus::Enabled) if !loaded => {
                self.load_locked(&addon).await?;
            },
            _ => debug!(addon = %addon.name(), "Addon already in sync with disk"),
        }
        Ok(addon.status())
    }

    async fn enable_locked(&self, addon: &Addon, attach_after: bool) -> AddonResult<()> {
        self.registry.set_status(addon, AddonStatus::Enabled)?;
        info!(addon = %addon.name(), "Addon enabled");
        self.run_hook(addon, LifecycleHook::Enable).await?;
        if attach_after {
            self.load_locked(addon).await?;
        }
        Ok(())
    }

    async fn disable_locked(&self, addon: &Addon, detach_first: bool) -> AddonResult<()> {
        if !detach_first && self.loaded.contains(addon.name()) {
            warn!(addon = %addon.name(), "Cannot disable a loaded addon without unloading it");
            return Err(invalid_state(addon.name(), "addon is loaded"));
        }
        self.run_hook(addon, LifecycleHook::Disable).await?;
        if detach_first {
            match self.unload_locked(addon).await {
                Ok(()) | Err(AddonError::InvalidState { .. }) => {},
                Err(e) => return Err(e),
            }
        }
        self.registry.set_status(addon, AddonStatus::Disabled)?;
        info!(addon = %addon.name(), "Addon disabled");
        Ok(())
    }

    async fn load_locked(&self, addon: &Addon) -> AddonResult<()> {
        let name = addon.name();
        if !addon.is_enabled() {
            warn!(addon = %name, "Cannot load a disabled addon");
            return Err(invalid_state(name, "addon is disabled"));
        }
        if self.loaded.contains(name) {
            warn!(addon = %name, "Addon is already loaded");
            return Err(invalid_state(name, "addon is already loaded"));
        }

        let nodes: Vec<Arc<DispatchNode>> = [NodeKind::Event, NodeKind::Command]
            .into_iter()
            .filter_map(|kind| self.registry.node(addon, kind))
            .collect();
        self.run_hook(addon, LifecycleHook::Load).await?;
        self.loaded.insert(name);

        let mut attached: Vec<&Arc<DispatchNode>> = Vec::with_capacity(nodes.len());
        for node in &nodes {
            if let Err(e) = self.attach(addon, node) {
                for done in attached {
                    self.detach(addon, done);
                }
                self.loaded.remove(name);
                return Err(e);
            }
            attached.push(node);
        }

        info!(addon = %name, nodes = nodes.len(), "Addon loaded");
        Ok(())
    }

    async fn unload_locked(&self, addon: &Addon) -> AddonResult<()> {
        let name = addon.name();
        if !addon.is_enabled() {
            warn!(addon = %name, "Cannot unload a disabled addon");
            return Err(invalid_state(name, "addon is disabled"));
        }
        if !self.loaded.contains(name) {
            warn!(addon = %name, "Addon is not loaded, unloading anyway");
        }

        self.run_hook(addon, LifecycleHook::Unload).await?;
        for kind in [NodeKind::Command, NodeKind::Event] {
            if let Some(node) = self.registry.node(addon, kind) {
                self.detach(addon, &node);
            }
        }
        self.loaded.remove(name);
        info!(addon = %name, "Addon unloaded");
        Ok(())
    }

    /// Enable `node` and put it under its root.
    fn attach(&self, addon: &Addon, node: &Arc<DispatchNode>) -> AddonResult<()> {
        node.enable();
        let root = self.roots.for_kind(node.kind());
        match root.include(node) {
            Ok(()) => {
                debug!(addon = %addon.name(), kind = %node.kind(), "Included node");
                Ok(())
            },
            Err(e) => {
                node.disable();
                error!(
                    addon = %addon.name(),
                    kind = %node.kind(),
                    error = %e,
                    "Failed to include node"
                );
                Err(AddonError::HookFailed {
                    addon: addon.name().to_string(),
                    stage: "attach".to_string(),
                    message: e.to_string(),
                })
            },
        }
    }

    /// Disable `node` and take it off its root.
    fn detach(&self, addon: &Addon, node: &Arc<DispatchNode>) {
        node.disable();
        if self.roots.for_kind(node.kind()).exclude(node) {
            debug!(addon = %addon.name(), kind = %node.kind(), "Excluded node");
        } else {
            debug!(addon = %addon.name(), kind = %node.kind(), "Node was not attached");
        }
    }

    async fn attach_one(&self, reference: AddonRef, kind: NodeKind) -> AddonResult<Outcome> {
        let addon = self.resolve(&reference)?;
        let lock = self.guard(addon.name());
        let _guard = lock.lock().await;

        if !addon.is_enabled() {
            warn!(addon = %addon.name(), "Cannot include nodes of a disabled addon");
            return Err(invalid_state(addon.name(), "addon is disabled"));
        }
        let Some(node) = self.registry.node(&addon, kind) else {
            info!(addon = %addon.name(), %kind, "Addon has no node of this kind");
            return Ok(Outcome::Skipped);
        };
        self.attach(&addon, &node)?;
        Ok(Outcome::Done)
    }

    async fn detach_one(&self, reference: AddonRef, kind: NodeKind) -> AddonResult<Outcome> {
        let addon = self.resolve(&reference)?;
        let lock = self.guard(addon.name());
        let _guard = lock.lock().await;

        if !addon.is_enabled() {
            warn!(addon = %addon.name(), "Cannot exclude nodes of a disabled addon");
            return Err(invalid_state(addon.name(), "addon is disabled"));
        }
        let Some(node) = self.registry.node(&addon, kind) else {
            info!(addon = %addon.name(), %kind, "Addon has no node of this kind");
            return Ok(Outcome::Skipped);
        };
        self.detach(&addon, &node);
        Ok(Outcome::Done)
    }

    async fn attach_many(
        &self,
        targets: Vec<AddonRef>,
        kind: NodeKind,
    ) -> AddonResult<BatchReport> {
        let mut report = BatchReport::default();
        for target in targets {
            let name = target.name().to_string();
            let result = self.attach_one(target, kind).await;
            record(&mut report, name, result)?;
        }
        Ok(report)
    }

    async fn detach_many(
        &self,
        targets: Vec<AddonRef>,
        kind: NodeKind,
    ) -> AddonResult<BatchReport> {
        let mut report = BatchReport::default();
        for target in targets {
            let name = target.name().to_string();
            let result = self.detach_one(target, kind).await;
            record(&mut report, name, result)?;
        }
        Ok(report)
    }

    fn include_targets(&self, addons: Vec<AddonRef>) -> Vec<AddonRef> {
        if addons.is_empty() {
            self.registry
                .enabled()
                .into_iter()
                .map(AddonRef::Addon)
                .collect()
        } else {
            addons
        }
    }

    /// Run `hook` if the addon implements it. A panicking hook counts as a
    /// failed one.
    async fn run_hook(&self, addon: &Addon, hook: LifecycleHook) -> AddonResult<()> {
        if !self.registry.has_hook(addon, hook) {
            return Ok(());
        }
        let Some(module) = addon.module() else {
            return Ok(());
        };

        debug!(addon = %addon.name(), %hook, "Running hook");
        let outcome = AssertUnwindSafe(module.run_hook(hook)).catch_unwind().await;
        let message = match outcome {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => e.to_string(),
            Err(_) => "hook panicked".to_string(),
        };
        error!(addon = %addon.name(), %hook, error = %message, "Addon hook failed");
        Err(AddonError::HookFailed {
            addon: addon.name().to_string(),
            stage: hook.to_string(),
            message,
        })
    }
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("registry", &self.registry)
            .field("loaded", &self.loaded)
            .field("roots", &self.roots)
            .finish_non_exhaustive()
    }
}

fn invalid_state(addon: &str, message: &str) -> AddonError {
    AddonError::InvalidState {
        addon: addon.to_string(),
        message: message.to_string(),
    }
}

fn require_targets(addons: Vec<AddonRef>, operation: &str) -> AddonResult<Vec<AddonRef>> {
    if addons.is_empty() {
        warn!(operation, "At least one addon must be passed");
        return Err(AddonError::MissingArgument(operation.to_string()));
    }
    Ok(addons)
}

fn record(report: &mut BatchReport, name: String, result: AddonResult<Outcome>) -> AddonResult<()> {
    match result {
        Ok(Outcome::Done) => report.succeeded.push(name),
        Ok(Outcome::Skipped) => report.skipped.push(name),
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => report.failed.push((name, e)),
    }
    Ok(())
}
