//! Hot-reload watcher for the addons root.
//!
//! Watches the addons root for file changes, debounces them per addon
//! directory and emits a [`WatchEvent`] when an addon's manifest content
//! actually changed (verified via blake3 hashing).
//!
//! ```text
//! filesystem events (notify)
//!   → map to addon directory (first path component below the root)
//!   → debounce per addon
//!   → blake3 hash addon.toml
//!   → compare to cached hash
//!   → emit WatchEvent::AddonChanged
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::discovery::MANIFEST_FILE_NAME;
use crate::error::{AddonError, AddonResult};

/// Default debounce interval for file change events.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Events emitted by the addon watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// An addon's manifest changed or a new addon appeared.
    AddonChanged {
        /// The addon's directory.
        addon_dir: PathBuf,
        /// blake3 hash of the manifest after the change.
        manifest_hash: String,
    },
    /// Watcher encountered a non-fatal error.
    Error(String),
}

/// Configuration for the addon watcher.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// The addons root.
    pub root: PathBuf,
    /// Changes within this window are coalesced.
    pub debounce: Duration,
}

impl WatcherConfig {
    /// Watch `root` with the default debounce.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// Watches the addons root and emits [`WatchEvent`]s.
pub struct AddonWatcher {
    config: WatcherConfig,
    hash_cache: HashMap<PathBuf, String>,
    /// Dropping this handle stops filesystem monitoring.
    watcher: RecommendedWatcher,
    raw_rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
    event_tx: mpsc::Sender<WatchEvent>,
}

impl AddonWatcher {
    /// Create a watcher and the receiver its events arrive on.
    ///
    /// Call [`run()`](Self::run) to start the event loop.
    ///
    /// # Errors
    ///
    /// Returns an error if the filesystem watcher cannot be initialized.
    pub fn new(config: WatcherConfig) -> AddonResult<(Self, mpsc::Receiver<WatchEvent>)> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(64);

        let watcher = RecommendedWatcher::new(
            move |res| {
                let _ = raw_tx.send(res);
            },
            notify::Config::default(),
        )
        .map_err(|e| AddonError::Io(std::io::Error::other(format!("filesystem watcher: {e}"))))?;

        Ok((
            Self {
                config,
                hash_cache: HashMap::new(),
                watcher,
                raw_rx,
                event_tx,
            },
            event_rx,
        ))
    }

    /// Run the event loop until the event receiver is dropped or the
    /// filesystem watcher stops.
    pub async fn run(mut self) {
        let root = self.config.root.clone();
        if !root.is_dir() {
            warn!(path = %root.display(), "Addons root does not exist, not watching");
            return;
        }
        if let Err(e) = self.watcher.watch(&root, RecursiveMode::Recursive) {
            warn!(path = %root.display(), error = %e, "Failed to watch addons root");
            return;
        }
        info!(path = %root.display(), "Watching addons root");
        self.seed_hashes();

        let debounce = self.config.debounce;
        let mut pending: HashMap<PathBuf, tokio::time::Instant> = HashMap::new();

        loop {
            let next_deadline = pending.values().copied().min();

            tokio::select! {
                biased;

                () = async {
                    match next_deadline {
                        Some(deadline) => tokio::time::sleep_until(deadline).await,
                        None => std::future::pending::<()>().await,
                    }
                } => {
                    let now = tokio::time::Instant::now();
                    let ready: Vec<PathBuf> = pending
                        .iter()
                        .filter(|(_, deadline)| **deadline <= now)
                        .map(|(path, _)| path.clone())
                        .collect();

                    for addon_dir in ready {
                        pending.remove(&addon_dir);
                        if !self.process_addon_change(&addon_dir).await {
                            return;
                        }
                    }
                }

                event = self.raw_rx.recv() => {
                    match event {
                        Some(Ok(ev)) => self.handle_raw_event(&ev, &mut pending, debounce),
                        Some(Err(e)) => {
                            warn!(error = %e, "Filesystem watcher error");
                            if self.event_tx.send(WatchEvent::Error(e.to_string())).await.is_err() {
                                debug!("Event receiver dropped, stopping watcher");
                                return;
                            }
                        }
                        None => {
                            debug!("Filesystem watcher channel closed, stopping");
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Record the current manifest hashes so untouched addons do not fire.
    fn seed_hashes(&mut self) {
        let Ok(entries) = std::fs::read_dir(&self.config.root) else {
            return;
        };
        for entry in entries.flatten() {
            let dir = entry.path();
            if let Ok(hash) = compute_manifest_hash(&dir) {
                self.hash_cache.insert(dir, hash);
            }
        }
    }

    fn handle_raw_event(
        &self,
        event: &Event,
        pending: &mut HashMap<PathBuf, tokio::time::Instant>,
        debounce: Duration,
    ) {
        match event.kind {
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {},
            _ => return,
        }

        for path in &event.paths {
            if let Some(addon_dir) = resolve_addon_dir(&self.config.root, path) {
                debug!(
                    path = %path.display(),
                    addon_dir = %addon_dir.display(),
                    kind = ?event.kind,
                    "File change detected in addon"
                );
                #[allow(clippy::arithmetic_side_effects)]
                let deadline = tokio::time::Instant::now() + debounce;
                pending.insert(addon_dir, deadline);
            }
        }
    }

    /// Hash the manifest and emit an event if it changed.
    ///
    /// Returns `false` once the event receiver has been dropped.
    async fn process_addon_change(&mut self, addon_dir: &Path) -> bool {
        let hash = match compute_manifest_hash(addon_dir) {
            Ok(hash) => hash,
            Err(e) => {
                debug!(
                    addon_dir = %addon_dir.display(),
                    error = %e,
                    "No readable manifest, ignoring"
                );
                self.hash_cache.remove(addon_dir);
                return true;
            },
        };

        if self.hash_cache.get(addon_dir).is_some_and(|h| h == &hash) {
            debug!(addon_dir = %addon_dir.display(), "Manifest unchanged, skipping");
            return true;
        }

        info!(addon_dir = %addon_dir.display(), hash = %hash, "Addon manifest changed");
        self.hash_cache
            .insert(addon_dir.to_path_buf(), hash.clone());

        if self
            .event_tx
            .send(WatchEvent::AddonChanged {
                addon_dir: addon_dir.to_path_buf(),
                manifest_hash: hash,
            })
            .await
            .is_err()
        {
            debug!("Event receiver dropped, stopping watcher");
            return false;
        }
        true
    }
}

impl std::fmt::Debug for AddonWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AddonWatcher")
            .field("config", &self.config)
            .field("cached", &self.hash_cache.len())
            .finish_non_exhaustive()
    }
}

/// The addon directory a changed path belongs to: the first path component
/// below `root`. Changes to `root` itself belong to no addon.
#[must_use]
pub fn resolve_addon_dir(root: &Path, path: &Path) -> Option<PathBuf> {
    let relative = path.strip_prefix(root).ok()?;
    let first = relative.components().next()?;
    Some(root.join(first))
}

/// blake3 hash of `<addon_dir>/addon.toml`.
///
/// # Errors
///
/// Returns an error if the manifest cannot be read.
pub fn compute_manifest_hash(addon_dir: &Path) -> std::io::Result<String> {
    let content = std::fs::read(addon_dir.join(MANIFEST_FILE_NAME))?;
    Ok(blake3::hash(&content).to_hex().to_string())
}
