//! Wiring: registry, controller, core addon, dispatch and hot reload.

use std::sync::Arc;

use anyhow::{Context, Result};
use genesis_addons::watcher::{AddonWatcher, WatchEvent, WatcherConfig};
use genesis_addons::{Addon, AddonRegistry, LifecycleController, LoadedSet, ModuleCatalog, Roots};
use genesis_config::Config;
use genesis_dispatch::{Dispatcher, Messenger, Update};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::accounts::AccountManager;
use crate::console::ConsoleMessenger;
use crate::core_addon::{BotContext, CoreAddon};

/// A started runtime. Clones share all state.
#[derive(Debug, Clone)]
pub(crate) struct BotRuntime {
    bot: Arc<BotContext>,
    commands: Dispatcher,
    events: Dispatcher,
    messenger: Arc<dyn Messenger>,
}

impl BotRuntime {
    /// Discover addons, install the core addon and load every enabled addon.
    ///
    /// Addons that fail to load are logged and left unloaded.
    pub(crate) async fn start(
        config: &Config,
        catalog: ModuleCatalog,
        messenger: Arc<dyn Messenger>,
    ) -> Result<Self> {
        info!(name = %config.main.name, "Starting");

        let registry = Arc::new(AddonRegistry::new(&config.addons.root, catalog));
        registry.discover().context("discovering addons")?;
        let controller = Arc::new(LifecycleController::new(
            Arc::clone(&registry),
            Arc::new(LoadedSet::new()),
            Roots::new(),
        ));

        let accounts = Arc::new(AccountManager::with_sessions(
            &config.main.sessions_root,
            config.main.accounts_count,
        ));
        for (index, account) in accounts.accounts().iter().enumerate() {
            let profile = account.resolve_info(ConsoleMessenger::whoami(index.saturating_add(1)));
            info!(
                account = %profile.full_name(),
                session = %account.session().display(),
                "Account has been loaded"
            );
        }

        let bot = Arc::new(BotContext {
            name: config.main.name.clone(),
            version: config.version().to_string(),
            controller: Arc::clone(&controller),
            accounts,
        });

        let core = CoreAddon::new(&bot).context("building core addon")?;
        let main = Arc::new(Addon::builtin(
            CoreAddon::manifest(config.version()),
            Arc::new(core),
        ));
        registry.set_main_addon(Arc::clone(&main))?;
        controller.load(&main).await?;

        let report = controller.load_many(Vec::new()).await?;
        for (addon, error) in &report.failed {
            warn!(addon = %addon, error = %error, "Addon failed to load");
        }
        info!(
            loaded = report.succeeded.len(),
            failed = report.failed.len(),
            accounts = bot.accounts.len(),
            "Addons loaded"
        );

        let roots = controller.roots();
        Ok(Self {
            commands: Dispatcher::new(Arc::clone(&roots.commands)),
            events: Dispatcher::new(Arc::clone(&roots.events)),
            bot,
            messenger,
        })
    }

    pub(crate) fn controller(&self) -> &Arc<LifecycleController> {
        &self.bot.controller
    }

    /// Offer an update to the command tree and then to the event tree.
    pub(crate) async fn handle(&self, update: &Update) {
        let command = self.commands.dispatch(update, &self.messenger).await;
        let event = self.events.dispatch(update, &self.messenger).await;
        if command.is_none() && event.is_none() {
            trace!(message_id = update.message_id, "No handler for update");
        }
    }

    /// Apply a manifest change seen by the watcher.
    pub(crate) async fn apply(&self, event: WatchEvent) {
        match event {
            WatchEvent::AddonChanged {
                addon_dir,
                manifest_hash,
            } => {
                let registry = self.controller().registry();
                if let Err(e) = registry.rescan() {
                    warn!(error = %e, "Addon rescan failed");
                    return;
                }
                let Some(addon) = registry.find_by_dir(&addon_dir) else {
                    debug!(dir = %addon_dir.display(), "Change outside any known addon");
                    return;
                };
                match self.controller().reconcile(&addon).await {
                    Ok(status) => info!(
                        addon = %addon.name(),
                        %status,
                        hash = %manifest_hash,
                        "Addon reconciled with disk"
                    ),
                    Err(e) => warn!(addon = %addon.name(), error = %e, "Addon reload failed"),
                }
            },
            WatchEvent::Error(message) => warn!(error = %message, "Addon watcher error"),
        }
    }
}

async fn next_change(changes: &mut Option<mpsc::Receiver<WatchEvent>>) -> Option<WatchEvent> {
    match changes {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Run until stdin closes or the process is interrupted.
pub(crate) async fn run(config: &Config) -> Result<()> {
    let console = Arc::new(ConsoleMessenger::stdout());
    let messenger: Arc<dyn Messenger> = console.clone();
    let runtime = BotRuntime::start(config, ModuleCatalog::new(), messenger).await?;

    let mut changes = if config.addons.watch {
        let watch = WatcherConfig {
            root: config.addons.root.clone(),
            debounce: config.addons.debounce(),
        };
        let (watcher, rx) = AddonWatcher::new(watch).context("starting addon watcher")?;
        tokio::spawn(watcher.run());
        Some(rx)
    } else {
        None
    };

    info!(name = %config.main.name, "Started and waiting for updates");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    info!("Input closed, stopping");
                    break;
                };
                if let Some(update) = console.parse_line(&line) {
                    let runtime = runtime.clone();
                    tokio::spawn(async move { runtime.handle(&update).await });
                }
            },
            Some(change) = next_change(&mut changes) => runtime.apply(change).await,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                break;
            },
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use genesis_addons::AddonStatus;
    use genesis_test::{MockModule, RecordingMessenger, write_manifest};
    use tempfile::TempDir;

    use super::*;

    fn config(dir: &TempDir) -> Config {
        let mut config = genesis_config::default_config().unwrap();
        config.addons.root = dir.path().to_path_buf();
        config.addons.watch = false;
        config.main.sessions_root = dir.path().join("sessions");
        config
    }

    #[tokio::test]
    async fn test_start_loads_enabled_addons() {
        let dir = TempDir::new().unwrap();
        write_manifest(dir.path(), "weather", AddonStatus::Enabled);
        write_manifest(dir.path(), "legacy", AddonStatus::Disabled);
        let weather = MockModule::new("weather").with_command("forecast");
        let module = weather.clone();
        let catalog = ModuleCatalog::new().with("weather", move |_| module.as_module());

        let messenger = RecordingMessenger::new();
        let runtime = BotRuntime::start(&config(&dir), catalog, messenger.shared())
            .await
            .unwrap();

        let loaded = runtime.controller().loaded();
        assert!(loaded.contains("weather"));
        assert!(loaded.contains(CoreAddon::NAME));
        assert!(!loaded.contains("legacy"));

        runtime.handle(&Update::outgoing(1, 1, ".forecast")).await;
        assert_eq!(messenger.last_text().as_deref(), Some("forecast"));
    }

    #[tokio::test]
    async fn test_failing_addon_does_not_stop_startup() {
        let dir = TempDir::new().unwrap();
        write_manifest(dir.path(), "broken", AddonStatus::Enabled);
        let broken = MockModule::new("broken").failing_on(genesis_addons::LifecycleHook::Load);
        let catalog = ModuleCatalog::new().with("broken", move |_| broken.as_module());

        let runtime = BotRuntime::start(&config(&dir), catalog, RecordingMessenger::new().shared())
            .await
            .unwrap();
        assert!(!runtime.controller().loaded().contains("broken"));
        assert!(runtime.controller().loaded().contains(CoreAddon::NAME));
    }

    #[tokio::test]
    async fn test_manifest_change_is_reconciled() {
        let dir = TempDir::new().unwrap();
        let weather_dir = write_manifest(dir.path(), "weather", AddonStatus::Enabled);
        let runtime = BotRuntime::start(
            &config(&dir),
            ModuleCatalog::new(),
            RecordingMessenger::new().shared(),
        )
        .await
        .unwrap();
        assert!(runtime.controller().loaded().contains("weather"));

        write_manifest(dir.path(), "weather", AddonStatus::Disabled);
        runtime
            .apply(WatchEvent::AddonChanged {
                addon_dir: weather_dir.clone(),
                manifest_hash: "h1".to_string(),
            })
            .await;
        assert!(!runtime.controller().loaded().contains("weather"));

        let late_dir = write_manifest(dir.path(), "late", AddonStatus::Enabled);
        runtime
            .apply(WatchEvent::AddonChanged {
                addon_dir: late_dir,
                manifest_hash: "h2".to_string(),
            })
            .await;
        assert!(runtime.controller().loaded().contains("late"));
    }
}
