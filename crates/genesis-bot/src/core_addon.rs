//! The built-in core addon: operator commands for inspecting and toggling
//! addons at runtime.

use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use genesis_addons::{
    Addon, AddonError, AddonManifest, AddonModule, AddonRegistry, LifecycleController,
};
use genesis_dispatch::stats;
use genesis_dispatch::{
    DispatchError, DispatchNode, DispatchResult, Flow, Handler, HandlerContext, MessageRef,
    NodeKind, NodeOwner, Registration, Update, flatten, handler_fn,
};
use regex::Regex;
use tracing::{info, warn};

use crate::accounts::AccountManager;

/// Name accepted by `addon` for the built-in addon.
pub(crate) const MAIN_ADDON_ALIAS: &str = "MAIN ADDON";

const TOGGLE_HINT: &str = "Type +(to enable addon)/-(to disable addon) in reply to this message";

const ADDON_NAME_PATTERN: &str = "^Name: \u{200d}(.+)\u{200c}\n";

const UNDECIDABLE: &str = "Cannot define on disabled addons";

/// State the core commands read.
#[derive(Debug)]
pub(crate) struct BotContext {
    pub(crate) name: String,
    pub(crate) version: String,
    pub(crate) controller: Arc<LifecycleController>,
    pub(crate) accounts: Arc<AccountManager>,
}

impl BotContext {
    fn registry(&self) -> &Arc<AddonRegistry> {
        self.controller.registry()
    }

    /// Resolve an operator-typed addon name, honouring the main addon alias.
    fn lookup(&self, name: &str) -> Option<Arc<Addon>> {
        if name == MAIN_ADDON_ALIAS {
            return self.registry().main_addon();
        }
        self.registry().get(name)
    }
}

/// Which addons `addons` lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum Listing {
    /// Attached to the dispatch tree.
    Loaded,
    /// Marked enabled.
    Enabled,
    /// Marked disabled.
    Disabled,
    /// Every discovered addon.
    All,
}

impl Listing {
    fn title(self) -> &'static str {
        match self {
            Self::Loaded => "Loaded",
            Self::Enabled => "Enabled",
            Self::Disabled => "Disabled",
            Self::All => "All",
        }
    }
}

impl FromStr for Listing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "loaded" => Ok(Self::Loaded),
            "enabled" => Ok(Self::Enabled),
            "disabled" => Ok(Self::Disabled),
            "all" => Ok(Self::All),
            other => Err(other.to_string()),
        }
    }
}

/// Nodes of the built-in addon.
#[derive(Debug)]
pub(crate) struct CoreAddon {
    commands: Arc<DispatchNode>,
    events: Arc<DispatchNode>,
}

impl CoreAddon {
    pub(crate) const NAME: &'static str = "core";

    pub(crate) fn manifest(version: &str) -> AddonManifest {
        AddonManifest::new(Self::NAME, version)
            .with_author("Genesis")
            .with_description("Built-in runtime commands")
    }

    /// Build the command and event nodes.
    ///
    /// Handlers hold a weak reference to `bot` and skip updates once it is
    /// gone.
    pub(crate) fn new(bot: &Arc<BotContext>) -> Result<Self, regex::Error> {
        let owner = NodeOwner::addon(Self::NAME);
        let commands = DispatchNode::new(NodeKind::Command, owner.clone());
        let events = DispatchNode::new(NodeKind::Event, owner);

        commands.register(
            Registration::command("loaded_accounts", bot_handler(bot, loaded_accounts))
                .with_description("Shows loaded accounts"),
        );
        commands.register(
            Registration::command("bot", bot_handler(bot, bot_info))
                .with_description("Shows bot information")
                .owner_only(),
        );
        commands.register(
            Registration::command("commands", bot_handler(bot, addon_commands))
                .with_description("Shows addon registered commands")
                .with_arguments(["addon name"]),
        );
        commands.register(
            Registration::command("addons", bot_handler(bot, list_addons))
                .with_description("Shows available addons")
                .with_arguments(["addon status(loaded|enabled|disabled|all)"]),
        );
        commands.register(
            Registration::command("addon", bot_handler(bot, addon_info))
                .with_description("Shows information about addon")
                .with_arguments(["addon name"]),
        );

        let pattern = Arc::new(Regex::new(ADDON_NAME_PATTERN)?);
        let filter = Arc::clone(&pattern);
        events.register(Registration::event(
            "toggle_addon",
            move |update: &Update| is_toggle(&filter, update),
            bot_handler(bot, move |bot, ctx| {
                toggle_addon(bot, ctx, Arc::clone(&pattern))
            }),
        ));

        Ok(Self { commands, events })
    }
}

#[async_trait]
impl AddonModule for CoreAddon {
    fn command_node(&self) -> Option<Arc<DispatchNode>> {
        Some(Arc::clone(&self.commands))
    }

    fn event_node(&self) -> Option<Arc<DispatchNode>> {
        Some(Arc::clone(&self.events))
    }
}

fn bot_handler<F, Fut>(bot: &Arc<BotContext>, f: F) -> Arc<dyn Handler>
where
    F: Fn(Arc<BotContext>, HandlerContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DispatchResult<Flow>> + Send + 'static,
{
    let bot = Arc::downgrade(bot);
    handler_fn(move |ctx| {
        let pending = bot.upgrade().map(|bot| f(bot, ctx));
        async move {
            match pending {
                Some(fut) => fut.await,
                None => Ok(Flow::Skip),
            }
        }
    })
}

async fn loaded_accounts(bot: Arc<BotContext>, ctx: HandlerContext) -> DispatchResult<Flow> {
    let lines: Vec<String> = bot
        .accounts
        .accounts()
        .iter()
        .filter_map(|account| account.info().map(|info| format!("- account {}", info.username)))
        .collect();
    ctx.reply(&format!("Accounts loaded:\n{}", lines.join("\n")))
        .await?;
    Ok(Flow::Handled)
}

async fn bot_info(bot: Arc<BotContext>, ctx: HandlerContext) -> DispatchResult<Flow> {
    ctx.edit(&summary(&bot)).await?;
    Ok(Flow::Handled)
}

/// Runtime summary shown by `bot`.
pub(crate) fn summary(bot: &BotContext) -> String {
    let owners: Vec<String> = bot
        .accounts
        .accounts()
        .iter()
        .filter_map(|account| {
            account
                .info()
                .map(|info| format!("{}(@{}:{})", info.full_name(), info.username, info.id))
        })
        .collect();

    let roots = bot.controller.roots();
    let top: Vec<String> = stats::top_n(&roots.commands, 5)
        .iter()
        .map(|record| format!("{}({})", record.registration.body(), record.call_count))
        .collect();

    format!(
        "Genesis userbot:\n\
         \x20   Version: {}\n\
         \x20   Name: {}\n\
         \x20   Owners: {}\n\
         \x20   Loaded addons: {}\n\
         \x20   Included command managers: {}\n\
         \x20   Included event managers: {}\n\
         \x20   Total commands call count: {}\n\
         \x20   Top-5 used commands: {}",
        bot.version,
        bot.name,
        owners.join(", "),
        bot.registry().enabled().len(),
        flatten(&roots.commands).len(),
        flatten(&roots.events).len(),
        stats::total_call_count(&roots.commands),
        top.join(", "),
    )
}

async fn addon_commands(bot: Arc<BotContext>, ctx: HandlerContext) -> DispatchResult<Flow> {
    let name = ctx.argument_text();
    if name.is_empty() {
        ctx.append("Please, type addon name after the command").await?;
        return Ok(Flow::Handled);
    }
    let Some(addon) = bot.lookup(name) else {
        ctx.append("Addon not found").await?;
        return Ok(Flow::Handled);
    };
    let Some(node) = bot.registry().command_node(&addon) else {
        ctx.append("Addon hasn't command manager").await?;
        return Ok(Flow::Handled);
    };
    ctx.edit(&format!("All commands:\n{}", describe_node(&node)))
        .await?;
    Ok(Flow::Handled)
}

fn describe_registration(registration: &Registration) -> String {
    let arguments = if registration.arguments().is_empty() {
        "not required".to_string()
    } else {
        registration.arguments().join(", ")
    };
    format!(
        "<b>{}</b>:\n\
         \x20   <b>Prefixes</b>: {}\n\
         \x20   <b>Description</b>: {}\n\
         \x20   <b>Arguments</b>: {arguments}\n\
         \x20   <b>Only owner-usable</b>: {}\n\
         \x20   <b>Is enabled</b>: {}",
        registration.body(),
        registration.prefixes().join(", "),
        registration.description().unwrap_or("undescribed"),
        registration.is_owner_only(),
        registration.is_enabled(),
    )
}

/// Leaves of one node, indented under their owner.
pub(crate) fn describe_node(node: &DispatchNode) -> String {
    let leaves: Vec<String> = node
        .registrations()
        .iter()
        .map(|r| format!("    {}", describe_registration(r).replace('\n', "\n    ")))
        .collect();
    format!("From <b>{}</b>:\n{}", node.owner(), leaves.join("\n\n"))
}

async fn list_addons(bot: Arc<BotContext>, ctx: HandlerContext) -> DispatchResult<Flow> {
    let requested = ctx.arguments.first().map_or("loaded", String::as_str);
    let listing = match requested.parse::<Listing>() {
        Ok(listing) => listing,
        Err(status) => {
            ctx.append(&format!("Not allowed addon status: {status}"))
                .await?;
            return Ok(Flow::Handled);
        },
    };
    let registry = bot.registry();
    let addons = match listing {
        Listing::Loaded => registry.loaded(bot.controller.loaded()),
        Listing::Enabled => registry.enabled(),
        Listing::Disabled => registry.disabled(),
        Listing::All => registry.all(),
    };
    ctx.edit(&format_listing(listing, &addons)).await?;
    Ok(Flow::Handled)
}

pub(crate) fn status_icon(addon: &Addon) -> &'static str {
    if addon.is_enabled() { "🟢" } else { "🔴" }
}

/// `addons` output. `addons` must already be in display order.
pub(crate) fn format_listing(listing: Listing, addons: &[Arc<Addon>]) -> String {
    let entries: Vec<String> = addons
        .iter()
        .map(|addon| {
            format!(
                "{}{} v{} by {}\nDetails: <code>.addon {}</code>",
                status_icon(addon),
                addon.name(),
                addon.version(),
                addon.author(),
                addon.name(),
            )
        })
        .collect();
    format!("{} addons:\n{}", listing.title(), entries.join("\n\n"))
}

/// Detail view of one addon. The name is wrapped in zero-width marks so a
/// reply to the message can be traced back to the addon.
pub(crate) fn describe_addon(registry: &AddonRegistry, addon: &Addon) -> String {
    let yes_no = |present: bool| if present { "yes" } else { "no" };
    let (commands, events) = if addon.is_enabled() {
        (
            yes_no(registry.has_command_node(addon)),
            yes_no(registry.has_event_node(addon)),
        )
    } else {
        (UNDECIDABLE, UNDECIDABLE)
    };

    let requirements = addon.requirements();
    let dependencies = if requirements.is_empty() {
        "  Hasn't dependencies".to_string()
    } else {
        requirements
            .iter()
            .map(|r| match &r.version {
                Some(version) => format!("{}=={version}", r.name),
                None => r.name.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n  ")
    };

    format!(
        "Name: \u{200d}{}\u{200c}\n\
         Status: {}\n\
         Version: {}\n\
         Description: {}\n\n\
         Has command manager: {commands}\n\
         Has event manager: {events}\n\
         Dependencies:\n  {dependencies}",
        addon.name(),
        addon.status(),
        addon.version(),
        addon.description().unwrap_or_default(),
    )
}

async fn addon_info(bot: Arc<BotContext>, ctx: HandlerContext) -> DispatchResult<Flow> {
    let name = ctx.argument_text();
    if name.is_empty() {
        ctx.append("Type addon name, to see details").await?;
        return Ok(Flow::Handled);
    }
    let Some(addon) = bot.lookup(name) else {
        ctx.append("Addon not found").await?;
        return Ok(Flow::Handled);
    };
    let text = format!("{}\n\n{TOGGLE_HINT}", describe_addon(bot.registry(), &addon));
    ctx.edit(&text).await?;
    Ok(Flow::Handled)
}

fn is_toggle(pattern: &Regex, update: &Update) -> bool {
    matches!(update.text.as_str(), "+" | "-")
        && update
            .reply_to
            .as_ref()
            .is_some_and(|replied| pattern.is_match(&replied.text))
}

async fn toggle_addon(
    bot: Arc<BotContext>,
    ctx: HandlerContext,
    pattern: Arc<Regex>,
) -> DispatchResult<Flow> {
    let Some(replied) = ctx.update.reply_to.clone() else {
        return Ok(Flow::Skip);
    };
    let Some(name) = pattern
        .captures(&replied.text)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
    else {
        return Ok(Flow::Skip);
    };
    let Some(addon) = bot.lookup(&name) else {
        ctx.append("Addon not found").await?;
        return Ok(Flow::Handled);
    };

    let outcome = if ctx.update.text == "+" {
        let attach_after = !bot.controller.loaded().contains(addon.name());
        bot.controller.enable(&addon, attach_after).await
    } else {
        bot.controller.disable(&addon, true).await
    };

    let detail = format!("{}\n\n{TOGGLE_HINT}", describe_addon(bot.registry(), &addon));
    let detail_ref = MessageRef {
        chat_id: ctx.update.chat_id,
        message_id: replied.message_id,
    };
    ctx.messenger().edit(detail_ref, &detail).await?;

    match outcome {
        Ok(()) => {
            info!(addon = %addon.name(), status = %addon.status(), "Addon toggled");
            ctx.delete().await?;
        },
        Err(e) if e.is_fatal() => return Err(DispatchError::Handler(e.to_string())),
        Err(e) => {
            warn!(addon = %addon.name(), error = %e, "Addon toggle failed");
            ctx.append(&toggle_failure(&e)).await?;
        },
    }
    Ok(Flow::Handled)
}

fn toggle_failure(error: &AddonError) -> String {
    match error {
        AddonError::HookFailed { stage, message, .. } => {
            format!("Addon {stage} failed: {message}")
        },
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use genesis_addons::{AddonStatus, LoadedSet, ModuleCatalog, Requirement, Roots};
    use genesis_dispatch::Dispatcher;
    use genesis_test::{MockModule, RecordingMessenger, status_on_disk, write_manifest};
    use tempfile::TempDir;

    use super::*;
    use crate::accounts::{Account, AccountInfo};

    struct Harness {
        dir: TempDir,
        bot: Arc<BotContext>,
        messenger: RecordingMessenger,
    }

    impl Harness {
        async fn new(catalog: ModuleCatalog) -> Self {
            let dir = TempDir::new().unwrap();
            Self::in_dir(dir, catalog).await
        }

        async fn in_dir(dir: TempDir, catalog: ModuleCatalog) -> Self {
            let registry = Arc::new(AddonRegistry::new(dir.path(), catalog));
            registry.discover().unwrap();
            let controller = Arc::new(LifecycleController::new(
                Arc::clone(&registry),
                Arc::new(LoadedSet::new()),
                Roots::new(),
            ));
            let accounts = Arc::new(AccountManager::default());
            accounts
                .add(Account::new(dir.path().join("account")))
                .resolve_info(AccountInfo {
                    id: 7,
                    username: "kuyu".to_string(),
                    first_name: "Kuyu".to_string(),
                    last_name: None,
                });
            let bot = Arc::new(BotContext {
                name: "Genesis".to_string(),
                version: "1.1.3".to_string(),
                controller: Arc::clone(&controller),
                accounts,
            });
            let core = CoreAddon::new(&bot).unwrap();
            let main = Arc::new(Addon::builtin(CoreAddon::manifest("1.1.3"), Arc::new(core)));
            registry.set_main_addon(Arc::clone(&main)).unwrap();
            controller.load(&main).await.unwrap();
            Self {
                dir,
                bot,
                messenger: RecordingMessenger::new(),
            }
        }

        async fn send(&self, update: Update) {
            let messenger = self.messenger.shared();
            let roots = self.bot.controller.roots();
            Dispatcher::new(Arc::clone(&roots.commands))
                .dispatch(&update, &messenger)
                .await;
            Dispatcher::new(Arc::clone(&roots.events))
                .dispatch(&update, &messenger)
                .await;
        }

        async fn command(&self, text: &str) -> String {
            self.send(Update::outgoing(1, 10, text)).await;
            self.messenger.last_text().unwrap()
        }
    }

    fn weather_catalog(module: &MockModule) -> ModuleCatalog {
        let module = module.clone();
        ModuleCatalog::new().with("weather", move |_| module.as_module())
    }

    #[tokio::test]
    async fn test_loaded_accounts() {
        let h = Harness::new(ModuleCatalog::new()).await;
        assert_eq!(
            h.command(".loaded_accounts").await,
            "Accounts loaded:\n- account kuyu"
        );
    }

    #[tokio::test]
    async fn test_bot_summary_counts_calls() {
        let h = Harness::new(ModuleCatalog::new()).await;
        h.command(".loaded_accounts").await;
        let text = h.command(".bot").await;
        assert!(text.starts_with("Genesis userbot:\n    Version: 1.1.3\n    Name: Genesis\n"));
        assert!(text.contains("Owners: Kuyu(@kuyu:7)"));
        assert!(text.contains("Loaded addons: 0"));
        assert!(text.contains("Included command managers: 2"));
        assert!(text.contains("Included event managers: 2"));
        assert!(text.contains("Total commands call count: 2"));
        assert!(text.ends_with("Top-5 used commands: loaded_accounts(1), bot(1), commands(0), addons(0), addon(0)"));
    }

    #[tokio::test]
    async fn test_bot_is_owner_only() {
        let h = Harness::new(ModuleCatalog::new()).await;
        h.send(Update::incoming(1, 10, ".bot")).await;
        assert!(h.messenger.messages().is_empty());
    }

    #[tokio::test]
    async fn test_addon_detail_and_listing() {
        let dir = TempDir::new().unwrap();
        let weather = MockModule::new("weather").with_command("forecast");
        write_manifest(dir.path(), "weather", AddonStatus::Enabled);
        write_manifest(dir.path(), "legacy", AddonStatus::Disabled);
        let h = Harness::in_dir(dir, weather_catalog(&weather)).await;
        h.bot.controller.load("weather").await.unwrap();

        let detail = h.command(".addon weather").await;
        assert!(detail.starts_with("Name: \u{200d}weather\u{200c}\nStatus: enabled\nVersion: 1.0.0\n"));
        assert!(detail.contains("Has command manager: yes\nHas event manager: no\n"));
        assert!(detail.contains("Dependencies:\n    Hasn't dependencies"));
        assert!(detail.ends_with(TOGGLE_HINT));

        let disabled = h.command(".addon legacy").await;
        assert!(disabled.contains(&format!("Has command manager: {UNDECIDABLE}")));

        let main = h.command(".addon MAIN ADDON").await;
        assert!(main.starts_with("Name: \u{200d}core\u{200c}\n"));

        let loaded = h.command(".addons").await;
        assert_eq!(
            loaded,
            "Loaded addons:\n🟢weather v1.0.0 by tests\nDetails: <code>.addon weather</code>"
        );
        let all = h.command(".addons ALL").await;
        assert!(all.starts_with("All addons:\n🔴legacy"));
        assert!(all.contains("\n\n🟢weather"));

        let refused = h.command(".addons broken").await;
        assert!(refused.ends_with("\n\nNot allowed addon status: broken"));
    }

    #[tokio::test]
    async fn test_commands_listing() {
        let dir = TempDir::new().unwrap();
        let weather = MockModule::new("weather").with_command("forecast");
        write_manifest(dir.path(), "weather", AddonStatus::Enabled);
        write_manifest(dir.path(), "silent", AddonStatus::Enabled);
        let h = Harness::in_dir(dir, weather_catalog(&weather)).await;

        let text = h.command(".commands weather").await;
        assert_eq!(
            text,
            "All commands:\nFrom <b>weather</b>:\n    <b>forecast</b>:\n        \
             <b>Prefixes</b>: .\n        <b>Description</b>: undescribed\n        \
             <b>Arguments</b>: not required\n        <b>Only owner-usable</b>: false\n        \
             <b>Is enabled</b>: true"
        );
        assert!(h.command(".commands silent").await.ends_with("Addon hasn't command manager"));
        assert!(h.command(".commands nope").await.ends_with("Addon not found"));
        assert!(
            h.command(".commands")
                .await
                .ends_with("Please, type addon name after the command")
        );
    }

    #[tokio::test]
    async fn test_toggle_via_reply() {
        let dir = TempDir::new().unwrap();
        let weather = MockModule::new("weather").with_command("forecast");
        write_manifest(dir.path(), "weather", AddonStatus::Enabled);
        let h = Harness::in_dir(dir, weather_catalog(&weather)).await;
        h.bot.controller.load("weather").await.unwrap();

        let detail = h.command(".addon weather").await;
        h.send(Update::outgoing(1, 11, "-").replying_to(10, detail)).await;

        assert_eq!(status_on_disk(h.dir.path(), "weather"), AddonStatus::Disabled);
        assert!(!h.bot.controller.loaded().contains("weather"));
        let edited = h.messenger.last_text().unwrap();
        assert!(edited.contains("Status: disabled"));
        assert_eq!(h.messenger.deleted().len(), 1);

        h.send(Update::outgoing(1, 12, "+").replying_to(10, edited)).await;
        assert_eq!(status_on_disk(h.dir.path(), "weather"), AddonStatus::Enabled);
        assert!(h.bot.controller.loaded().contains("weather"));
    }

    #[tokio::test]
    async fn test_enable_reply_on_loaded_addon_keeps_it_loaded() {
        let dir = TempDir::new().unwrap();
        let weather = MockModule::new("weather").with_command("forecast");
        write_manifest(dir.path(), "weather", AddonStatus::Enabled);
        let h = Harness::in_dir(dir, weather_catalog(&weather)).await;
        h.bot.controller.load("weather").await.unwrap();

        let detail = h.command(".addon weather").await;
        h.send(Update::outgoing(1, 11, "+").replying_to(10, detail)).await;

        assert!(h.bot.controller.loaded().contains("weather"));
        assert_eq!(h.messenger.deleted().len(), 1);
        assert!(h.messenger.last_text().unwrap().contains("Status: enabled"));
        assert_eq!(
            weather.calls(),
            vec![
                genesis_addons::LifecycleHook::Load,
                genesis_addons::LifecycleHook::Enable
            ]
        );
    }

    #[tokio::test]
    async fn test_toggle_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let weather = MockModule::new("weather").failing_on(genesis_addons::LifecycleHook::Enable);
        write_manifest(dir.path(), "weather", AddonStatus::Disabled);
        let h = Harness::in_dir(dir, weather_catalog(&weather)).await;

        let detail = h.command(".addon weather").await;
        h.send(Update::outgoing(1, 11, "+").replying_to(10, detail)).await;

        assert!(!h.bot.controller.loaded().contains("weather"));
        assert!(h.messenger.deleted().is_empty());
        let report = h.messenger.last_text().unwrap();
        assert!(report.starts_with("+\n\nAddon on_enable failed: weather refused on_enable"));
    }

    #[test]
    fn test_toggle_filter() {
        let pattern = Regex::new(ADDON_NAME_PATTERN).unwrap();
        let detail = "Name: \u{200d}weather\u{200c}\nStatus: enabled";
        assert!(is_toggle(&pattern, &Update::outgoing(1, 2, "+").replying_to(1, detail)));
        assert!(!is_toggle(&pattern, &Update::outgoing(1, 2, "+")));
        assert!(!is_toggle(&pattern, &Update::outgoing(1, 2, "x").replying_to(1, detail)));
        assert!(!is_toggle(&pattern, &Update::outgoing(1, 2, "-").replying_to(1, "Name: weather\n")));
    }

    #[test]
    fn test_dependencies_rendering() {
        let registry = AddonRegistry::new("unused", ModuleCatalog::new());
        let mut manifest = AddonManifest::new("deps", "0.1.0");
        manifest.requirements = vec![
            Requirement {
                name: "serde".to_string(),
                version: Some("1.0".to_string()),
            },
            Requirement {
                name: "regex".to_string(),
                version: None,
            },
        ];
        let addon = Addon::new(manifest, "unused/deps".into(), None);
        let text = describe_addon(&registry, &addon);
        assert!(text.ends_with("Dependencies:\n  serde==1.0\n  regex"));
        assert!(text.contains("Description: \n"));
    }

    #[test]
    fn test_listing_parse() {
        assert_eq!("Enabled".parse::<Listing>(), Ok(Listing::Enabled));
        assert_eq!("nope".parse::<Listing>(), Err("nope".to_string()));
    }
}
