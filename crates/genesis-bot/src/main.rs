//! Genesis - hot-reloadable addon runtime for chat userbots.
//!
//! `genesis run` starts the runtime on a console client. `genesis addons`
//! lists the addons on disk without starting anything, and `genesis create`
//! scaffolds a new addon directory.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use genesis_addons::{AddonManifest, AddonRegistry, AddonStatus, ModuleCatalog, save_manifest};
use genesis_config::Config;

mod accounts;
mod console;
mod core_addon;
mod runtime;

use core_addon::{Listing, status_icon};

/// Genesis - hot-reloadable addon runtime
#[derive(Parser)]
#[command(name = "genesis")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "GENESIS_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the runtime (default)
    Run,

    /// List addons found on disk
    Addons {
        /// Which addons to show
        #[arg(short, long, value_enum, default_value_t = Listing::All)]
        status: Listing,
    },

    /// Scaffold a new addon
    Create {
        /// Addon name, also used as its directory name
        #[arg(short, long)]
        name: String,

        /// Addon version
        #[arg(long, default_value = "0.1.0")]
        version: String,

        /// Addon author
        #[arg(short, long, default_value = "")]
        author: String,

        /// Addon description
        #[arg(short, long)]
        description: Option<String>,

        /// Initial status
        #[arg(short, long, value_enum, default_value_t = InitialStatus::Enabled)]
        status: InitialStatus,

        /// Directory to create the addon in (defaults to the addons root)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum InitialStatus {
    /// Loaded on the next start
    Enabled,
    /// Left alone until enabled
    Disabled,
}

impl From<InitialStatus> for AddonStatus {
    fn from(status: InitialStatus) -> Self {
        match status {
            InitialStatus::Enabled => Self::Enabled,
            InitialStatus::Disabled => Self::Disabled,
        }
    }
}

fn list_addons(config: &Config, listing: Listing) -> Result<()> {
    let registry = AddonRegistry::new(&config.addons.root, ModuleCatalog::new());
    registry
        .discover()
        .with_context(|| format!("reading {}", config.addons.root.display()))?;

    let addons = match listing {
        Listing::Loaded => {
            println!("Nothing is loaded while the runtime is stopped");
            return Ok(());
        },
        Listing::Enabled => registry.enabled(),
        Listing::Disabled => registry.disabled(),
        Listing::All => registry.all(),
    };
    if addons.is_empty() {
        println!("No addons in {}", config.addons.root.display());
    }
    for addon in addons {
        println!(
            "{}{} v{} by {}",
            status_icon(&addon),
            addon.name(),
            addon.version(),
            addon.author()
        );
    }
    Ok(())
}

fn create_addon(root: &Path, manifest: &AddonManifest) -> Result<PathBuf> {
    let dir = root.join(&manifest.name);
    if dir.exists() {
        bail!("{} already exists", dir.display());
    }
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    save_manifest(&dir, manifest)?;
    Ok(dir)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = genesis_config::load(cli.config.as_deref()).context("loading configuration")?;

    let mut log_config = config.logging.clone();
    if cli.verbose {
        log_config.level = "debug".to_string();
    }
    if let Err(e) = genesis_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => runtime::run(&config).await,
        Commands::Addons { status } => list_addons(&config, status),
        Commands::Create {
            name,
            version,
            author,
            description,
            status,
            path,
        } => {
            let mut manifest = AddonManifest::new(name, version)
                .with_author(author)
                .with_status(status.into());
            manifest.description = description;
            let root = path.unwrap_or_else(|| config.addons.root.clone());
            let dir = create_addon(&root, &manifest)?;
            println!("Created addon {} in {}", manifest.name, dir.display());
            Ok(())
        },
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_accepts_config_after_subcommand() {
        let cli = Cli::try_parse_from(["genesis", "run", "--config", "bot.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("bot.toml")));
        assert!(matches!(cli.command, Some(Commands::Run)));
    }

    #[test]
    fn test_addons_status_values() {
        let cli = Cli::try_parse_from(["genesis", "addons", "--status", "disabled"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Addons {
                status: Listing::Disabled
            })
        ));
        assert!(Cli::try_parse_from(["genesis", "addons", "--status", "bogus"]).is_err());
    }

    #[test]
    fn test_create_addon_writes_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = AddonManifest::new("weather", "0.1.0")
            .with_author("kuyu")
            .with_status(AddonStatus::Disabled);
        let addon_dir = create_addon(dir.path(), &manifest).unwrap();

        let written =
            genesis_addons::load_manifest(&addon_dir.join(genesis_addons::MANIFEST_FILE_NAME))
                .unwrap();
        assert_eq!(written, manifest);
        assert!(create_addon(dir.path(), &manifest).is_err());
    }
}
