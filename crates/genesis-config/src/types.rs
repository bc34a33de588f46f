//! Configuration types, one struct per `genesis.toml` section.

use std::path::PathBuf;
use std::time::Duration;

use genesis_telemetry::LogConfig;
use serde::{Deserialize, Serialize};

/// The fully resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// `[main]`: identity and account settings.
    pub main: MainConfig,
    /// `[addons]`: where addons live and how they are watched.
    pub addons: AddonsConfig,
    /// `[logging]`: subscriber setup.
    pub logging: LogConfig,
}

impl Config {
    /// Runtime version reported by the `bot` command.
    #[must_use]
    pub fn version(&self) -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}

/// `[main]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MainConfig {
    /// Display name of the bot.
    pub name: String,
    /// Number of accounts to run.
    pub accounts_count: usize,
    /// Directory holding per-account session files.
    pub sessions_root: PathBuf,
    /// Protocol client application id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_id: Option<i64>,
    /// Protocol client application hash.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_hash: Option<String>,
}

/// `[addons]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonsConfig {
    /// Directory with one subdirectory per addon.
    pub root: PathBuf,
    /// Watch the root and apply manifest changes without a restart.
    pub watch: bool,
    /// Debounce window for file changes, in milliseconds.
    pub debounce_ms: u64,
}

impl AddonsConfig {
    /// The debounce window as a [`Duration`].
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}
