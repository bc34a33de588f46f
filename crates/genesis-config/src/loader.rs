//! Config file discovery and layered loading.
//!
//! 1. Parse embedded `defaults.toml` → base
//! 2. Merge the config file (explicit path, else `./genesis.toml` if present)
//! 3. Apply env var fallbacks for fields the file did not set
//! 4. Deserialize merged tree → [`Config`]
//! 5. Validate

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{FieldSources, deep_merge};
use crate::types::Config;
use crate::validate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// File looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "genesis.toml";

/// Load the configuration using the process environment.
///
/// An explicit `path` must exist. Without one, `./genesis.toml` is used if
/// present and the defaults otherwise.
///
/// # Errors
///
/// Returns a [`ConfigError`] if a file is unreadable or malformed, an env
/// var cannot be applied, or the result fails validation.
pub fn load(path: Option<&Path>) -> ConfigResult<Config> {
    load_with_env(path, &collect_env_vars())
}

/// Load the configuration with an explicit environment.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_env<S: ::std::hash::BuildHasher>(
    path: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<Config> {
    let mut merged = defaults()?;
    let mut sources = FieldSources::new();

    let file = match path {
        Some(explicit) => Some((read_file(explicit)?, explicit.to_path_buf())),
        None => {
            let implicit = PathBuf::from(DEFAULT_CONFIG_FILE);
            if implicit.is_file() {
                Some((read_file(&implicit)?, implicit))
            } else {
                None
            }
        },
    };

    if let Some((overlay, file_path)) = file {
        deep_merge(&mut merged, &overlay, "", &mut sources);
        info!(path = %file_path.display(), fields = sources.len(), "loaded config file");
    } else {
        debug!("no config file, using defaults");
    }

    let applied = apply_env_fallbacks(&mut merged, &sources, env_vars)?;
    if applied > 0 {
        debug!(count = applied, "applied env var fallbacks");
    }

    let config: Config = merged.try_into().map_err(|e| ConfigError::ParseError {
        path: "<merged config>".to_owned(),
        source: e,
    })?;
    validate(&config)?;
    Ok(config)
}

/// The built-in defaults as a [`Config`].
///
/// # Errors
///
/// Only fails if the embedded defaults are broken.
pub fn default_config() -> ConfigResult<Config> {
    defaults()?
        .try_into()
        .map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })
}

fn defaults() -> ConfigResult<toml::Value> {
    toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
        path: "<embedded defaults>".to_owned(),
        source: e,
    })
}

fn read_file(path: &Path) -> ConfigResult<toml::Value> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })
}
