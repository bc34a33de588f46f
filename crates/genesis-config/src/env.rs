//! Environment variable fallbacks.
//!
//! Env vars are **fallback**, not override: they only apply to fields that
//! no config file set.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::merge::FieldSources;

/// Mapping from environment variable name to config field path.
struct EnvMapping {
    var_name: &'static str,
    field_path: &'static str,
    kind: ValueKind,
}

#[derive(Clone, Copy)]
enum ValueKind {
    Text,
    Integer,
}

/// All supported `GENESIS_*` env var mappings.
const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        var_name: "GENESIS_NAME",
        field_path: "main.name",
        kind: ValueKind::Text,
    },
    EnvMapping {
        var_name: "GENESIS_ACCOUNTS_COUNT",
        field_path: "main.accounts_count",
        kind: ValueKind::Integer,
    },
    EnvMapping {
        var_name: "GENESIS_API_ID",
        field_path: "main.api_id",
        kind: ValueKind::Integer,
    },
    EnvMapping {
        var_name: "GENESIS_API_HASH",
        field_path: "main.api_hash",
        kind: ValueKind::Text,
    },
    EnvMapping {
        var_name: "GENESIS_ADDONS_ROOT",
        field_path: "addons.root",
        kind: ValueKind::Text,
    },
    EnvMapping {
        var_name: "GENESIS_LOG_LEVEL",
        field_path: "logging.level",
        kind: ValueKind::Text,
    },
];

/// Collect the process environment.
#[must_use]
pub(crate) fn collect_env_vars() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Apply env var fallbacks to fields no config file set.
///
/// Returns the number of env vars applied.
///
/// # Errors
///
/// Returns [`ConfigError::EnvError`] if a numeric field gets a value that
/// does not parse as an integer.
pub(crate) fn apply_env_fallbacks<S: ::std::hash::BuildHasher>(
    merged: &mut toml::Value,
    sources: &FieldSources,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<usize> {
    let mut count: usize = 0;

    for mapping in ENV_MAPPINGS {
        if sources.contains(mapping.field_path) {
            continue;
        }
        let Some(raw) = env_vars.get(mapping.var_name) else {
            continue;
        };

        let value = match mapping.kind {
            ValueKind::Text => toml::Value::String(raw.clone()),
            ValueKind::Integer => {
                let parsed = raw.trim().parse::<i64>().map_err(|e| ConfigError::EnvError {
                    var_name: mapping.var_name.to_string(),
                    message: format!("expected an integer: {e}"),
                })?;
                toml::Value::Integer(parsed)
            },
        };

        debug!(
            var = mapping.var_name,
            field = mapping.field_path,
            "applying env var fallback"
        );
        set_field(merged, mapping.field_path, value);
        count = count.saturating_add(1);
    }

    Ok(count)
}

/// Set a dotted-path field, creating intermediate tables as needed.
fn set_field(root: &mut toml::Value, path: &str, value: toml::Value) {
    let mut current = root;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let Some(table) = current.as_table_mut() else {
            return;
        };
        if segments.peek().is_none() {
            table.insert(segment.to_string(), value);
            return;
        }
        current = table
            .entry(segment.to_string())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_fallback_fills_unset_fields_only() {
        let mut merged: toml::Value = toml::from_str("[main]\nname = \"file\"").unwrap();
        let sources = FieldSources::from(["main.name".to_string()]);
        let vars = env(&[
            ("GENESIS_NAME", "env"),
            ("GENESIS_ACCOUNTS_COUNT", "3"),
            ("GENESIS_LOG_LEVEL", "debug"),
        ]);

        let applied = apply_env_fallbacks(&mut merged, &sources, &vars).unwrap();
        assert_eq!(applied, 2);
        assert_eq!(merged["main"]["name"].as_str(), Some("file"));
        assert_eq!(merged["main"]["accounts_count"].as_integer(), Some(3));
        assert_eq!(merged["logging"]["level"].as_str(), Some("debug"));
    }

    #[test]
    fn test_non_numeric_count_is_rejected() {
        let mut merged = toml::Value::Table(toml::map::Map::new());
        let vars = env(&[("GENESIS_API_ID", "abc")]);
        let err = apply_env_fallbacks(&mut merged, &FieldSources::new(), &vars).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::EnvError { ref var_name, .. } if var_name == "GENESIS_API_ID"
        ));
    }
}
