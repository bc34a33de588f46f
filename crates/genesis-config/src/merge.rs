//! Deep merge of TOML trees with tracking of the fields a file set.

use std::collections::HashSet;

/// Dotted paths of the leaf fields set by a config file.
pub(crate) type FieldSources = HashSet<String>;

/// Merge `overlay` into `base`.
///
/// Tables merge key by key; any other value in `overlay` replaces the one in
/// `base`. Every replaced leaf is recorded in `sources` under its dotted
/// path, prefixed by `prefix`.
pub(crate) fn deep_merge(
    base: &mut toml::Value,
    overlay: &toml::Value,
    prefix: &str,
    sources: &mut FieldSources,
) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_value) in overlay_table {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                match base_table.get_mut(key) {
                    Some(base_value) if base_value.is_table() && overlay_value.is_table() => {
                        deep_merge(base_value, overlay_value, &path, sources);
                    },
                    _ => {
                        base_table.insert(key.clone(), overlay_value.clone());
                        sources.insert(path);
                    },
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
            if !prefix.is_empty() {
                sources.insert(prefix.to_string());
            }
        },
    }
}
