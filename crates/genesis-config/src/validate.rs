//! Validation of a resolved configuration.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

/// Check the invariants the runtime relies on.
///
/// # Errors
///
/// Returns [`ConfigError::ValidationError`] naming the first offending field.
pub fn validate(config: &Config) -> ConfigResult<()> {
    if config.main.name.trim().is_empty() {
        return Err(invalid("main.name", "must not be empty"));
    }
    if config.main.accounts_count == 0 {
        return Err(invalid("main.accounts_count", "must be at least 1"));
    }
    if config.addons.root.as_os_str().is_empty() {
        return Err(invalid("addons.root", "must not be empty"));
    }
    if config.addons.debounce_ms == 0 && config.addons.watch {
        return Err(invalid("addons.debounce_ms", "must be positive when watching"));
    }
    if let Some(hash) = &config.main.api_hash
        && hash.trim().is_empty()
    {
        return Err(invalid("main.api_hash", "must not be blank when set"));
    }

    let level = config.logging.level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        return Err(invalid(
            "logging.level",
            format!(
                "unknown level '{}', expected one of {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::default_config;

    fn field_of(config: &Config) -> Option<String> {
        match validate(config) {
            Err(ConfigError::ValidationError { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn test_blank_name_rejected() {
        let mut config = default_config().unwrap();
        config.main.name = "  ".to_string();
        assert_eq!(field_of(&config).as_deref(), Some("main.name"));
    }

    #[test]
    fn test_zero_debounce_only_matters_when_watching() {
        let mut config = default_config().unwrap();
        config.addons.debounce_ms = 0;
        assert_eq!(field_of(&config).as_deref(), Some("addons.debounce_ms"));
        config.addons.watch = false;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_level_is_case_insensitive() {
        let mut config = default_config().unwrap();
        config.logging.level = "WARN".to_string();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_blank_api_hash_rejected() {
        let mut config = default_config().unwrap();
        config.main.api_hash = Some(String::new());
        assert_eq!(field_of(&config).as_deref(), Some("main.api_hash"));
    }
}
