//! Addon runtime error types.

use std::path::PathBuf;

/// Errors from addon registry and lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum AddonError {
    /// The addon name does not resolve.
    #[error("addon not found: {0}")]
    NotFound(String),

    /// The addon is in the wrong state for the requested operation.
    #[error("addon {addon} is in the wrong state: {message}")]
    InvalidState {
        /// The addon the operation targeted.
        addon: String,
        /// What was wrong.
        message: String,
    },

    /// An addon-supplied hook, or attaching its node, failed.
    #[error("addon {addon} failed during {stage}: {message}")]
    HookFailed {
        /// The addon whose code failed.
        addon: String,
        /// Where it failed (`on_load`, `attach`, ...).
        stage: String,
        /// Failure reason.
        message: String,
    },

    /// An exclude-style batch was called without any addon.
    #[error("{0}: at least one addon must be passed")]
    MissingArgument(String),

    /// A handle that the registry does not own was passed in.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Failed to parse an addon manifest file.
    #[error("manifest parse error in {path}: {message}")]
    ManifestParseError {
        /// Path to the manifest file.
        path: PathBuf,
        /// Parse error message.
        message: String,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AddonError {
    /// Whether the error is a caller bug rather than an operational failure.
    ///
    /// Batch operations stop on these instead of moving to the next addon.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }
}

/// Result type for addon operations.
pub type AddonResult<T> = Result<T, AddonError>;

/// Error returned by an addon's own lifecycle hook.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct HookError(pub String);

impl From<String> for HookError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for HookError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}
