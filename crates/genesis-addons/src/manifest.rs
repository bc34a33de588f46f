//! Addon manifest types.
//!
//! Every addon directory carries an `addon.toml` describing the addon's
//! identity and its persisted status. The status field is the only part the
//! runtime ever writes back.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Persisted enabled/disabled status of an addon.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddonStatus {
    /// The addon may be loaded.
    #[default]
    Enabled,
    /// The addon must not be loaded.
    Disabled,
}

impl AddonStatus {
    /// Whether this is [`AddonStatus::Enabled`].
    #[must_use]
    pub fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

impl fmt::Display for AddonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enabled => write!(f, "enabled"),
            Self::Disabled => write!(f, "disabled"),
        }
    }
}

/// A package the addon depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Package name.
    pub name: String,
    /// Version constraint, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}({version})", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// An addon manifest loaded from `addon.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonManifest {
    /// Unique, case-sensitive addon name.
    pub name: String,
    /// Version string.
    pub version: String,
    /// Author shown in listings.
    #[serde(default)]
    pub author: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Persisted status.
    #[serde(default)]
    pub status: AddonStatus,
    /// Packages the addon depends on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<Requirement>,
}

impl AddonManifest {
    /// A minimal enabled manifest.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            author: String::new(),
            description: None,
            status: AddonStatus::Enabled,
            requirements: Vec::new(),
        }
    }

    /// Set the author.
    #[must_use]
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the status.
    #[must_use]
    pub fn with_status(mut self, status: AddonStatus) -> Self {
        self.status = status;
        self
    }
}
