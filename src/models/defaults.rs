//! Restore defaults file model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default defaults file name, relative to the project root.
pub const DEFAULT_DEFAULTS_FILE: &str = ".restore-defaults.json";

/// Current defaults file version.
pub const DEFAULTS_VERSION: &str = "1.0.0";

/// Defaults file structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultsConfig {
    /// File version.
    #[serde(default = "default_version")]
    pub version: String,
    /// Placeholder -> default value (may reference environment variables).
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,
    /// Whether `${VAR}` references are expanded.
    #[serde(default = "default_true")]
    pub environment_variables: bool,
    /// Whether unresolved placeholders are prompted for.
    #[serde(default = "default_true")]
    pub prompt_for_missing: bool,
}

fn default_version() -> String {
    DEFAULTS_VERSION.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            defaults: BTreeMap::new(),
            environment_variables: true,
            prompt_for_missing: true,
        }
    }
}

/// Split of requested placeholders into resolved and unresolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedDefaults {
    pub resolved: BTreeMap<String, String>,
    pub still_missing: Vec<String>,
}
