//! Configuration model.

use super::undo_log::FileCategory;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default size threshold above which file content is not stored (1 MiB).
pub const DEFAULT_MAX_CONTENT_SIZE: u64 = 1024 * 1024;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Categorizer configuration.
    #[serde(default)]
    pub categorizer: CategorizerConfig,
    /// Restore configuration.
    #[serde(default)]
    pub restore: RestoreConfig,
}

/// Categorizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorizerConfig {
    /// Files larger than this are recorded without content.
    #[serde(default = "default_max_content_size")]
    pub max_content_size: u64,
    /// Extra rules appended to the built-in rule set.
    #[serde(default)]
    pub custom_rules: Vec<CustomRuleConfig>,
}

/// A user-supplied categorization rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomRuleConfig {
    /// Category the patterns map to.
    pub category: FileCategory,
    /// Exact names, `dir/` prefixes, or globs.
    pub patterns: Vec<String>,
    /// Whether content is stored for matching files.
    #[serde(default)]
    pub store_content: Option<bool>,
    /// Command that regenerates matching paths.
    #[serde(default)]
    pub regeneration_command: Option<String>,
}

/// Restore configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreConfig {
    /// Backup directory, relative to the project root.
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,
    /// Keep backups after a successful restore.
    #[serde(default = "default_true")]
    pub keep_backups: bool,
    /// Back up files before overwriting them.
    #[serde(default = "default_true")]
    pub create_backups: bool,
}

impl Default for CategorizerConfig {
    fn default() -> Self {
        Self {
            max_content_size: DEFAULT_MAX_CONTENT_SIZE,
            custom_rules: Vec::new(),
        }
    }
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            backup_dir: default_backup_dir(),
            keep_backups: true,
            create_backups: true,
        }
    }
}

fn default_max_content_size() -> u64 {
    DEFAULT_MAX_CONTENT_SIZE
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from(".restore-backups")
}

fn default_true() -> bool {
    true
}

/// Get the configuration directory path.
fn dirs_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("templatize")
}

/// Load configuration from file.
pub fn load_config() -> Config {
    let config_path = dirs_config_path().join("config.toml");

    if config_path.exists() {
        match std::fs::read_to_string(&config_path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => return config,
                Err(e) => tracing::warn!("Ignoring invalid config {:?}: {}", config_path, e),
            },
            Err(e) => tracing::warn!("Cannot read config {:?}: {}", config_path, e),
        }
    }

    Config::default()
}
