//! Restore defaults.
//!
//! Loads `.restore-defaults.json`, expands environment references inside
//! default values, and splits requested placeholders into resolved and
//! still missing.

use crate::models::defaults::{DefaultsConfig, ResolvedDefaults};
use crate::utils::fs::write_atomic;
use crate::{Error, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

fn env_reference_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]*)\}").expect("static regex"))
}

fn defaults_key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\{\{[A-Z_][A-Z0-9_]*\}\}$").expect("static regex"))
}

/// Whether a defaults key has the `{{NAME}}` shape.
pub fn is_valid_defaults_key(key: &str) -> bool {
    defaults_key_regex().is_match(key)
}

/// Expand `${VAR}`, `${VAR:-fallback}` and `${PWD##*/}` using `lookup` for
/// variables and `cwd` for the current directory. Unset variables without a
/// fallback expand to the empty string.
pub fn substitute_with<F>(value: &str, lookup: F, cwd: &Path) -> String
where
    F: Fn(&str) -> Option<String>,
{
    env_reference_regex()
        .replace_all(value, |caps: &regex::Captures<'_>| {
            let expr = caps.get(1).map(|m| m.as_str()).unwrap_or_default();

            if expr == "PWD##*/" {
                return cwd
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
            }

            match expr.split_once(":-") {
                Some((name, fallback)) => lookup(name)
                    .filter(|v| !v.is_empty())
                    .unwrap_or_else(|| fallback.to_string()),
                None => lookup(expr).unwrap_or_default(),
            }
        })
        .into_owned()
}

/// Expand environment references against the process environment.
pub fn substitute_environment_variables(value: &str) -> String {
    let cwd = std::env::current_dir().unwrap_or_default();
    substitute_with(value, |name| std::env::var(name).ok(), &cwd)
}

/// Suggested starter value for a placeholder in a generated defaults file.
fn suggested_default(placeholder: &str) -> String {
    let name = placeholder.trim_matches(|c| c == '{' || c == '}');
    match name {
        "PROJECT_NAME" | "APP_NAME" => "${PWD##*/}".to_string(),
        n if n.contains("EMAIL") => "${GIT_AUTHOR_EMAIL:-}".to_string(),
        n if n.contains("AUTHOR") => "${GIT_AUTHOR_NAME:-}".to_string(),
        n => format!("${{{}}}", n),
    }
}

/// Defaults manager.
pub struct DefaultsManager {
    path: PathBuf,
    config: DefaultsConfig,
}

impl DefaultsManager {
    /// A manager with no defaults loaded yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: DefaultsConfig::default(),
        }
    }

    /// Create a manager from an already-parsed config.
    pub fn with_config(path: impl Into<PathBuf>, config: DefaultsConfig) -> Self {
        Self {
            path: path.into(),
            config,
        }
    }

    /// Loaded configuration.
    pub fn config(&self) -> &DefaultsConfig {
        &self.config
    }

    /// Load the defaults file. A missing file yields empty defaults with
    /// prompting enabled.
    pub async fn load_defaults(&mut self) -> Result<&DefaultsConfig> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No defaults file at {:?}", self.path);
                self.config = DefaultsConfig::default();
                return Ok(&self.config);
            }
            Err(e) => return Err(e.into()),
        };

        let config: DefaultsConfig = serde_json::from_str(&text).map_err(|e| {
            Error::ValidationError(format!("{}: {}", self.path.display(), e))
        })?;

        let invalid: Vec<&str> = config
            .defaults
            .keys()
            .filter(|k| !is_valid_defaults_key(k))
            .map(String::as_str)
            .collect();
        if !invalid.is_empty() {
            return Err(Error::ValidationError(format!(
                "{}: keys must look like {{{{NAME}}}}: {}",
                self.path.display(),
                invalid.join(", ")
            )));
        }

        tracing::info!(
            "Loaded {} default value(s) from {:?}",
            config.defaults.len(),
            self.path
        );
        self.config = config;
        Ok(&self.config)
    }

    /// Split `missing` into placeholders with a non-empty default and the rest.
    pub fn resolve_defaults(&self, missing: &[String]) -> ResolvedDefaults {
        self.resolve_with(missing, substitute_environment_variables)
    }

    /// Like [`resolve_defaults`](Self::resolve_defaults) with a custom expander.
    pub fn resolve_with<F>(&self, missing: &[String], expand: F) -> ResolvedDefaults
    where
        F: Fn(&str) -> String,
    {
        let mut result = ResolvedDefaults::default();

        for placeholder in missing {
            let value = self.config.defaults.get(placeholder).map(|raw| {
                if self.config.environment_variables {
                    expand(raw)
                } else {
                    raw.clone()
                }
            });

            match value {
                Some(v) if !v.trim().is_empty() => {
                    tracing::debug!("Resolved {} from defaults", placeholder);
                    result.resolved.insert(placeholder.clone(), v);
                }
                _ => result.still_missing.push(placeholder.clone()),
            }
        }

        result
    }

    /// Write a starter defaults file for `placeholders`.
    pub async fn generate_defaults_file(&self, placeholders: &[String], force: bool) -> Result<()> {
        if !force && tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Err(Error::FileAlreadyExists(self.path.display().to_string()));
        }

        let mut config = DefaultsConfig::default();
        for placeholder in placeholders.iter().filter(|p| is_valid_defaults_key(p)) {
            config
                .defaults
                .insert(placeholder.clone(), suggested_default(placeholder));
        }

        let json = serde_json::to_string_pretty(&config)?;
        write_atomic(&self.path, json.as_bytes()).await?;
        tracing::info!("Defaults file written to {:?}", self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_substitute_plain_and_fallback() {
        let lookup = env(&[("ACCOUNT", "abc"), ("EMPTY", "")]);
        let cwd = Path::new("/work/acme-app");

        assert_eq!(substitute_with("${ACCOUNT}", &lookup, cwd), "abc");
        assert_eq!(substitute_with("id-${ACCOUNT}-x", &lookup, cwd), "id-abc-x");
        assert_eq!(substitute_with("${MISSING:-fallback}", &lookup, cwd), "fallback");
        assert_eq!(substitute_with("${EMPTY:-fallback}", &lookup, cwd), "fallback");
        assert_eq!(substitute_with("${ACCOUNT:-fallback}", &lookup, cwd), "abc");
        assert_eq!(substitute_with("${MISSING}", &lookup, cwd), "");
        assert_eq!(substitute_with("${PWD##*/}", &lookup, cwd), "acme-app");
        assert_eq!(substitute_with("no refs", &lookup, cwd), "no refs");
    }

    #[test]
    fn test_resolve_splits_missing() {
        let mut config = DefaultsConfig::default();
        config
            .defaults
            .insert("{{ACCOUNT_ID}}".to_string(), "${CF_ACCOUNT}".to_string());
        config
            .defaults
            .insert("{{EMPTY}}".to_string(), "${UNSET}".to_string());
        let manager = DefaultsManager::with_config("unused.json", config);

        let lookup = env(&[("CF_ACCOUNT", "0123")]);
        let result = manager.resolve_with(
            &[
                "{{ACCOUNT_ID}}".to_string(),
                "{{EMPTY}}".to_string(),
                "{{OTHER}}".to_string(),
            ],
            |v| substitute_with(v, &lookup, Path::new("/x")),
        );

        assert_eq!(result.resolved.get("{{ACCOUNT_ID}}").map(String::as_str), Some("0123"));
        assert_eq!(result.still_missing, vec!["{{EMPTY}}", "{{OTHER}}"]);
    }

    #[test]
    fn test_expansion_disabled_keeps_raw_value() {
        let mut config = DefaultsConfig::default();
        config.environment_variables = false;
        config
            .defaults
            .insert("{{NAME}}".to_string(), "${USER}".to_string());
        let manager = DefaultsManager::with_config("unused.json", config);

        let result = manager.resolve_with(&["{{NAME}}".to_string()], |_| String::new());
        assert_eq!(result.resolved.get("{{NAME}}").map(String::as_str), Some("${USER}"));
    }

    #[tokio::test]
    async fn test_missing_file_yields_empty_defaults() {
        let dir = TempDir::new().unwrap();
        let mut manager = DefaultsManager::new(dir.path().join(".restore-defaults.json"));
        let config = manager.load_defaults().await.unwrap();
        assert!(config.defaults.is_empty());
        assert!(config.prompt_for_missing);
    }

    #[tokio::test]
    async fn test_invalid_keys_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".restore-defaults.json");
        std::fs::write(&path, r#"{"defaults": {"project_name": "x"}}"#).unwrap();

        let mut manager = DefaultsManager::new(&path);
        assert!(matches!(
            manager.load_defaults().await,
            Err(Error::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_generate_refuses_overwrite_unless_forced() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".restore-defaults.json");
        let manager = DefaultsManager::new(&path);
        let placeholders = vec!["{{PROJECT_NAME}}".to_string(), "{{ACCOUNT_ID}}".to_string()];

        manager.generate_defaults_file(&placeholders, false).await.unwrap();
        let written: DefaultsConfig =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.defaults["{{PROJECT_NAME}}"], "${PWD##*/}");
        assert_eq!(written.defaults["{{ACCOUNT_ID}}"], "${ACCOUNT_ID}");

        assert!(matches!(
            manager.generate_defaults_file(&placeholders, false).await,
            Err(Error::FileAlreadyExists(_))
        ));
        assert!(manager.generate_defaults_file(&placeholders, true).await.is_ok());
    }
}
