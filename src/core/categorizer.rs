//! File categorization module.
//!
//! Decides how each path is treated on restore:
//! - generated: rebuilt by a command (node_modules, dist)
//! - userCreated: local-only files whose content must come back (.env)
//! - templateFiles: files the template adds, left untouched
//! - modified: project files rewritten with placeholders
//!
//! Categories are checked in a fixed precedence and the first match wins.
//! Anything unmatched is treated as userCreated.

use crate::models::config::{CategorizerConfig, CustomRuleConfig, DEFAULT_MAX_CONTENT_SIZE};
use crate::models::undo_log::{FileCategory, RestorationAction};
use crate::utils::fs::path_size;
use std::path::{Component, Path, PathBuf};

/// Category precedence used when several categories match.
const PRECEDENCE: [FileCategory; 4] = [
    FileCategory::Generated,
    FileCategory::UserCreated,
    FileCategory::TemplateFiles,
    FileCategory::Modified,
];

/// A single path pattern.
#[derive(Debug, Clone)]
pub enum RulePattern {
    /// Matches the whole relative path or the file name.
    Exact(String),
    /// Matches any path that has this directory as a component.
    Directory(String),
    /// Matches the relative path or the file name against a glob.
    Glob(glob::Pattern),
}

impl RulePattern {
    /// Parse a rule string: `name/` is a directory, `*`/`?`/`[` make a glob.
    pub fn parse(rule: &str) -> Option<Self> {
        let rule = rule.trim();
        if rule.is_empty() {
            return None;
        }
        if let Some(dir) = rule.strip_suffix('/') {
            return Some(RulePattern::Directory(dir.to_string()));
        }
        if rule.contains(['*', '?', '[']) {
            return glob::Pattern::new(rule).ok().map(RulePattern::Glob);
        }
        Some(RulePattern::Exact(rule.to_string()))
    }

    /// Check whether a relative path matches.
    pub fn matches(&self, path: &Path) -> bool {
        let normalized = normalize(path);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match self {
            RulePattern::Exact(name) => normalized == *name || file_name == *name,
            RulePattern::Directory(dir) => {
                if dir.contains('/') {
                    normalized == *dir || normalized.starts_with(&format!("{}/", dir))
                } else {
                    path.components().any(|c| match c {
                        Component::Normal(s) => s.to_string_lossy() == *dir,
                        _ => false,
                    })
                }
            }
            RulePattern::Glob(pattern) => {
                pattern.matches(&normalized) || pattern.matches(&file_name)
            }
        }
    }
}

/// Forward-slash form of a relative path, without a leading `./`.
fn normalize(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// A pattern with an optional regeneration command.
#[derive(Debug, Clone)]
pub struct Rule {
    pub pattern: RulePattern,
    pub regeneration_command: Option<String>,
}

/// Ordered rules for one category.
#[derive(Debug, Clone)]
pub struct CategoryRules {
    pub category: FileCategory,
    pub rules: Vec<Rule>,
    /// Whether matching files have their content stored.
    pub store_content: bool,
}

/// The full set of categorization rules.
#[derive(Debug, Clone, Default)]
pub struct CategorizationRuleSet {
    sets: Vec<CategoryRules>,
}

impl CategorizationRuleSet {
    /// An empty rule set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in rules for the supported project types.
    pub fn builtin() -> Self {
        let mut set = Self::empty();

        set.push(
            FileCategory::Generated,
            false,
            &[
                ("node_modules/", Some("npm install")),
                ("package-lock.json", Some("npm install")),
                ("yarn.lock", Some("yarn install")),
                ("pnpm-lock.yaml", Some("pnpm install")),
                (".wrangler/", Some("npx wrangler dev")),
                ("dist/", Some("npm run build")),
                ("build/", Some("npm run build")),
                (".next/", Some("npm run build")),
                (".turbo/", None),
                (".cache/", None),
                ("coverage/", Some("npm test -- --coverage")),
                ("*.log", None),
                (".DS_Store", None),
            ],
        );

        set.push(
            FileCategory::UserCreated,
            true,
            &[
                (".env", None),
                (".env.*", None),
                (".dev.vars", None),
                ("*.local", None),
                ("*.local.json", None),
                ("*.pem", None),
                ("*.sqlite", None),
                ("*.db", None),
                (".vscode/", None),
                (".idea/", None),
            ],
        );

        set.push(
            FileCategory::TemplateFiles,
            false,
            &[
                (".template-undo.json", None),
                (".restore-defaults.json", None),
                ("template.json", None),
                (".templaterc", None),
                ("setup.sh", None),
                ("setup.ps1", None),
                ("SETUP.md", None),
                ("TEMPLATE.md", None),
                (".restore-backups/", None),
            ],
        );

        set.push(
            FileCategory::Modified,
            true,
            &[
                ("package.json", None),
                ("wrangler.toml", None),
                ("wrangler.json", None),
                ("wrangler.jsonc", None),
                ("README.md", None),
                ("index.html", None),
                ("vite.config.*", None),
                ("*.config.js", None),
                ("*.config.ts", None),
                ("drizzle.config.*", None),
                (".github/workflows/", None),
            ],
        );

        set
    }

    fn push(
        &mut self,
        category: FileCategory,
        store_content: bool,
        rules: &[(&str, Option<&str>)],
    ) {
        let rules = rules
            .iter()
            .filter_map(|(pattern, command)| {
                RulePattern::parse(pattern).map(|pattern| Rule {
                    pattern,
                    regeneration_command: command.map(str::to_string),
                })
            })
            .collect();
        self.sets.push(CategoryRules {
            category,
            rules,
            store_content,
        });
    }

    /// Compose with additional rules. Existing rules are kept.
    pub fn with_rules(mut self, extra: CategoryRules) -> Self {
        match self.sets.iter_mut().find(|s| s.category == extra.category) {
            Some(existing) => existing.rules.extend(extra.rules),
            None => self.sets.push(extra),
        }
        self
    }

    /// Compose with rules from the config file.
    pub fn with_custom_rules(self, custom: &[CustomRuleConfig]) -> Self {
        custom.iter().fold(self, |set, rule| {
            let store_content = rule
                .store_content
                .or_else(|| set.rules_for(rule.category).map(|r| r.store_content))
                .unwrap_or(true);
            let rules = rule
                .patterns
                .iter()
                .filter_map(|p| {
                    let parsed = RulePattern::parse(p);
                    if parsed.is_none() {
                        tracing::warn!("Ignoring invalid categorization pattern: {:?}", p);
                    }
                    parsed
                })
                .map(|pattern| Rule {
                    pattern,
                    regeneration_command: rule.regeneration_command.clone(),
                })
                .collect();
            set.with_rules(CategoryRules {
                category: rule.category,
                rules,
                store_content,
            })
        })
    }

    /// Rules registered for a category.
    pub fn rules_for(&self, category: FileCategory) -> Option<&CategoryRules> {
        self.sets.iter().find(|s| s.category == category)
    }

    /// First matching category in precedence order, with the matching rule.
    fn find_match(&self, path: &Path) -> Option<(&CategoryRules, &Rule)> {
        PRECEDENCE.iter().find_map(|category| {
            let set = self.rules_for(*category)?;
            set.rules
                .iter()
                .find(|rule| rule.pattern.matches(path))
                .map(|rule| (set, rule))
        })
    }
}

/// Categorization result for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Categorization {
    pub category: FileCategory,
    pub store_content: bool,
    pub action: RestorationAction,
    pub regeneration_command: Option<String>,
    pub file_size: u64,
    pub is_directory: bool,
    pub warnings: Vec<String>,
}

/// File categorizer.
pub struct FileCategorizer {
    root: PathBuf,
    rules: CategorizationRuleSet,
    max_content_size: u64,
}

impl FileCategorizer {
    /// Create a categorizer with the built-in rules.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_rules(root, CategorizationRuleSet::builtin(), DEFAULT_MAX_CONTENT_SIZE)
    }

    /// Create a categorizer with an explicit rule set.
    pub fn with_rules(
        root: impl Into<PathBuf>,
        rules: CategorizationRuleSet,
        max_content_size: u64,
    ) -> Self {
        Self {
            root: root.into(),
            rules,
            max_content_size,
        }
    }

    /// Create a categorizer from the config file section.
    pub fn from_config(root: impl Into<PathBuf>, config: &CategorizerConfig) -> Self {
        let rules = CategorizationRuleSet::builtin().with_custom_rules(&config.custom_rules);
        Self::with_rules(root, rules, config.max_content_size)
    }

    /// Project root the categorizer inspects.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether content of this size is too large to store.
    pub fn exceeds_size_limit(&self, size: u64) -> bool {
        size > self.max_content_size
    }

    /// Category of a relative path, without touching the filesystem.
    pub fn category_of(&self, path: &Path) -> FileCategory {
        self.rules
            .find_match(path)
            .map(|(set, _)| set.category)
            .unwrap_or(FileCategory::UserCreated)
    }

    /// Categorize a path relative to the project root.
    pub async fn categorize(&self, path: &Path) -> Categorization {
        let mut warnings = Vec::new();

        let (category, category_stores, regeneration_command) = match self.rules.find_match(path)
        {
            Some((set, rule)) => (
                set.category,
                set.store_content,
                rule.regeneration_command.clone(),
            ),
            None => (FileCategory::UserCreated, true, None),
        };

        let full_path = self.root.join(path);
        let (is_directory, file_size) = match tokio::fs::metadata(&full_path).await {
            Ok(meta) if meta.is_dir() => {
                let dir = full_path.clone();
                let size = tokio::task::spawn_blocking(move || path_size(&dir))
                    .await
                    .unwrap_or(0);
                (true, size)
            }
            Ok(meta) => (false, meta.len()),
            Err(e) => {
                warnings.push(format!("Cannot inspect {}: {}", path.display(), e));
                (false, 0)
            }
        };

        let mut store_content = category_stores;
        if is_directory {
            store_content = false;
        } else if store_content && self.exceeds_size_limit(file_size) {
            warnings.push(format!(
                "{} is {} bytes, above the {} byte limit; content not stored",
                path.display(),
                file_size,
                self.max_content_size
            ));
            store_content = false;
        }

        tracing::debug!("Categorized {:?} as {} (store: {})", path, category, store_content);

        Categorization {
            category,
            store_content,
            action: category.default_action(),
            regeneration_command,
            file_size,
            is_directory,
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rule_pattern_parse() {
        assert!(matches!(RulePattern::parse("dist/"), Some(RulePattern::Directory(_))));
        assert!(matches!(RulePattern::parse("*.log"), Some(RulePattern::Glob(_))));
        assert!(matches!(RulePattern::parse(".env"), Some(RulePattern::Exact(_))));
        assert!(RulePattern::parse("  ").is_none());
    }

    #[test]
    fn test_builtin_categories() {
        let categorizer = FileCategorizer::new("/tmp");
        let cases = [
            ("node_modules", FileCategory::Generated),
            ("node_modules/react/index.js", FileCategory::Generated),
            ("server.log", FileCategory::Generated),
            (".env", FileCategory::UserCreated),
            (".env.production", FileCategory::UserCreated),
            (".dev.vars", FileCategory::UserCreated),
            ("SETUP.md", FileCategory::TemplateFiles),
            ("package.json", FileCategory::Modified),
            ("wrangler.toml", FileCategory::Modified),
            ("vite.config.ts", FileCategory::Modified),
            (".github/workflows/deploy.yml", FileCategory::Modified),
            ("src/index.ts", FileCategory::UserCreated),
        ];
        for (path, expected) in cases {
            assert_eq!(categorizer.category_of(Path::new(path)), expected, "{}", path);
        }
    }

    #[test]
    fn test_generated_takes_precedence() {
        // package.json inside node_modules is generated, not modified
        let categorizer = FileCategorizer::new("/tmp");
        assert_eq!(
            categorizer.category_of(Path::new("node_modules/foo/package.json")),
            FileCategory::Generated
        );
    }

    #[test]
    fn test_custom_rules_are_additive() {
        let custom = vec![CustomRuleConfig {
            category: FileCategory::Generated,
            patterns: vec![".svelte-kit/".to_string()],
            store_content: None,
            regeneration_command: Some("npm run build".to_string()),
        }];
        let rules = CategorizationRuleSet::builtin().with_custom_rules(&custom);
        let categorizer = FileCategorizer::with_rules("/tmp", rules, 1024);

        assert_eq!(
            categorizer.category_of(Path::new(".svelte-kit/output")),
            FileCategory::Generated
        );
        assert_eq!(
            categorizer.category_of(Path::new("node_modules")),
            FileCategory::Generated
        );
    }

    #[tokio::test]
    async fn test_categorize_generated_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        std::fs::write(dir.path().join("node_modules/pkg/index.js"), "x").unwrap();

        let categorizer = FileCategorizer::new(dir.path());
        let result = categorizer.categorize(Path::new("node_modules")).await;

        assert_eq!(result.category, FileCategory::Generated);
        assert_eq!(result.action, RestorationAction::Regenerate);
        assert_eq!(result.regeneration_command.as_deref(), Some("npm install"));
        assert!(result.is_directory);
        assert!(!result.store_content);
        assert_eq!(result.file_size, 1);
    }

    #[tokio::test]
    async fn test_large_file_content_not_stored() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".env"), "A".repeat(64)).unwrap();

        let categorizer =
            FileCategorizer::with_rules(dir.path(), CategorizationRuleSet::builtin(), 16);
        let result = categorizer.categorize(Path::new(".env")).await;

        assert_eq!(result.category, FileCategory::UserCreated);
        assert!(!result.store_content);
        assert_eq!(result.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_unmatched_file_defaults_to_user_created() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "hi").unwrap();

        let categorizer = FileCategorizer::new(dir.path());
        let result = categorizer.categorize(Path::new("notes.txt")).await;

        assert_eq!(result.category, FileCategory::UserCreated);
        assert_eq!(result.action, RestorationAction::RestoreContent);
        assert!(result.store_content);
        assert_eq!(result.file_size, 2);
    }

    #[tokio::test]
    async fn test_missing_path_is_a_warning() {
        let dir = TempDir::new().unwrap();
        let categorizer = FileCategorizer::new(dir.path());
        let result = categorizer.categorize(Path::new("gone.txt")).await;
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.file_size, 0);
    }
}
