//! Undo log sanitization.
//!
//! Best-effort, regex-based redaction of sensitive literals so an undo log
//! can be shared. This is not cryptographic and not exhaustive: known
//! patterns are always redacted, anything else is left as is. Redaction is
//! one-way; the log only records where it happened, never what was removed.

use crate::models::undo_log::UndoLog;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Redaction category for API keys and tokens.
pub const CATEGORY_API_KEYS: &str = "apiKeys";
/// Redaction category for emails, names and home directories.
pub const CATEGORY_PERSONAL_INFO: &str = "personalInfo";
/// Redaction category for account IDs and UUIDs.
pub const CATEGORY_ACCOUNT_IDS: &str = "accountIds";

/// Matches any token produced by redaction.
pub const SANITIZED_MARKER_PATTERN: &str = r"\[SANITIZED_[A-Z_]+\]";

/// A single redaction rule.
struct SanitizationRule {
    category: &'static str,
    token: &'static str,
    regex: Regex,
    /// Capture group to replace; 0 replaces the whole match.
    group: usize,
}

fn rule(category: &'static str, token: &'static str, pattern: &str, group: usize) -> Option<SanitizationRule> {
    match Regex::new(pattern) {
        Ok(regex) => Some(SanitizationRule {
            category,
            token,
            regex,
            group,
        }),
        Err(e) => {
            tracing::error!("Invalid sanitization pattern {:?}: {}", pattern, e);
            None
        }
    }
}

/// Built-in rules, in the order they are applied.
fn builtin_rules() -> &'static [SanitizationRule] {
    static RULES: OnceLock<Vec<SanitizationRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            // API keys and tokens
            rule(CATEGORY_API_KEYS, "[SANITIZED_API_KEY]", r"\b(?:sk|pk|rk)_(?:live|test)_[A-Za-z0-9]{16,}\b", 0),
            rule(CATEGORY_API_KEYS, "[SANITIZED_API_KEY]", r"\bgh[pousr]_[A-Za-z0-9]{36,}\b", 0),
            rule(CATEGORY_API_KEYS, "[SANITIZED_API_KEY]", r"\bAKIA[0-9A-Z]{16}\b", 0),
            rule(CATEGORY_API_KEYS, "[SANITIZED_API_KEY]", r"\beyJ[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}\.[A-Za-z0-9_-]{10,}\b", 0),
            rule(
                CATEGORY_API_KEYS,
                "[SANITIZED_API_KEY]",
                r#"(?i)(?:api[_-]?key|api[_-]?token|secret|auth[_-]?token|password)["']?\s*[:=]\s*["']?([A-Za-z0-9_\-]{16,})"#,
                1,
            ),
            // Personal information
            rule(CATEGORY_PERSONAL_INFO, "[SANITIZED_EMAIL]", r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}", 0),
            rule(CATEGORY_PERSONAL_INFO, "[SANITIZED_PATH]", r"/(?:home|Users)/[^/\s\x22']+", 0),
            rule(CATEGORY_PERSONAL_INFO, "[SANITIZED_PATH]", r"(?i)[A-Z]:\\Users\\[^\\\s\x22']+", 0),
            rule(CATEGORY_PERSONAL_INFO, "[SANITIZED_NAME]", r#""author"\s*:\s*"([^"<@]+?)\s*(?:<[^"]*>)?""#, 1),
            // Account identifiers
            rule(
                CATEGORY_ACCOUNT_IDS,
                "[SANITIZED_UUID]",
                r"\b[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\b",
                0,
            ),
            rule(CATEGORY_ACCOUNT_IDS, "[SANITIZED_ACCOUNT_ID]", r"\b[0-9a-f]{32}\b", 0),
        ]
        .into_iter()
        .flatten()
        .collect()
    })
}

fn marker_regex() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(SANITIZED_MARKER_PATTERN).expect("static regex"))
}

/// Whether a value contains a redaction token.
pub fn contains_sanitized_marker(value: &str) -> bool {
    marker_regex().is_match(value)
}

/// Redacts sensitive literals.
pub struct Sanitizer {
    /// Extra literal values redacted as names (e.g. the current user).
    literal_names: Vec<Regex>,
}

impl Sanitizer {
    /// A sanitizer that also redacts the current OS user's names.
    pub fn new() -> Self {
        let mut names = vec![whoami::realname(), whoami::username()];
        names.retain(|n| n.trim().chars().count() >= 3);
        names.sort_by_key(|n| std::cmp::Reverse(n.len()));
        names.dedup();
        let literal_names = names
            .iter()
            .filter_map(|n| Regex::new(&format!(r"\b{}\b", regex::escape(n.trim()))).ok())
            .collect();
        Self { literal_names }
    }

    /// A sanitizer using only the regex rules.
    pub fn patterns_only() -> Self {
        Self {
            literal_names: Vec::new(),
        }
    }

    /// Redact a string. Returns the new string and the categories that fired.
    pub fn sanitize_str(&self, input: &str) -> (String, Vec<&'static str>) {
        let mut output = input.to_string();
        let mut categories = Vec::new();

        for rule in builtin_rules() {
            if !rule.regex.is_match(&output) {
                continue;
            }
            let replaced = rule
                .regex
                .replace_all(&output, |caps: &regex::Captures<'_>| {
                    let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
                    match caps.get(rule.group) {
                        Some(m) if rule.group > 0 => {
                            let start = m.start() - caps.get(0).map(|w| w.start()).unwrap_or(0);
                            let end = start + m.len();
                            format!("{}{}{}", &whole[..start], rule.token, &whole[end..])
                        }
                        _ => rule.token.to_string(),
                    }
                })
                .into_owned();
            if replaced != output {
                output = replaced;
                if !categories.contains(&rule.category) {
                    categories.push(rule.category);
                }
            }
        }

        for name in &self.literal_names {
            if name.is_match(&output) {
                output = name.replace_all(&output, "[SANITIZED_NAME]").into_owned();
                if !categories.contains(&CATEGORY_PERSONAL_INFO) {
                    categories.push(CATEGORY_PERSONAL_INFO);
                }
            }
        }

        (output, categories)
    }

    /// Redact an undo log in place.
    pub fn sanitize_undo_log(&self, log: &mut UndoLog) {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut record = |categories: Vec<&'static str>, location: String| {
            for category in categories {
                map.entry(category.to_string())
                    .or_default()
                    .push(location.clone());
            }
        };

        for (placeholder, value) in log.original_values.iter_mut() {
            let (clean, categories) = self.sanitize_str(value);
            if !categories.is_empty() {
                *value = clean;
                record(categories, format!("originalValues.{}", placeholder));
            }
        }

        for (i, op) in log.file_operations.iter_mut().enumerate() {
            let path = op.path.to_string_lossy().into_owned();
            let (clean, categories) = self.sanitize_str(&path);
            if !categories.is_empty() {
                op.path = clean.into();
                record(categories, format!("fileOperations[{}].path", i));
            }

            if let Some(content) = op.original_content.as_mut() {
                let (clean, categories) = self.sanitize_str(content);
                if !categories.is_empty() {
                    *content = clean;
                    record(categories, format!("fileOperations[{}].originalContent", i));
                }
            }

            for (j, replacement) in op.placeholder_replacements.iter_mut().enumerate() {
                let (clean, categories) = self.sanitize_str(&replacement.from);
                if !categories.is_empty() {
                    replacement.from = clean;
                    record(
                        categories,
                        format!("fileOperations[{}].placeholderReplacements[{}]", i, j),
                    );
                }
            }
        }

        let redactions: usize = map.values().map(Vec::len).sum();
        tracing::info!("Sanitized undo log: {} redaction(s)", redactions);

        log.sanitized = true;
        for (category, locations) in map {
            log.sanitization_map
                .entry(category)
                .or_default()
                .extend(locations);
        }
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_known_patterns() {
        let s = Sanitizer::patterns_only();
        let cases = [
            ("key sk_live_abcdefghijklmnop1234", "[SANITIZED_API_KEY]"),
            ("mail me: jane.doe@example.com", "[SANITIZED_EMAIL]"),
            ("/home/jane/projects/app", "[SANITIZED_PATH]"),
            ("id 550e8400-e29b-41d4-a716-446655440000", "[SANITIZED_UUID]"),
            ("account_id = \"0123456789abcdef0123456789abcdef\"", "[SANITIZED_ACCOUNT_ID]"),
        ];
        for (input, token) in cases {
            let (out, categories) = s.sanitize_str(input);
            assert!(out.contains(token), "{} -> {}", input, out);
            assert!(!categories.is_empty());
        }
    }

    #[test]
    fn test_group_rule_keeps_surrounding_text() {
        let s = Sanitizer::patterns_only();
        let (out, _) = s.sanitize_str(r#"{"author": "Jane Doe <jane@x.io>"}"#);
        assert!(out.starts_with(r#"{"author": "[SANITIZED_NAME]"#), "{}", out);
        assert!(!out.contains("Jane Doe"));
    }

    #[test]
    fn test_plain_text_untouched() {
        let s = Sanitizer::patterns_only();
        let (out, categories) = s.sanitize_str("acme-app");
        assert_eq!(out, "acme-app");
        assert!(categories.is_empty());
    }

    #[test]
    fn test_map_records_locations_not_values() {
        use crate::models::undo_log::{ProjectType, UndoLogMetadata};

        let account = "0123456789abcdef0123456789abcdef";
        let mut log = UndoLog {
            version: "1.0.0".to_string(),
            metadata: UndoLogMetadata {
                tool_version: "0.1.0".to_string(),
                project_type: ProjectType::CfD1,
                timestamp: "2024-01-01T00:00:00Z".to_string(),
                placeholder_format: "{{PLACEHOLDER}}".to_string(),
            },
            original_values: BTreeMap::from([(
                "{{ACCOUNT_ID}}".to_string(),
                format!("account_id = \"{}\"", account),
            )]),
            file_operations: vec![],
            sanitized: false,
            sanitization_map: BTreeMap::new(),
        };

        Sanitizer::patterns_only().sanitize_undo_log(&mut log);

        assert!(log.sanitized);
        assert_eq!(
            log.sanitization_map[CATEGORY_ACCOUNT_IDS],
            vec!["originalValues.{{ACCOUNT_ID}}"]
        );
        let serialized = serde_json::to_string(&log).unwrap();
        assert!(!serialized.contains(account));
    }

    #[test]
    fn test_marker_detection() {
        assert!(contains_sanitized_marker("[SANITIZED_ACCOUNT_ID]"));
        assert!(contains_sanitized_marker("x [SANITIZED_EMAIL] y"));
        assert!(!contains_sanitized_marker("acme-app"));
    }
}
