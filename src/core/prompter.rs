//! Interactive prompting for placeholder values that defaults did not cover.

use crate::{Error, Result};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Source of interactive answers.
pub trait InputSource {
    /// Ask for a line of text. `Ok(None)` means input was closed.
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;

    /// Ask a yes/no question. `Ok(None)` means input was closed.
    fn confirm(&mut self, prompt: &str, default: bool) -> Result<Option<bool>>;
}

/// Terminal input via dialoguer.
pub struct TerminalInput {
    theme: ColorfulTheme,
}

impl TerminalInput {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for TerminalInput {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a dialoguer failure to cancellation or a real IO error.
fn closed_or_error(err: dialoguer::Error) -> Result<()> {
    let dialoguer::Error::IO(io) = err;
    match io.kind() {
        std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::Interrupted => Ok(()),
        _ => Err(io.into()),
    }
}

impl InputSource for TerminalInput {
    fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        let answer = Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text();
        match answer {
            Ok(value) => Ok(Some(value)),
            Err(e) => closed_or_error(e).map(|_| None),
        }
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<Option<bool>> {
        let answer = Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact_opt();
        match answer {
            Ok(value) => Ok(value),
            Err(e) => closed_or_error(e).map(|_| None),
        }
    }
}

/// What kind of value a placeholder holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    ProjectName,
    Email,
    CloudflareAccountId,
    Uuid,
    Text,
}

impl ValueKind {
    /// Guess the kind from the placeholder name.
    pub fn for_placeholder(placeholder: &str) -> Self {
        let name = placeholder.to_uppercase();
        if name.contains("PROJECT_NAME") || name.contains("APP_NAME") || name.contains("PACKAGE_NAME") {
            ValueKind::ProjectName
        } else if name.contains("EMAIL") {
            ValueKind::Email
        } else if name.contains("ACCOUNT_ID") {
            ValueKind::CloudflareAccountId
        } else if name.contains("UUID") || name.contains("DATABASE_ID") || name.contains("NAMESPACE_ID") {
            ValueKind::Uuid
        } else {
            ValueKind::Text
        }
    }

    fn regex(self) -> Option<&'static Regex> {
        static PROJECT: OnceLock<Regex> = OnceLock::new();
        static EMAIL: OnceLock<Regex> = OnceLock::new();
        static ACCOUNT: OnceLock<Regex> = OnceLock::new();
        static UUID: OnceLock<Regex> = OnceLock::new();

        let (cell, pattern) = match self {
            ValueKind::ProjectName => (&PROJECT, r"^[a-z0-9][a-z0-9._-]{0,213}$"),
            ValueKind::Email => (&EMAIL, r"^[^\s@]+@[^\s@]+\.[^\s@]+$"),
            ValueKind::CloudflareAccountId => (&ACCOUNT, r"^[0-9a-f]{32}$"),
            ValueKind::Uuid => (
                &UUID,
                r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$",
            ),
            ValueKind::Text => return None,
        };
        Some(cell.get_or_init(|| Regex::new(pattern).expect("static regex")))
    }

    /// Validate an answer; returns the reason it was rejected.
    pub fn validate(self, value: &str) -> std::result::Result<(), &'static str> {
        if value.trim().is_empty() {
            return Err("A value is required");
        }
        match self.regex() {
            Some(re) if !re.is_match(value) => Err(match self {
                ValueKind::ProjectName => {
                    "Use lowercase letters, digits, '-', '_' or '.', starting with a letter or digit"
                }
                ValueKind::Email => "Enter a valid email address",
                ValueKind::CloudflareAccountId => "Account IDs are 32 lowercase hex characters",
                ValueKind::Uuid => "Enter a UUID like 123e4567-e89b-12d3-a456-426614174000",
                ValueKind::Text => "Invalid value",
            }),
            _ => Ok(()),
        }
    }
}

/// Human-readable prompt for a placeholder token.
pub fn prompt_text(placeholder: &str) -> String {
    let name = placeholder.trim_matches(|c: char| c == '{' || c == '}' || c == '_' || c == '%');
    let words = name.to_lowercase().replace('_', " ");
    let mut chars = words.chars();
    match chars.next() {
        Some(first) => format!("{}{}", first.to_uppercase(), chars.as_str()),
        None => placeholder.to_string(),
    }
}

/// Prompts for placeholder values.
pub struct InteractivePrompter<'a> {
    input: &'a mut dyn InputSource,
    silent: bool,
}

impl<'a> InteractivePrompter<'a> {
    pub fn new(input: &'a mut dyn InputSource, silent: bool) -> Self {
        Self { input, silent }
    }

    /// Ask for every placeholder in `missing`, re-asking on invalid input.
    ///
    /// In silent mode nothing is asked and the result is empty.
    pub fn prompt_for_missing(&mut self, missing: &[String]) -> Result<BTreeMap<String, String>> {
        let mut values = BTreeMap::new();
        if self.silent {
            if !missing.is_empty() {
                tracing::info!("Silent mode: not prompting for {} value(s)", missing.len());
            }
            return Ok(values);
        }

        for placeholder in missing {
            let kind = ValueKind::for_placeholder(placeholder);
            let prompt = format!("{} ({})", prompt_text(placeholder), placeholder);
            loop {
                let answer = self
                    .input
                    .read_line(&prompt)?
                    .ok_or_else(|| Error::PromptCancelled(placeholder.clone()))?;
                let answer = answer.trim().to_string();
                match kind.validate(&answer) {
                    Ok(()) => {
                        values.insert(placeholder.clone(), answer);
                        break;
                    }
                    Err(reason) => tracing::warn!("{}: {}", placeholder, reason),
                }
            }
        }

        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Scripted answers; runs out like a closed stdin.
    struct Scripted(VecDeque<String>);

    impl Scripted {
        fn new(answers: &[&str]) -> Self {
            Self(answers.iter().map(|s| s.to_string()).collect())
        }
    }

    impl InputSource for Scripted {
        fn read_line(&mut self, _prompt: &str) -> Result<Option<String>> {
            Ok(self.0.pop_front())
        }

        fn confirm(&mut self, _prompt: &str, _default: bool) -> Result<Option<bool>> {
            Ok(self.0.pop_front().map(|s| s == "y"))
        }
    }

    #[test]
    fn test_value_kind_detection() {
        assert_eq!(ValueKind::for_placeholder("{{PROJECT_NAME}}"), ValueKind::ProjectName);
        assert_eq!(ValueKind::for_placeholder("{{AUTHOR_EMAIL}}"), ValueKind::Email);
        assert_eq!(
            ValueKind::for_placeholder("{{CLOUDFLARE_ACCOUNT_ID}}"),
            ValueKind::CloudflareAccountId
        );
        assert_eq!(ValueKind::for_placeholder("{{D1_DATABASE_ID}}"), ValueKind::Uuid);
        assert_eq!(ValueKind::for_placeholder("{{DESCRIPTION}}"), ValueKind::Text);
    }

    #[test]
    fn test_validators() {
        assert!(ValueKind::ProjectName.validate("acme-app").is_ok());
        assert!(ValueKind::ProjectName.validate("Acme App").is_err());
        assert!(ValueKind::Email.validate("a@b.io").is_ok());
        assert!(ValueKind::Email.validate("not-an-email").is_err());
        assert!(ValueKind::CloudflareAccountId
            .validate("0123456789abcdef0123456789abcdef")
            .is_ok());
        assert!(ValueKind::CloudflareAccountId.validate("xyz").is_err());
        assert!(ValueKind::Uuid
            .validate("550e8400-e29b-41d4-a716-446655440000")
            .is_ok());
        assert!(ValueKind::Text.validate("anything").is_ok());
        assert!(ValueKind::Text.validate("   ").is_err());
    }

    #[test]
    fn test_prompt_text() {
        assert_eq!(prompt_text("{{CLOUDFLARE_ACCOUNT_ID}}"), "Cloudflare account id");
        assert_eq!(prompt_text("__PROJECT_NAME__"), "Project name");
    }

    #[test]
    fn test_retries_until_valid() {
        let mut input = Scripted::new(&["", "Bad Name", "good-name"]);
        let mut prompter = InteractivePrompter::new(&mut input, false);
        let values = prompter
            .prompt_for_missing(&["{{PROJECT_NAME}}".to_string()])
            .unwrap();
        assert_eq!(values["{{PROJECT_NAME}}"], "good-name");
    }

    #[test]
    fn test_end_of_input_is_cancellation() {
        let mut input = Scripted::new(&["invalid"]);
        let mut prompter = InteractivePrompter::new(&mut input, false);
        let result = prompter.prompt_for_missing(&["{{AUTHOR_EMAIL}}".to_string()]);
        assert!(matches!(result, Err(Error::PromptCancelled(_))));
    }

    #[test]
    fn test_silent_skips_prompting() {
        let mut input = Scripted::new(&["should-not-be-read"]);
        let mut prompter = InteractivePrompter::new(&mut input, true);
        let values = prompter
            .prompt_for_missing(&["{{PROJECT_NAME}}".to_string()])
            .unwrap();
        assert!(values.is_empty());
        assert_eq!(input.0.len(), 1);
    }
}
