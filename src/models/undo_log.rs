//! Undo log data model.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Current undo log format version.
pub const UNDO_LOG_VERSION: &str = "1.0.0";

/// Default undo log file name, relative to the project root.
pub const DEFAULT_UNDO_LOG_FILE: &str = ".template-undo.json";

/// Undo log file structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoLog {
    /// Log format version.
    pub version: String,
    /// Conversion metadata.
    pub metadata: UndoLogMetadata,
    /// Placeholder token -> original value.
    pub original_values: BTreeMap<String, String>,
    /// Recorded file changes.
    pub file_operations: Vec<FileOperation>,
    /// Whether sensitive values were redacted.
    #[serde(default)]
    pub sanitized: bool,
    /// Redaction audit: category -> locations that were redacted.
    #[serde(default)]
    pub sanitization_map: BTreeMap<String, Vec<String>>,
}

/// Conversion metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoLogMetadata {
    /// Version of the tool that wrote the log.
    pub tool_version: String,
    /// Detected project type.
    pub project_type: ProjectType,
    /// Conversion timestamp (RFC 3339).
    pub timestamp: String,
    /// Placeholder format, e.g. `{{NAME}}`.
    pub placeholder_format: String,
}

/// Known project types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectType {
    #[serde(rename = "cf-d1")]
    CfD1,
    CfTurso,
    ViteReact,
    Generic,
}

impl ProjectType {
    /// All project types, in their serialized form.
    pub const ALL: &'static [&'static str] = &["cf-d1", "cf-turso", "vite-react", "generic"];
}

impl std::fmt::Display for ProjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectType::CfD1 => write!(f, "cf-d1"),
            ProjectType::CfTurso => write!(f, "cf-turso"),
            ProjectType::ViteReact => write!(f, "vite-react"),
            ProjectType::Generic => write!(f, "generic"),
        }
    }
}

/// A single recorded change made during conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOperation {
    /// What happened to the file.
    #[serde(rename = "type")]
    pub op_type: FileOperationType,
    /// Path relative to the project root.
    pub path: PathBuf,
    /// File category.
    pub category: FileCategory,
    /// How the file is treated on restore.
    pub restoration_action: RestorationAction,
    /// Content before conversion, when stored.
    #[serde(default)]
    pub original_content: Option<String>,
    /// Size in bytes at conversion time.
    #[serde(default)]
    pub file_size: u64,
    /// Command that regenerates the file, if any.
    #[serde(default)]
    pub regeneration_command: Option<String>,
    /// Replacements applied to this file during conversion.
    #[serde(default)]
    pub placeholder_replacements: Vec<Replacement>,
    /// Non-fatal issues recorded at conversion time.
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Recorded operation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileOperationType {
    Modified,
    Deleted,
    Created,
}

impl FileOperationType {
    pub const ALL: &'static [&'static str] = &["modified", "deleted", "created"];
}

impl std::fmt::Display for FileOperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileOperationType::Modified => write!(f, "modified"),
            FileOperationType::Deleted => write!(f, "deleted"),
            FileOperationType::Created => write!(f, "created"),
        }
    }
}

/// File category assigned by the categorizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FileCategory {
    Generated,
    UserCreated,
    TemplateFiles,
    Modified,
}

impl FileCategory {
    pub const ALL: &'static [&'static str] =
        &["generated", "userCreated", "templateFiles", "modified"];

    /// Default restoration action for this category.
    pub fn default_action(self) -> RestorationAction {
        match self {
            FileCategory::Generated => RestorationAction::Regenerate,
            FileCategory::UserCreated => RestorationAction::RestoreContent,
            FileCategory::TemplateFiles => RestorationAction::Preserve,
            FileCategory::Modified => RestorationAction::RestoreContent,
        }
    }
}

impl std::fmt::Display for FileCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileCategory::Generated => write!(f, "generated"),
            FileCategory::UserCreated => write!(f, "userCreated"),
            FileCategory::TemplateFiles => write!(f, "templateFiles"),
            FileCategory::Modified => write!(f, "modified"),
        }
    }
}

/// Restoration action for a recorded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestorationAction {
    RestoreContent,
    Regenerate,
    Preserve,
}

impl RestorationAction {
    pub const ALL: &'static [&'static str] = &["restore-content", "regenerate", "preserve"];
}

impl std::fmt::Display for RestorationAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RestorationAction::RestoreContent => write!(f, "restore-content"),
            RestorationAction::Regenerate => write!(f, "regenerate"),
            RestorationAction::Preserve => write!(f, "preserve"),
        }
    }
}

/// A literal substitution: `from` was replaced by `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    pub from: String,
    pub to: String,
}

impl Replacement {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// The inverse substitution.
    pub fn reversed(&self) -> Self {
        Self {
            from: self.to.clone(),
            to: self.from.clone(),
        }
    }
}
