//! Restoration plan and execution data model.

use super::undo_log::{Replacement, UndoLog};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Restoration mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RestorationMode {
    Full,
    Selective,
    Sanitized,
}

impl std::fmt::Display for RestorationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RestorationMode::Full => write!(f, "full"),
            RestorationMode::Selective => write!(f, "selective"),
            RestorationMode::Sanitized => write!(f, "sanitized"),
        }
    }
}

/// A plan built for one restore invocation. Never persisted.
#[derive(Debug, Clone)]
pub struct RestorationPlan<'a> {
    /// The log the plan was derived from.
    pub undo_log: &'a UndoLog,
    /// Restoration mode.
    pub mode: RestorationMode,
    /// Actions, in execution order.
    pub actions: Vec<Action>,
    /// Placeholders that could not be resolved.
    pub missing_values: Vec<String>,
    /// Planning warnings.
    pub warnings: Vec<String>,
    /// Placeholder -> value used for restoration.
    pub resolved_values: BTreeMap<String, String>,
}

impl RestorationPlan<'_> {
    /// Actions that write to or create something on disk.
    pub fn mutating_actions(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(|a| a.is_mutating())
    }

    /// Whether every placeholder has a value.
    pub fn is_fully_resolved(&self) -> bool {
        self.missing_values.is_empty()
    }
}

/// A single declarative restoration step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Action {
    /// Overwrite an existing file with its pre-conversion content.
    /// Without content, the live file has its placeholders reversed in place.
    #[serde(rename_all = "camelCase")]
    RestoreFile {
        path: PathBuf,
        content: Option<String>,
        placeholder_replacements: Vec<Replacement>,
    },
    /// Bring back a file that was deleted during conversion.
    RecreateFile {
        path: PathBuf,
        content: Option<String>,
    },
    /// Bring back an (empty) generated directory.
    #[serde(rename_all = "camelCase")]
    RecreateDirectory {
        path: PathBuf,
        regeneration_command: Option<String>,
    },
    /// Leave a template file in place.
    PreserveFile { path: PathBuf },
    /// A sanitized placeholder was satisfied from defaults or input.
    UseDefaultValue { placeholder: String, note: String },
    /// Only placeholder values are being restored.
    RestorePlaceholdersOnly { note: String },
    /// Explains the scope of a selective restore.
    SelectiveNote { note: String },
}

impl Action {
    /// Wire name of the action type.
    pub fn kind(&self) -> &'static str {
        match self {
            Action::RestoreFile { .. } => "restore-file",
            Action::RecreateFile { .. } => "recreate-file",
            Action::RecreateDirectory { .. } => "recreate-directory",
            Action::PreserveFile { .. } => "preserve-file",
            Action::UseDefaultValue { .. } => "use-default-value",
            Action::RestorePlaceholdersOnly { .. } => "restore-placeholders-only",
            Action::SelectiveNote { .. } => "selective-note",
        }
    }

    /// Target path, for file-level actions.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Action::RestoreFile { path, .. }
            | Action::RecreateFile { path, .. }
            | Action::RecreateDirectory { path, .. }
            | Action::PreserveFile { path } => Some(path),
            _ => None,
        }
    }

    /// Whether executing this action can change the filesystem.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Action::RestoreFile { .. } | Action::RecreateFile { .. } | Action::RecreateDirectory { .. }
        )
    }

    /// One-line human description.
    pub fn describe(&self) -> String {
        match self {
            Action::RestoreFile {
                path,
                content,
                placeholder_replacements,
            } => match content {
                Some(_) => format!("restore {}", path.display()),
                None => format!(
                    "restore {} placeholder(s) in {}",
                    placeholder_replacements.len(),
                    path.display()
                ),
            },
            Action::RecreateFile { path, .. } => format!("recreate {}", path.display()),
            Action::RecreateDirectory {
                path,
                regeneration_command,
            } => match regeneration_command {
                Some(cmd) => format!("recreate directory {} (then run `{}`)", path.display(), cmd),
                None => format!("recreate directory {}", path.display()),
            },
            Action::PreserveFile { path } => format!("keep {}", path.display()),
            Action::UseDefaultValue { placeholder, note } => format!("{}: {}", placeholder, note),
            Action::RestorePlaceholdersOnly { note } | Action::SelectiveNote { note } => {
                note.clone()
            }
        }
    }
}

/// Kind of conflict between a planned write and the live filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictType {
    FileExists,
    ContentConflict,
    NotAFile,
    AccessError,
}

impl std::fmt::Display for ConflictType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConflictType::FileExists => write!(f, "file-exists"),
            ConflictType::ContentConflict => write!(f, "content-conflict"),
            ConflictType::NotAFile => write!(f, "not-a-file"),
            ConflictType::AccessError => write!(f, "access-error"),
        }
    }
}

/// A planned write that collides with the current filesystem state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    #[serde(rename = "type")]
    pub conflict_type: ConflictType,
    pub path: PathBuf,
    pub reason: String,
    /// Action type that would have written the path.
    pub action: String,
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} ({}): {}",
            self.conflict_type,
            self.path.display(),
            self.action,
            self.reason
        )
    }
}

/// A copy of a file taken right before it was overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub original_path: PathBuf,
    pub backup_path: PathBuf,
    pub timestamp: String,
    /// SHA-256 of the backed-up content.
    pub checksum: String,
}

/// Broad classification of an action failure, used for cleanup guidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    Permission,
    DiskSpace,
    Missing,
    Other,
}

/// Outcome of a single action.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    /// Position of the action in the plan.
    pub index: usize,
    pub action: &'static str,
    pub path: Option<PathBuf>,
    pub success: bool,
    /// The action had nothing to do.
    pub skipped: bool,
    pub message: Option<String>,
    pub error: Option<String>,
    pub failure_kind: Option<FailureKind>,
}

/// Aggregated outcome of executing a plan.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// False if any action failed.
    pub success: bool,
    /// Number of successful actions.
    pub actions_executed: usize,
    pub action_results: Vec<ActionResult>,
    pub errors: Vec<String>,
    pub conflicts: Vec<Conflict>,
    pub backups: Vec<Backup>,
    /// Backups were copied back after a failure.
    pub rolled_back: bool,
    /// Failures while rolling back; the project state is ambiguous.
    pub rollback_errors: Vec<String>,
    pub cleanup_guidance: Vec<String>,
}

impl ExecutionResult {
    /// Results of failed actions.
    pub fn failures(&self) -> impl Iterator<Item = &ActionResult> {
        self.action_results.iter().filter(|r| !r.success)
    }

    /// Number of failed actions.
    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }
}
