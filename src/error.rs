//! Error types for templatize.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for templatize.
#[derive(Error, Debug)]
pub enum Error {
    // Undo log errors
    #[error("Undo log not found: {0}")]
    UndoLogNotFound(String),

    #[error("Undo log is corrupted: {0}")]
    UndoLogCorrupted(String),

    #[error("Undo log version {found} is not compatible with this tool (supports {supported})")]
    UndoLogVersionMismatch { found: String, supported: String },

    // Restoration errors
    #[error("Restoration conflict: {0}")]
    RestorationConflict(String),

    #[error("Missing values for placeholders: {}", .0.join(", "))]
    MissingRestorationValues(Vec<String>),

    #[error("Restoration partially failed: {failed} of {total} actions failed")]
    RestorationPartialFailure { failed: usize, total: usize },

    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Processing failed: {0}")]
    ProcessingError(String),

    // Interaction errors
    #[error("Input cancelled while prompting for {0}")]
    PromptCancelled(String),

    // File system errors
    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("File already exists: {0}")]
    FileAlreadyExists(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Config errors
    #[error("Config error: {0}")]
    Toml(#[from] toml::de::Error),

    // Generic errors
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a generic error from a string.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        Error::Other(msg.into())
    }

    /// Suggested remediation steps for the user.
    pub fn suggestions(&self) -> Vec<&'static str> {
        match self {
            Error::UndoLogNotFound(_) => vec![
                "Run the restore from the template's root directory",
                "Pass --undo-log <FILE> if the log was moved",
                "Templates created without an undo log cannot be restored automatically",
            ],
            Error::UndoLogCorrupted(_) => vec![
                "Check that the undo log is valid JSON and was not truncated",
                "Regenerate the template from the original project",
            ],
            Error::UndoLogVersionMismatch { .. } => vec![
                "Upgrade templatize to a version that supports this log",
                "Regenerate the template with the installed version",
            ],
            Error::RestorationConflict(_) => vec![
                "Re-run with backups enabled so conflicting files can be restored",
                "Move or remove the conflicting files and try again",
            ],
            Error::MissingRestorationValues(_) => vec![
                "Add the missing placeholders to .restore-defaults.json",
                "Run without --silent to be prompted for the values",
                "Use --init-defaults to scaffold a defaults file",
            ],
            Error::RestorationPartialFailure { .. } => vec![
                "Review the failed actions above",
                "Retry only the failed files with --restore-files <paths>",
            ],
            Error::ValidationError(_) => vec![
                "Check the undo log and defaults file for malformed entries",
            ],
            Error::ProcessingError(_) | Error::Io(_) => vec![
                "Check file permissions in the project directory",
                "Check that there is enough free disk space",
            ],
            Error::PromptCancelled(_) => vec![
                "Provide the value in .restore-defaults.json to skip prompting",
            ],
            Error::FileAlreadyExists(_) => vec!["Pass --force to overwrite the existing file"],
            _ => Vec::new(),
        }
    }
}
