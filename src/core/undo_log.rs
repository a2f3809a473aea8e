//! Undo log management.
//!
//! Records a conversion so it can be reversed later:
//! - create a log from a conversion plan (before the plan is applied)
//! - read a log back, with structural and version validation
//! - optionally redact sensitive values before the log is written

use crate::core::categorizer::FileCategorizer;
use crate::core::sanitizer::Sanitizer;
use crate::models::conversion::{ConversionAction, ConversionPlan};
use crate::models::undo_log::{
    FileCategory, FileOperation, FileOperationType, ProjectType, RestorationAction, UndoLog,
    UndoLogMetadata, UNDO_LOG_VERSION,
};
use crate::utils::fs::{is_safe_relative, write_atomic};
use crate::utils::version::{is_compatible, Version};
use crate::{Error, Result};
use chrono::Utc;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Options for creating an undo log.
#[derive(Debug, Clone)]
pub struct UndoLogOptions {
    /// Redact sensitive values before returning the log.
    pub sanitize: bool,
    /// Placeholder format recorded in the metadata.
    pub placeholder_format: String,
}

impl Default for UndoLogOptions {
    fn default() -> Self {
        Self {
            sanitize: false,
            placeholder_format: "{{PLACEHOLDER}}".to_string(),
        }
    }
}

/// Undo log manager.
pub struct UndoLogManager {
    categorizer: FileCategorizer,
}

impl UndoLogManager {
    /// Create a manager that categorizes files with `categorizer`.
    pub fn new(categorizer: FileCategorizer) -> Self {
        Self { categorizer }
    }

    /// Build an undo log for a conversion plan that is about to be applied.
    ///
    /// Must run before the plan touches the filesystem: modified and deleted
    /// files are read in their pre-conversion state.
    pub async fn create_undo_log(
        &self,
        plan: &ConversionPlan,
        options: &UndoLogOptions,
    ) -> Result<UndoLog> {
        let root = self.categorizer.root().to_path_buf();
        let mut file_operations = Vec::with_capacity(plan.actions.len());

        for action in &plan.actions {
            let path = action.path();
            if !is_safe_relative(path) {
                return Err(Error::ValidationError(format!(
                    "Conversion action path escapes the project root: {}",
                    path.display()
                )));
            }

            let operation = match action {
                ConversionAction::Modify { file, replacements } => {
                    let cat = self.categorizer.categorize(file).await;
                    let mut warnings = cat.warnings;
                    let original_content = if cat.is_directory
                        || self.categorizer.exceeds_size_limit(cat.file_size)
                    {
                        None
                    } else {
                        read_content(&root.join(file), &mut warnings).await
                    };
                    FileOperation {
                        op_type: FileOperationType::Modified,
                        path: file.clone(),
                        category: FileCategory::Modified,
                        restoration_action: RestorationAction::RestoreContent,
                        original_content,
                        file_size: cat.file_size,
                        regeneration_command: None,
                        placeholder_replacements: replacements.clone(),
                        warnings,
                    }
                }
                ConversionAction::Delete { path } => {
                    let cat = self.categorizer.categorize(path).await;
                    let mut warnings = cat.warnings;
                    let original_content = if cat.store_content {
                        read_content(&root.join(path), &mut warnings).await
                    } else {
                        None
                    };
                    // A user-created entry without content must say why.
                    if original_content.is_none() && cat.category == FileCategory::UserCreated {
                        let reason = if cat.is_directory {
                            "directories are not recorded"
                        } else {
                            "it could not be read"
                        };
                        warnings.push(format!(
                            "Content of user entry {} was not recorded: {}",
                            path.display(),
                            reason
                        ));
                    }
                    FileOperation {
                        op_type: FileOperationType::Deleted,
                        path: path.clone(),
                        category: cat.category,
                        restoration_action: cat.action,
                        original_content,
                        file_size: cat.file_size,
                        regeneration_command: cat.regeneration_command,
                        placeholder_replacements: Vec::new(),
                        warnings,
                    }
                }
                ConversionAction::Create { path, content } => FileOperation {
                    op_type: FileOperationType::Created,
                    path: path.clone(),
                    category: FileCategory::TemplateFiles,
                    restoration_action: RestorationAction::Preserve,
                    original_content: None,
                    file_size: content.len() as u64,
                    regeneration_command: None,
                    placeholder_replacements: Vec::new(),
                    warnings: Vec::new(),
                },
            };

            for warning in &operation.warnings {
                tracing::warn!("{}", warning);
            }
            file_operations.push(operation);
        }

        let original_values: BTreeMap<String, String> = plan
            .analysis
            .placeholders
            .iter()
            .map(|p| (p.placeholder.clone(), p.value.clone()))
            .collect();

        let mut log = UndoLog {
            version: UNDO_LOG_VERSION.to_string(),
            metadata: UndoLogMetadata {
                tool_version: env!("CARGO_PKG_VERSION").to_string(),
                project_type: plan.analysis.project_type,
                timestamp: Utc::now().to_rfc3339(),
                placeholder_format: options.placeholder_format.clone(),
            },
            original_values,
            file_operations,
            sanitized: false,
            sanitization_map: BTreeMap::new(),
        };

        tracing::info!(
            "Recorded {} file operation(s) and {} placeholder(s)",
            log.file_operations.len(),
            log.original_values.len()
        );

        if options.sanitize {
            sanitize_undo_log(&mut log);
        }

        Ok(log)
    }
}

/// Read a file as UTF-8 text, recording a warning on failure.
async fn read_content(path: &Path, warnings: &mut Vec<String>) -> Option<String> {
    match tokio::fs::read(path).await {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Some(text),
            Err(_) => {
                warnings.push(format!("{} is not UTF-8 text; content not stored", path.display()));
                None
            }
        },
        Err(e) => {
            warnings.push(format!("Failed to read {}: {}", path.display(), e));
            None
        }
    }
}

/// Redact sensitive values from a log in place.
pub fn sanitize_undo_log(log: &mut UndoLog) {
    Sanitizer::new().sanitize_undo_log(log);
}

/// Read, validate and version-check an undo log.
pub async fn read_undo_log(path: &Path) -> Result<UndoLog> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::UndoLogNotFound(path.display().to_string()));
        }
        Err(e) => {
            return Err(Error::UndoLogCorrupted(format!(
                "cannot read {}: {}",
                path.display(),
                e
            )));
        }
    };

    let text = String::from_utf8(bytes)
        .map_err(|_| Error::UndoLogCorrupted(format!("{} is not UTF-8", path.display())))?;
    if text.trim().is_empty() {
        return Err(Error::UndoLogCorrupted(format!("{} is empty", path.display())));
    }

    let value: Value = serde_json::from_str(&text)
        .map_err(|e| Error::UndoLogCorrupted(format!("invalid JSON: {}", e)))?;

    // Version first so a newer log reports a mismatch, not corruption.
    if let Some(version) = value.get("version").and_then(Value::as_str) {
        check_version(version)?;
    }

    let errors = validate_structure(&value);
    if !errors.is_empty() {
        return Err(Error::UndoLogCorrupted(errors.join("; ")));
    }

    let log: UndoLog = serde_json::from_value(value)
        .map_err(|e| Error::UndoLogCorrupted(format!("schema mismatch: {}", e)))?;

    tracing::debug!(
        "Loaded undo log {:?}: {} operation(s)",
        path,
        log.file_operations.len()
    );
    Ok(log)
}

/// Fail if a log version cannot be read by this tool.
pub fn check_version(log_version: &str) -> Result<()> {
    let mismatch = || Error::UndoLogVersionMismatch {
        found: log_version.to_string(),
        supported: UNDO_LOG_VERSION.to_string(),
    };
    let current = Version::parse(UNDO_LOG_VERSION).ok_or_else(mismatch)?;
    let log = Version::parse(log_version).ok_or_else(mismatch)?;
    if is_compatible(current, log) {
        Ok(())
    } else {
        Err(mismatch())
    }
}

/// Whether a key looks like a placeholder token.
pub fn is_placeholder_key(key: &str) -> bool {
    let between = |open: &str, close: &str| {
        key.find(open)
            .map(|start| key[start + open.len()..].contains(close))
            .unwrap_or(false)
    };
    between("{{", "}}") || between("__", "__") || between("%", "%")
}

/// Exhaustive structural validation of a raw log. Returns every problem found.
pub fn validate_structure(value: &Value) -> Vec<String> {
    let mut errors = Vec::new();

    let Some(root) = value.as_object() else {
        return vec!["top level is not an object".to_string()];
    };

    for field in ["version", "metadata", "originalValues", "fileOperations"] {
        if !root.contains_key(field) {
            errors.push(format!("missing required field '{}'", field));
        }
    }

    if let Some(version) = root.get("version") {
        if !version.is_string() {
            errors.push("'version' must be a string".to_string());
        }
    }

    if let Some(metadata) = root.get("metadata") {
        match metadata.as_object() {
            Some(meta) => {
                for field in ["toolVersion", "timestamp", "placeholderFormat"] {
                    match meta.get(field) {
                        Some(Value::String(_)) => {}
                        Some(_) => errors.push(format!("metadata.{} must be a string", field)),
                        None => errors.push(format!("metadata.{} is missing", field)),
                    }
                }
                match meta.get("projectType").and_then(Value::as_str) {
                    Some(t) if ProjectType::ALL.contains(&t) => {}
                    Some(t) => errors.push(format!("metadata.projectType '{}' is unknown", t)),
                    None => errors.push("metadata.projectType is missing".to_string()),
                }
            }
            None => errors.push("'metadata' must be an object".to_string()),
        }
    }

    if let Some(values) = root.get("originalValues") {
        match values.as_object() {
            Some(map) => {
                for (key, value) in map {
                    if !is_placeholder_key(key) {
                        errors.push(format!("originalValues key '{}' is not a placeholder", key));
                    }
                    if !value.is_string() {
                        errors.push(format!("originalValues['{}'] must be a string", key));
                    }
                }
            }
            None => errors.push("'originalValues' must be an object".to_string()),
        }
    }

    if let Some(sanitized) = root.get("sanitized") {
        if !sanitized.is_boolean() {
            errors.push("'sanitized' must be a boolean".to_string());
        }
    }

    if let Some(ops) = root.get("fileOperations") {
        match ops.as_array() {
            Some(ops) => {
                for (i, op) in ops.iter().enumerate() {
                    validate_operation(i, op, &mut errors);
                }
            }
            None => errors.push("'fileOperations' must be an array".to_string()),
        }
    }

    errors
}

fn validate_operation(i: usize, op: &Value, errors: &mut Vec<String>) {
    let Some(op) = op.as_object() else {
        errors.push(format!("fileOperations[{}] is not an object", i));
        return;
    };

    let check_enum = |field: &str, allowed: &[&str], errors: &mut Vec<String>| -> Option<String> {
        match op.get(field).and_then(Value::as_str) {
            Some(v) if allowed.contains(&v) => Some(v.to_string()),
            Some(v) => {
                errors.push(format!("fileOperations[{}].{} '{}' is invalid", i, field, v));
                None
            }
            None => {
                errors.push(format!("fileOperations[{}].{} is missing", i, field));
                None
            }
        }
    };

    let op_type = check_enum("type", FileOperationType::ALL, errors);
    let category = check_enum("category", FileCategory::ALL, errors);
    check_enum("restorationAction", RestorationAction::ALL, errors);

    match op.get("path").and_then(Value::as_str) {
        Some(p) if is_safe_relative(Path::new(p)) => {}
        Some(p) => errors.push(format!(
            "fileOperations[{}].path '{}' is empty or escapes the project root",
            i, p
        )),
        None => errors.push(format!("fileOperations[{}].path is missing", i)),
    }

    match op.get("originalContent") {
        None | Some(Value::Null) | Some(Value::String(_)) => {}
        Some(_) => errors.push(format!(
            "fileOperations[{}].originalContent must be a string or null",
            i
        )),
    }

    // A deleted user file without content is only legitimate when a warning explains why.
    if op_type.as_deref() == Some("deleted") && category.as_deref() == Some("userCreated") {
        let has_content = matches!(op.get("originalContent"), Some(Value::String(_)));
        let has_warning = op
            .get("warnings")
            .and_then(Value::as_array)
            .map(|w| !w.is_empty())
            .unwrap_or(false);
        if !has_content && !has_warning {
            errors.push(format!(
                "fileOperations[{}] deletes a user file but has no content and no warning",
                i
            ));
        }
    }
}

/// Non-fatal integrity checks on a loaded log.
pub fn check_integrity(log: &UndoLog) -> Vec<String> {
    let mut warnings = Vec::new();

    if log.original_values.is_empty() {
        warnings.push("Undo log records no placeholders".to_string());
    }
    if log.file_operations.is_empty() {
        warnings.push("Undo log records no file operations".to_string());
    }
    for op in &log.file_operations {
        if op.op_type == FileOperationType::Deleted
            && op.category == FileCategory::UserCreated
            && op.original_content.is_none()
        {
            warnings.push(format!(
                "Deleted user file {} has no recorded content and cannot be recreated",
                op.path.display()
            ));
        }
    }

    warnings
}

/// Write an undo log atomically.
pub async fn save_undo_log(log: &UndoLog, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(log)?;
    write_atomic(path, json.as_bytes()).await?;
    tracing::info!("Undo log saved to {:?}", path);
    Ok(())
}
