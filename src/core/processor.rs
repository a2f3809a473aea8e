//! Restoration execution module.
//!
//! Executes a restoration plan:
//! - Validate plan structure before touching the disk
//! - Detect conflicts with the live project
//! - Back up every file that is about to be overwritten
//! - Run each action in order, recording failures instead of stopping
//! - Roll back from backups when the run did not fully succeed

use crate::models::restoration::{
    Action, ActionResult, Backup, Conflict, ConflictType, ExecutionResult, FailureKind,
    RestorationPlan,
};
use crate::models::undo_log::Replacement;
use crate::utils::fs::{is_safe_relative, unique_backup_path, write_atomic};
use crate::utils::hash::{sha256_bytes, sha256_file};
use crate::{Error, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Processor configuration.
#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    /// Back up files before overwriting them.
    pub create_backups: bool,
    /// Inspect the project for conflicts before executing.
    pub detect_conflicts: bool,
    /// Copy backups back when any action fails.
    pub rollback_on_failure: bool,
    /// Also apply reversed replacements to recorded content. Off by default:
    /// recorded content is already the original and is written as is.
    pub apply_pending_replacements: bool,
    /// Keep backups after a successful run.
    pub keep_backups: bool,
    /// Backup directory; relative paths are resolved against the project root.
    pub backup_dir: PathBuf,
    /// Draw a progress bar.
    pub show_progress: bool,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            create_backups: true,
            detect_conflicts: true,
            rollback_on_failure: true,
            apply_pending_replacements: false,
            keep_backups: true,
            backup_dir: PathBuf::from(".restore-backups"),
            show_progress: false,
        }
    }
}

/// What a successful action did.
struct Outcome {
    skipped: bool,
    message: String,
}

impl Outcome {
    fn done(message: impl Into<String>) -> Self {
        Self {
            skipped: false,
            message: message.into(),
        }
    }

    fn skipped(message: impl Into<String>) -> Self {
        Self {
            skipped: true,
            message: message.into(),
        }
    }
}

/// Apply replacements in order, skipping empty patterns.
pub fn apply_replacements(text: &str, replacements: &[Replacement]) -> String {
    replacements
        .iter()
        .filter(|r| !r.from.is_empty())
        .fold(text.to_string(), |acc, r| acc.replace(&r.from, &r.to))
}

/// Restoration processor.
pub struct RestorationProcessor {
    root: PathBuf,
    options: ProcessorOptions,
}

impl RestorationProcessor {
    /// Create a processor with default options.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_options(root, ProcessorOptions::default())
    }

    /// Create a processor with custom options.
    pub fn with_options(root: impl Into<PathBuf>, options: ProcessorOptions) -> Self {
        Self {
            root: root.into(),
            options,
        }
    }

    fn backup_root(&self) -> PathBuf {
        if self.options.backup_dir.is_absolute() {
            self.options.backup_dir.clone()
        } else {
            self.root.join(&self.options.backup_dir)
        }
    }

    /// Check that every action targets a path inside the project.
    pub fn validate_plan_structure(&self, plan: &RestorationPlan<'_>) -> Result<()> {
        for (i, action) in plan.actions.iter().enumerate() {
            if let Some(path) = action.path() {
                if !is_safe_relative(path) {
                    return Err(Error::ValidationError(format!(
                        "action {} ({}) targets {} outside the project root",
                        i,
                        action.kind(),
                        path.display()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Find planned writes that collide with the live project.
    ///
    /// A path that cannot be inspected is reported as an access conflict.
    pub async fn detect_conflicts(&self, plan: &RestorationPlan<'_>) -> Vec<Conflict> {
        let mut conflicts = Vec::new();

        for action in &plan.actions {
            let Some(path) = action.path() else { continue };
            let target = self.root.join(path);
            let conflict = |conflict_type, reason: String| Conflict {
                conflict_type,
                path: path.to_path_buf(),
                reason,
                action: action.kind().to_string(),
            };

            let metadata = match tokio::fs::metadata(&target).await {
                Ok(m) => m,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => {
                    if !matches!(action, Action::PreserveFile { .. }) {
                        conflicts.push(conflict(ConflictType::AccessError, e.to_string()));
                    }
                    continue;
                }
            };

            match action {
                Action::RecreateFile { content, .. } => {
                    if metadata.is_dir() {
                        conflicts.push(conflict(
                            ConflictType::NotAFile,
                            "a directory exists where a file will be recreated".to_string(),
                        ));
                        continue;
                    }
                    match tokio::fs::read(&target).await {
                        Ok(existing) => {
                            let same = content
                                .as_ref()
                                .map(|c| c.as_bytes() == existing.as_slice())
                                .unwrap_or(false);
                            if same {
                                conflicts.push(conflict(
                                    ConflictType::FileExists,
                                    "file already exists with the recorded content".to_string(),
                                ));
                            } else {
                                conflicts.push(conflict(
                                    ConflictType::ContentConflict,
                                    "file already exists with different content".to_string(),
                                ));
                            }
                        }
                        Err(e) => conflicts.push(conflict(ConflictType::AccessError, e.to_string())),
                    }
                }
                Action::RecreateDirectory { .. } => {
                    if metadata.is_dir() {
                        conflicts.push(conflict(
                            ConflictType::FileExists,
                            "directory already exists".to_string(),
                        ));
                    } else {
                        conflicts.push(conflict(
                            ConflictType::NotAFile,
                            "a file exists where a directory will be recreated".to_string(),
                        ));
                    }
                }
                // Restoring is expected to overwrite an existing file.
                _ => {}
            }
        }

        for c in &conflicts {
            tracing::warn!("Conflict: {}", c);
        }
        conflicts
    }

    /// Copy one file into the backup directory.
    async fn backup_file(&self, relative: &Path, timestamp: &str) -> Result<Backup> {
        let original = self.root.join(relative);
        let data = tokio::fs::read(&original).await?;
        let backup_path = unique_backup_path(&self.backup_root(), relative, timestamp);
        write_atomic(&backup_path, &data).await?;

        // Verify the copy before trusting it for rollback
        let checksum = sha256_bytes(&data);
        if sha256_file(&backup_path).await? != checksum {
            let _ = tokio::fs::remove_file(&backup_path).await;
            return Err(Error::ProcessingError(format!(
                "checksum mismatch after backing up {}",
                relative.display()
            )));
        }

        tracing::debug!("Backed up {:?} -> {:?}", original, backup_path);
        Ok(Backup {
            original_path: relative.to_path_buf(),
            backup_path,
            timestamp: timestamp.to_string(),
            checksum,
        })
    }

    /// Back up every existing file a restore or recreate action will write.
    ///
    /// Returns the backups plus the paths whose backup failed.
    async fn create_backups(
        &self,
        plan: &RestorationPlan<'_>,
    ) -> (Vec<Backup>, HashMap<PathBuf, String>) {
        let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%S").to_string();
        let mut backups = Vec::new();
        let mut failed = HashMap::new();

        for action in &plan.actions {
            let path = match action {
                Action::RestoreFile { path, .. } | Action::RecreateFile { path, .. } => path,
                _ => continue,
            };
            if backups.iter().any(|b: &Backup| &b.original_path == path) {
                continue;
            }
            if !self.root.join(path).is_file() {
                continue;
            }
            match self.backup_file(path, &timestamp).await {
                Ok(backup) => backups.push(backup),
                Err(e) => {
                    tracing::error!("Backup failed: {} - {}", path.display(), e);
                    failed.insert(path.clone(), e.to_string());
                }
            }
        }

        if !backups.is_empty() {
            tracing::info!("Created {} backup(s) in {:?}", backups.len(), self.backup_root());
        }
        (backups, failed)
    }

    /// Execute a plan with conflict detection, backups and rollback.
    ///
    /// Only structural validation fails the call; action failures are
    /// recorded in the result.
    pub async fn execute_plan_with_safety(
        &self,
        plan: &RestorationPlan<'_>,
    ) -> Result<ExecutionResult> {
        self.validate_plan_structure(plan)?;

        let mut result = ExecutionResult::default();

        if self.options.detect_conflicts {
            result.conflicts = self.detect_conflicts(plan).await;
        }

        let mut backup_failures = HashMap::new();
        if self.options.create_backups {
            let (backups, failed) = self.create_backups(plan).await;
            result.backups = backups;
            backup_failures = failed;
        }

        tracing::info!("Executing {} restoration action(s)", plan.actions.len());

        let pb = if self.options.show_progress {
            ProgressBar::new(plan.actions.len() as u64)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );

        for (index, action) in plan.actions.iter().enumerate() {
            pb.set_message(action.describe());
            pb.inc(1);

            let outcome = match action.path().and_then(|p| backup_failures.get(p)) {
                Some(reason) => Err(Error::ProcessingError(format!(
                    "not written because its backup failed: {}",
                    reason
                ))),
                None => self.execute_action(action).await,
            };

            let action_result = match outcome {
                Ok(outcome) => {
                    tracing::debug!("[{}] {}: {}", index, action.kind(), outcome.message);
                    result.actions_executed += 1;
                    ActionResult {
                        index,
                        action: action.kind(),
                        path: action.path().map(Path::to_path_buf),
                        success: true,
                        skipped: outcome.skipped,
                        message: Some(outcome.message),
                        error: None,
                        failure_kind: None,
                    }
                }
                Err(e) => {
                    let target = action
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    tracing::error!("Action failed: {} {} - {}", action.kind(), target, e);
                    result
                        .errors
                        .push(format!("{} {}: {}", action.kind(), target, e));
                    ActionResult {
                        index,
                        action: action.kind(),
                        path: action.path().map(Path::to_path_buf),
                        success: false,
                        skipped: false,
                        message: None,
                        error: Some(e.to_string()),
                        failure_kind: Some(classify_failure(&e)),
                    }
                }
            };
            result.action_results.push(action_result);
        }

        pb.finish_with_message("Done!");

        result.success = result.failed_count() == 0;

        if !result.success && self.options.rollback_on_failure && !result.backups.is_empty() {
            self.rollback(&mut result).await;
        } else if result.success && !self.options.keep_backups {
            self.discard_backups(&mut result).await;
        }

        result.cleanup_guidance = cleanup_guidance(plan, &result);

        tracing::info!(
            "Restoration finished: {} succeeded, {} failed",
            result.actions_executed,
            result.failed_count()
        );
        Ok(result)
    }

    async fn execute_action(&self, action: &Action) -> Result<Outcome> {
        match action {
            Action::RestoreFile {
                path,
                content,
                placeholder_replacements,
            } => {
                self.restore_file(path, content.as_deref(), placeholder_replacements)
                    .await
            }
            Action::RecreateFile { path, content } => {
                self.recreate_file(path, content.as_deref()).await
            }
            Action::RecreateDirectory {
                path,
                regeneration_command,
            } => {
                self.recreate_directory(path, regeneration_command.as_deref())
                    .await
            }
            Action::PreserveFile { path } => self.preserve_file(path).await,
            Action::UseDefaultValue { .. }
            | Action::RestorePlaceholdersOnly { .. }
            | Action::SelectiveNote { .. } => Ok(Outcome::done(action.describe())),
        }
    }

    async fn restore_file(
        &self,
        path: &Path,
        content: Option<&str>,
        replacements: &[Replacement],
    ) -> Result<Outcome> {
        let target = self.root.join(path);
        match tokio::fs::metadata(&target).await {
            Ok(m) if m.is_file() => {}
            Ok(_) => {
                return Err(Error::ProcessingError(format!(
                    "{} is not a file",
                    path.display()
                )))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::PathNotFound(path.display().to_string()))
            }
            Err(e) => return Err(e.into()),
        }

        let restored = match content {
            Some(c) if self.options.apply_pending_replacements => apply_replacements(c, replacements),
            Some(c) => c.to_string(),
            None => {
                let live = tokio::fs::read_to_string(&target).await?;
                apply_replacements(&live, replacements)
            }
        };

        write_atomic(&target, restored.as_bytes()).await?;
        Ok(Outcome::done(format!("restored {}", path.display())))
    }

    async fn recreate_file(&self, path: &Path, content: Option<&str>) -> Result<Outcome> {
        let content = content.ok_or_else(|| {
            Error::ProcessingError(format!("no recorded content for {}", path.display()))
        })?;
        let target = self.root.join(path);

        if target.is_dir() {
            return Err(Error::ProcessingError(format!(
                "{} is a directory",
                path.display()
            )));
        }
        if let Ok(existing) = tokio::fs::read(&target).await {
            if existing == content.as_bytes() {
                return Ok(Outcome::skipped(format!(
                    "{} already has the recorded content",
                    path.display()
                )));
            }
        }

        write_atomic(&target, content.as_bytes()).await?;
        Ok(Outcome::done(format!("recreated {}", path.display())))
    }

    async fn recreate_directory(&self, path: &Path, command: Option<&str>) -> Result<Outcome> {
        let target = self.root.join(path);
        match tokio::fs::metadata(&target).await {
            Ok(m) if m.is_dir() => {
                return Ok(Outcome::skipped(format!(
                    "{} already exists",
                    path.display()
                )))
            }
            Ok(_) => {
                return Err(Error::ProcessingError(format!(
                    "{} exists and is not a directory",
                    path.display()
                )))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        tokio::fs::create_dir_all(&target).await?;
        Ok(Outcome::done(match command {
            Some(cmd) => format!("created {} (run `{}` to populate it)", path.display(), cmd),
            None => format!("created {}", path.display()),
        }))
    }

    async fn preserve_file(&self, path: &Path) -> Result<Outcome> {
        if tokio::fs::try_exists(self.root.join(path)).await? {
            Ok(Outcome::done(format!("kept {}", path.display())))
        } else {
            tracing::warn!("Template file {} is already gone", path.display());
            Ok(Outcome::skipped(format!("{} no longer exists", path.display())))
        }
    }

    /// Copy every backup back over its original and remove it.
    async fn rollback(&self, result: &mut ExecutionResult) {
        tracing::warn!("Rolling back {} file(s) from backups", result.backups.len());

        for backup in result.backups.iter().rev() {
            if let Err(e) = self.restore_backup(backup).await {
                tracing::error!(
                    "Rollback failed: {} - {}",
                    backup.original_path.display(),
                    e
                );
                result
                    .rollback_errors
                    .push(format!("{}: {}", backup.original_path.display(), e));
            }
        }
        result.rolled_back = true;
    }

    async fn restore_backup(&self, backup: &Backup) -> Result<()> {
        let data = tokio::fs::read(&backup.backup_path).await?;
        if sha256_bytes(&data) != backup.checksum {
            return Err(Error::ProcessingError(format!(
                "backup {} failed checksum verification",
                backup.backup_path.display()
            )));
        }
        write_atomic(&self.root.join(&backup.original_path), &data).await?;
        tokio::fs::remove_file(&backup.backup_path).await?;
        tracing::debug!("Restored {:?} from backup", backup.original_path);
        Ok(())
    }

    async fn discard_backups(&self, result: &mut ExecutionResult) {
        for backup in result.backups.drain(..) {
            if let Err(e) = tokio::fs::remove_file(&backup.backup_path).await {
                tracing::warn!("Could not remove backup {:?}: {}", backup.backup_path, e);
            }
        }
        // Only removes the directory when nothing else is left in it.
        let _ = tokio::fs::remove_dir(self.backup_root()).await;
    }
}

/// Classify an action error for guidance.
fn classify_failure(err: &Error) -> FailureKind {
    if let Error::Io(io) = err {
        match io.kind() {
            std::io::ErrorKind::PermissionDenied => return FailureKind::Permission,
            std::io::ErrorKind::NotFound => return FailureKind::Missing,
            _ => {}
        }
    }
    if matches!(err, Error::PathNotFound(_)) {
        return FailureKind::Missing;
    }

    let message = err.to_string().to_lowercase();
    if message.contains("permission denied") || message.contains("access denied") {
        FailureKind::Permission
    } else if message.contains("no space") || message.contains("disk full") || message.contains("quota") {
        FailureKind::DiskSpace
    } else if message.contains("not found") || message.contains("no such file") {
        FailureKind::Missing
    } else {
        FailureKind::Other
    }
}

/// Human-readable follow-ups derived from the plan and the failures.
fn cleanup_guidance(plan: &RestorationPlan<'_>, result: &ExecutionResult) -> Vec<String> {
    let mut guidance = Vec::new();

    for r in result.action_results.iter().filter(|r| r.success) {
        if let Some(Action::RecreateDirectory {
            path,
            regeneration_command: Some(cmd),
        }) = plan.actions.get(r.index)
        {
            guidance.push(format!("Run `{}` to regenerate {}", cmd, path.display()));
        }
    }

    if result.success {
        return guidance;
    }

    let paths_of = |kind: FailureKind| -> Vec<String> {
        result
            .failures()
            .filter(|r| r.failure_kind == Some(kind))
            .filter_map(|r| r.path.as_ref().map(|p| p.display().to_string()))
            .collect()
    };

    let permission = paths_of(FailureKind::Permission);
    if !permission.is_empty() {
        guidance.push(format!(
            "Check file permissions for: {}",
            permission.join(", ")
        ));
    }
    if !paths_of(FailureKind::DiskSpace).is_empty() {
        guidance.push("Free up disk space, then retry the failed files".to_string());
    }
    let missing = paths_of(FailureKind::Missing);
    if !missing.is_empty() {
        guidance.push(format!(
            "These files no longer exist in the project: {}. Recover them from version control before retrying",
            missing.join(", ")
        ));
    }

    let retry: Vec<String> = result
        .failures()
        .filter_map(|r| r.path.as_ref().map(|p| p.display().to_string()))
        .collect();
    if !retry.is_empty() {
        guidance.push(format!(
            "Retry only the failed files with --restore-files {}",
            retry.join(",")
        ));
    }

    if result.rolled_back {
        if result.rollback_errors.is_empty() {
            guidance.push("Overwritten files were rolled back from backups".to_string());
        } else {
            guidance.push(
                "Rollback was incomplete; compare the remaining backups with the project by hand"
                    .to_string(),
            );
        }
    } else if !result.backups.is_empty() {
        guidance.push(format!(
            "Backups of overwritten files are kept under {}",
            result.backups[0]
                .backup_path
                .parent()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        ));
    }

    guidance
}
