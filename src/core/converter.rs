//! Conversion applier.
//!
//! Records the undo log for a conversion plan, then applies the plan to the
//! project: placeholders are written into modified files, deleted paths are
//! removed and template files are created.

use crate::core::categorizer::FileCategorizer;
use crate::core::processor::apply_replacements;
use crate::core::undo_log::{save_undo_log, UndoLogManager, UndoLogOptions};
use crate::models::conversion::{ConversionAction, ConversionPlan};
use crate::models::undo_log::UndoLog;
use crate::utils::fs::write_atomic;
use crate::Result;
use std::path::{Path, PathBuf};

/// Result of applying a conversion plan.
#[derive(Debug, Clone, Default)]
pub struct ConversionReport {
    /// Number of actions applied.
    pub applied: usize,
    /// Per-action failures.
    pub errors: Vec<String>,
}

impl ConversionReport {
    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Record the undo log, save it, then apply the plan.
///
/// Nothing is changed if the undo log cannot be written.
pub async fn convert_project(
    categorizer: FileCategorizer,
    plan: &ConversionPlan,
    options: &UndoLogOptions,
    undo_log_path: &Path,
) -> Result<(UndoLog, ConversionReport)> {
    let root = categorizer.root().to_path_buf();
    let manager = UndoLogManager::new(categorizer);

    let undo_log = manager.create_undo_log(plan, options).await?;
    save_undo_log(&undo_log, undo_log_path).await?;

    let report = apply_conversion_plan(&root, plan).await;
    Ok((undo_log, report))
}

/// Apply every action of a conversion plan, collecting failures.
pub async fn apply_conversion_plan(root: &Path, plan: &ConversionPlan) -> ConversionReport {
    let mut report = ConversionReport::default();

    for action in &plan.actions {
        let target: PathBuf = root.join(action.path());
        let outcome = match action {
            ConversionAction::Modify { replacements, .. } => {
                modify_file(&target, replacements).await
            }
            ConversionAction::Delete { .. } => delete_path(&target).await,
            ConversionAction::Create { content, .. } => {
                write_atomic(&target, content.as_bytes()).await
            }
        };

        match outcome {
            Ok(()) => report.applied += 1,
            Err(e) => {
                tracing::error!("Conversion failed: {} - {}", action.path().display(), e);
                report
                    .errors
                    .push(format!("{}: {}", action.path().display(), e));
            }
        }
    }

    tracing::info!(
        "Conversion applied {} action(s), {} failed",
        report.applied,
        report.errors.len()
    );
    report
}

async fn modify_file(
    target: &Path,
    replacements: &[crate::models::undo_log::Replacement],
) -> Result<()> {
    let content = tokio::fs::read_to_string(target).await?;
    let converted = apply_replacements(&content, replacements);
    if converted != content {
        write_atomic(target, converted.as_bytes()).await?;
    }
    Ok(())
}

async fn delete_path(target: &Path) -> Result<()> {
    let metadata = match tokio::fs::symlink_metadata(target).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("Already gone: {:?}", target);
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    if metadata.is_dir() {
        tokio::fs::remove_dir_all(target).await?;
    } else {
        tokio::fs::remove_file(target).await?;
    }
    tracing::debug!("Deleted {:?}", target);
    Ok(())
}
