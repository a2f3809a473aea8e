//! Restoration planning module.
//!
//! Turns an undo log into an ordered list of actions:
//! 1. Pick the mode (full, selective, sanitized)
//! 2. Resolve placeholder values, flagging redacted ones without a default
//! 3. Map each recorded file operation to an action
//! 4. Validate the plan for contradictory or incomplete actions

use crate::core::sanitizer::contains_sanitized_marker;
use crate::models::restoration::{Action, RestorationMode, RestorationPlan};
use crate::models::undo_log::{
    FileOperation, FileOperationType, Replacement, RestorationAction, UndoLog,
};
use crate::utils::fs::is_safe_relative;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Caller options for planning.
#[derive(Debug, Clone, Default)]
pub struct PlannerOptions {
    /// Restore only these paths (files or directories).
    pub restore_files: Vec<PathBuf>,
    /// Only put placeholder values back; keep current file content otherwise.
    pub restore_placeholders_only: bool,
    /// Treat the log as sanitized even if it is not flagged.
    pub sanitized: bool,
    /// Values for placeholders whose logged value was redacted.
    pub provided_values: BTreeMap<String, String>,
}

/// Restoration planner.
pub struct RestorationPlanner {
    root: PathBuf,
}

impl RestorationPlanner {
    /// Create a planner for the project at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Build a restoration plan.
    pub fn create_restoration_plan<'a>(
        &self,
        undo_log: &'a UndoLog,
        options: &PlannerOptions,
    ) -> RestorationPlan<'a> {
        let mode = select_mode(undo_log, options);
        tracing::info!("Planning {} restoration", mode);

        let mut plan = RestorationPlan {
            undo_log,
            mode,
            actions: Vec::new(),
            missing_values: Vec::new(),
            warnings: Vec::new(),
            resolved_values: BTreeMap::new(),
        };

        self.plan_placeholders(&mut plan, options);

        for op in &undo_log.file_operations {
            if !is_safe_relative(&op.path) {
                plan.warnings.push(format!(
                    "Skipping {}: path escapes the project root",
                    op.path.display()
                ));
                continue;
            }
            if contains_sanitized_marker(&op.path.to_string_lossy()) {
                plan.warnings.push(format!(
                    "Skipping {}: path was redacted when the log was sanitized",
                    op.path.display()
                ));
                continue;
            }
            if mode == RestorationMode::Selective
                && !options.restore_files.is_empty()
                && !is_selected(&op.path, &options.restore_files)
            {
                continue;
            }
            if let Some(action) = self.plan_operation(op, &plan.resolved_values, options, &mut plan.warnings) {
                plan.actions.push(action);
            }
        }

        if mode == RestorationMode::Selective {
            if options.restore_placeholders_only {
                plan.actions.push(Action::RestorePlaceholdersOnly {
                    note: "Only placeholder values are restored; file content is otherwise kept"
                        .to_string(),
                });
            }
            if !options.restore_files.is_empty() {
                let listed: Vec<String> = options
                    .restore_files
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect();
                let matched = plan.actions.iter().filter(|a| a.path().is_some()).count();
                plan.actions.push(Action::SelectiveNote {
                    note: format!(
                        "Selective restore of {} ({} action(s)); other files are left as they are",
                        listed.join(", "),
                        matched
                    ),
                });
                for requested in &options.restore_files {
                    let known = undo_log
                        .file_operations
                        .iter()
                        .any(|op| is_selected(&op.path, std::slice::from_ref(requested)));
                    if !known {
                        plan.warnings.push(format!(
                            "{} is not recorded in the undo log",
                            requested.display()
                        ));
                    }
                }
            }
        }

        plan.warnings.extend(validate_plan(&plan.actions));

        for warning in &plan.warnings {
            tracing::warn!("{}", warning);
        }
        tracing::info!(
            "Plan has {} action(s), {} missing value(s)",
            plan.actions.len(),
            plan.missing_values.len()
        );

        plan
    }

    /// Placeholders whose logged value was redacted and not yet provided.
    ///
    /// Same result as the plan's `missing_values`, without building the plan.
    pub fn missing_values(&self, undo_log: &UndoLog, options: &PlannerOptions) -> Vec<String> {
        undo_log
            .original_values
            .iter()
            .filter(|(placeholder, value)| {
                contains_sanitized_marker(value)
                    && !options.provided_values.contains_key(*placeholder)
            })
            .map(|(placeholder, _)| placeholder.clone())
            .collect()
    }

    /// Resolve placeholder values; redacted ones come from `provided_values`.
    fn plan_placeholders(&self, plan: &mut RestorationPlan<'_>, options: &PlannerOptions) {
        for (placeholder, value) in &plan.undo_log.original_values {
            if !contains_sanitized_marker(value) {
                plan.resolved_values.insert(placeholder.clone(), value.clone());
                continue;
            }
            match options.provided_values.get(placeholder) {
                Some(provided) => {
                    plan.resolved_values.insert(placeholder.clone(), provided.clone());
                    plan.actions.push(Action::UseDefaultValue {
                        placeholder: placeholder.clone(),
                        note: "redacted value supplied from defaults or input".to_string(),
                    });
                }
                None => plan.missing_values.push(placeholder.clone()),
            }
        }
    }

    /// Map one recorded operation to an action.
    fn plan_operation(
        &self,
        op: &FileOperation,
        resolved: &BTreeMap<String, String>,
        options: &PlannerOptions,
        warnings: &mut Vec<String>,
    ) -> Option<Action> {
        match (op.op_type, op.restoration_action) {
            (FileOperationType::Modified, _) => {
                if !self.root.join(&op.path).exists() {
                    warnings.push(format!(
                        "{} no longer exists; skipping its restoration",
                        op.path.display()
                    ));
                    return None;
                }
                let replacements = reverse_replacements(&op.placeholder_replacements, resolved);
                let content = op
                    .original_content
                    .as_ref()
                    .filter(|c| !options.restore_placeholders_only && !contains_sanitized_marker(c))
                    .cloned();
                if content.is_none() && replacements.is_empty() {
                    warnings.push(format!(
                        "{} has neither recorded content nor replacements to reverse",
                        op.path.display()
                    ));
                }
                Some(Action::RestoreFile {
                    path: op.path.clone(),
                    content,
                    placeholder_replacements: replacements,
                })
            }
            (FileOperationType::Deleted, RestorationAction::RestoreContent) => {
                match &op.original_content {
                    Some(content) => {
                        if contains_sanitized_marker(content) {
                            warnings.push(format!(
                                "{} was recorded with redacted values; review it after restoring",
                                op.path.display()
                            ));
                        }
                        Some(Action::RecreateFile {
                            path: op.path.clone(),
                            content: Some(content.clone()),
                        })
                    }
                    None => {
                        warnings.push(format!(
                            "{} was deleted without recorded content and cannot be recreated",
                            op.path.display()
                        ));
                        None
                    }
                }
            }
            (FileOperationType::Deleted, RestorationAction::Regenerate) => {
                Some(Action::RecreateDirectory {
                    path: op.path.clone(),
                    regeneration_command: op.regeneration_command.clone(),
                })
            }
            (FileOperationType::Deleted | FileOperationType::Created, RestorationAction::Preserve) => {
                Some(Action::PreserveFile {
                    path: op.path.clone(),
                })
            }
            (op_type, action) => {
                warnings.push(format!(
                    "{}: no restoration for a {} file with action {}",
                    op.path.display(),
                    op_type,
                    action
                ));
                None
            }
        }
    }
}

/// Pick the restoration mode.
fn select_mode(undo_log: &UndoLog, options: &PlannerOptions) -> RestorationMode {
    if !options.restore_files.is_empty() || options.restore_placeholders_only {
        RestorationMode::Selective
    } else if undo_log.sanitized || options.sanitized {
        RestorationMode::Sanitized
    } else {
        RestorationMode::Full
    }
}

/// Whether `path` equals or lies under one of `selected`.
fn is_selected(path: &Path, selected: &[PathBuf]) -> bool {
    let path = strip_cur_dir(path);
    selected
        .iter()
        .any(|s| path.starts_with(strip_cur_dir(s)))
}

fn strip_cur_dir(path: &Path) -> &Path {
    path.strip_prefix(".").unwrap_or(path)
}

/// Reverse conversion replacements: placeholder -> original value.
///
/// Values come from `resolved` when available, so redacted literals are
/// replaced by the value the user supplied.
pub fn reverse_replacements(
    replacements: &[Replacement],
    resolved: &BTreeMap<String, String>,
) -> Vec<Replacement> {
    replacements
        .iter()
        .map(|r| {
            let mut reversed = r.reversed();
            if let Some(value) = resolved.get(&reversed.from) {
                reversed.to = value.clone();
            }
            reversed
        })
        .collect()
}

/// Flag same-path actions with contradictory intents and incomplete actions.
pub fn validate_plan(actions: &[Action]) -> Vec<String> {
    let mut warnings = Vec::new();
    let mut by_path: HashMap<&Path, Vec<&'static str>> = HashMap::new();

    for action in actions {
        if let Some(path) = action.path() {
            by_path.entry(path).or_default().push(action.kind());
        }
        match action {
            Action::RecreateFile { path, content: None } => warnings.push(format!(
                "recreate-file for {} has no content",
                path.display()
            )),
            Action::RestoreFile {
                path,
                content: None,
                placeholder_replacements,
            } if placeholder_replacements.is_empty() => warnings.push(format!(
                "restore-file for {} has no content and no replacements",
                path.display()
            )),
            _ => {}
        }
    }

    let mut paths: Vec<_> = by_path.into_iter().collect();
    paths.sort_by(|a, b| a.0.cmp(b.0));
    for (path, mut kinds) in paths {
        kinds.sort_unstable();
        kinds.dedup();
        if kinds.len() > 1 {
            warnings.push(format!(
                "Contradictory actions for {}: {}",
                path.display(),
                kinds.join(", ")
            ));
        }
    }

    warnings
}
