//! Restore orchestration.
//!
//! Ties the pieces together for one restore invocation: read the undo log,
//! resolve values from defaults and the prompter, plan, preview or confirm,
//! then execute.

use crate::core::defaults::DefaultsManager;
use crate::core::planner::{PlannerOptions, RestorationPlanner};
use crate::core::processor::{ProcessorOptions, RestorationProcessor};
use crate::core::prompter::{InputSource, InteractivePrompter};
use crate::core::undo_log::{check_integrity, read_undo_log};
use crate::models::defaults::DEFAULT_DEFAULTS_FILE;
use crate::models::restoration::{
    Action, Conflict, ConflictType, ExecutionResult, RestorationMode, RestorationPlan,
};
use crate::models::undo_log::{ProjectType, DEFAULT_UNDO_LOG_FILE};
use crate::{Error, Result};
use std::path::PathBuf;

/// Options for one restore invocation.
#[derive(Debug, Clone)]
pub struct RestoreOptions {
    pub project_root: PathBuf,
    /// Undo log path; defaults to `.template-undo.json` in the project.
    pub undo_log_path: Option<PathBuf>,
    /// Defaults file path; defaults to `.restore-defaults.json` in the project.
    pub defaults_path: Option<PathBuf>,
    pub dry_run: bool,
    /// Skip the confirmation prompt.
    pub yes: bool,
    pub restore_files: Vec<PathBuf>,
    pub restore_placeholders: bool,
    /// Never prompt; use defaults only.
    pub silent: bool,
    pub processor: ProcessorOptions,
}

impl RestoreOptions {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            undo_log_path: None,
            defaults_path: None,
            dry_run: false,
            yes: false,
            restore_files: Vec::new(),
            restore_placeholders: false,
            silent: false,
            processor: ProcessorOptions::default(),
        }
    }

    pub fn undo_log_path(&self) -> PathBuf {
        self.undo_log_path
            .clone()
            .unwrap_or_else(|| self.project_root.join(DEFAULT_UNDO_LOG_FILE))
    }

    pub fn defaults_path(&self) -> PathBuf {
        self.defaults_path
            .clone()
            .unwrap_or_else(|| self.project_root.join(DEFAULT_DEFAULTS_FILE))
    }
}

/// Owned snapshot of a plan, for display.
#[derive(Debug, Clone)]
pub struct PlanPreview {
    pub project_type: ProjectType,
    pub mode: RestorationMode,
    pub actions: Vec<Action>,
    pub missing_values: Vec<String>,
    pub warnings: Vec<String>,
    pub conflicts: Vec<Conflict>,
}

impl PlanPreview {
    fn new(plan: &RestorationPlan<'_>, conflicts: Vec<Conflict>) -> Self {
        Self {
            project_type: plan.undo_log.metadata.project_type,
            mode: plan.mode,
            actions: plan.actions.clone(),
            missing_values: plan.missing_values.clone(),
            warnings: plan.warnings.clone(),
            conflicts,
        }
    }
}

/// How a restore invocation ended.
#[derive(Debug)]
pub enum RestoreOutcome {
    /// Nothing was changed; the plan is returned for display.
    DryRun(PlanPreview),
    /// The user declined the confirmation prompt.
    Declined(PlanPreview),
    /// The plan was executed.
    Completed {
        warnings: Vec<String>,
        result: ExecutionResult,
    },
}

/// Restoration engine.
pub struct RestorationEngine<'a> {
    options: RestoreOptions,
    input: &'a mut dyn InputSource,
}

impl<'a> RestorationEngine<'a> {
    pub fn new(options: RestoreOptions, input: &'a mut dyn InputSource) -> Self {
        Self { options, input }
    }

    /// Run the restore.
    pub async fn restore(&mut self) -> Result<RestoreOutcome> {
        let root = self.options.project_root.clone();
        let log_path = self.options.undo_log_path();

        tracing::info!("Reading undo log {:?}", log_path);
        let undo_log = read_undo_log(&log_path).await?;
        for warning in check_integrity(&undo_log) {
            tracing::warn!("{}", warning);
        }

        let mut defaults = DefaultsManager::new(self.options.defaults_path());
        defaults.load_defaults().await?;

        let planner = RestorationPlanner::new(&root);
        let mut planner_options = PlannerOptions {
            restore_files: self.options.restore_files.clone(),
            restore_placeholders_only: self.options.restore_placeholders,
            sanitized: false,
            provided_values: Default::default(),
        };

        // Planned once, after values are resolved, so warnings are logged once.
        let missing = planner.missing_values(&undo_log, &planner_options);

        if !missing.is_empty() {
            tracing::info!("{} placeholder value(s) need resolving", missing.len());
            let resolved = defaults.resolve_defaults(&missing);
            planner_options.provided_values.extend(resolved.resolved);

            let interactive = !self.options.silent
                && !self.options.dry_run
                && defaults.config().prompt_for_missing;
            if !resolved.still_missing.is_empty() && interactive {
                let mut prompter = InteractivePrompter::new(&mut *self.input, false);
                let answers = prompter.prompt_for_missing(&resolved.still_missing)?;
                planner_options.provided_values.extend(answers);
            }
        }

        let plan = planner.create_restoration_plan(&undo_log, &planner_options);

        let processor =
            RestorationProcessor::with_options(&root, self.options.processor.clone());
        processor.validate_plan_structure(&plan)?;
        let conflicts = processor.detect_conflicts(&plan).await;

        if self.options.dry_run {
            return Ok(RestoreOutcome::DryRun(PlanPreview::new(&plan, conflicts)));
        }

        if !plan.is_fully_resolved() {
            return Err(Error::MissingRestorationValues(plan.missing_values.clone()));
        }

        // An existing target with identical content is harmless.
        let blocking: Vec<String> = conflicts
            .iter()
            .filter(|c| c.conflict_type != ConflictType::FileExists)
            .map(|c| c.to_string())
            .collect();
        if !blocking.is_empty() && !self.options.processor.create_backups {
            return Err(Error::RestorationConflict(blocking.join("; ")));
        }

        if !self.options.yes && !self.options.silent {
            let question = format!(
                "Apply {} restoration action(s) to {}?",
                plan.mutating_actions().count(),
                root.display()
            );
            if self.input.confirm(&question, false)? != Some(true) {
                tracing::info!("Restore declined");
                return Ok(RestoreOutcome::Declined(PlanPreview::new(&plan, conflicts)));
            }
        }

        let result = processor.execute_plan_with_safety(&plan).await?;
        Ok(RestoreOutcome::Completed {
            warnings: plan.warnings.clone(),
            result,
        })
    }
}
