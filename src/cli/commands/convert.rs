//! Convert command implementation.
//!
//! Reads a conversion plan, records the undo log and applies the plan.

use crate::cli::args::Cli;
use crate::core::categorizer::FileCategorizer;
use crate::core::converter::convert_project;
use crate::core::undo_log::UndoLogOptions;
use crate::models::config::Config;
use crate::models::conversion::{ConversionAction, ConversionPlan};
use crate::{Error, Result};
use colored::Colorize;
use std::path::Path;

/// Load a conversion plan from a JSON file.
pub async fn load_plan(path: &Path) -> Result<ConversionPlan> {
    if !path.exists() {
        return Err(Error::PathNotFound(path.display().to_string()));
    }
    let content = tokio::fs::read_to_string(path).await?;
    let plan: ConversionPlan = serde_json::from_str(&content)?;
    Ok(plan)
}

/// Record and apply a conversion plan.
pub async fn convert(cli: &Cli, plan_file: &Path, config: &Config) -> Result<()> {
    println!("{}", "[CONVERT] Converting project to template".bold().cyan());
    println!();

    println!("[INFO] Loading plan: {}", plan_file.display());
    let plan = load_plan(plan_file).await?;

    println!("  {} {}", "Project type:".bold(), plan.analysis.project_type);
    println!("  {} {}", "Placeholders:".bold(), plan.analysis.placeholders.len());
    println!("  {} {}", "Actions:".bold(), plan.actions.len());
    println!();

    if cli.dry_run {
        println!("{}", "[DRY-RUN] Showing what would be done:".bold().yellow());
        for action in &plan.actions {
            let verb = match action {
                ConversionAction::Modify { replacements, .. } => {
                    format!("modify ({} replacement(s))", replacements.len())
                }
                ConversionAction::Delete { .. } => "delete".to_string(),
                ConversionAction::Create { .. } => "create".to_string(),
            };
            println!("  - {} {}", verb.cyan(), action.path().display());
        }
        println!();
        println!("{}", "[OK] Dry run complete - no changes were made".green());
        return Ok(());
    }

    let categorizer = FileCategorizer::from_config(&cli.project_dir, &config.categorizer);
    let options = UndoLogOptions {
        sanitize: cli.sanitize_undo,
        ..Default::default()
    };
    let undo_log_path = cli.undo_log_path();

    let (undo_log, report) = convert_project(categorizer, &plan, &options, &undo_log_path).await?;

    println!(
        "{} {}",
        "[OK] Undo log saved to:".bold().green(),
        undo_log_path.display()
    );
    if undo_log.sanitized {
        let redacted: usize = undo_log.sanitization_map.values().map(Vec::len).sum();
        println!(
            "  {} {} location(s) redacted; provide those values at restore time",
            "Sanitized:".bold(),
            redacted
        );
    }
    println!("  {} {}", "Applied:".bold(), report.applied);

    if !report.success() {
        println!();
        println!("{}", "[ERRORS]".bold().red());
        for error in &report.errors {
            println!("  - {}", error);
        }
        return Err(Error::ProcessingError(format!(
            "{} conversion action(s) failed",
            report.errors.len()
        )));
    }

    println!();
    println!("{}", "[Next Steps]".bold().yellow());
    println!(
        "  To restore the project: {}",
        format!("templatize --restore {}", cli.project_dir.display()).cyan()
    );

    Ok(())
}
