//! Restore command implementation.
//!
//! Reads the undo log and puts the original project back, or previews what
//! would be done with --dry-run.

use crate::cli::args::Cli;
use crate::core::engine::{PlanPreview, RestorationEngine, RestoreOptions, RestoreOutcome};
use crate::core::processor::ProcessorOptions;
use crate::core::prompter::TerminalInput;
use crate::models::config::Config;
use crate::models::restoration::{ConflictType, ExecutionResult};
use crate::{Error, Result};
use colored::Colorize;

/// Run a restore.
pub async fn restore(cli: &Cli, config: &Config) -> Result<()> {
    println!("{}", "[RESTORE] Restoring project from undo log".bold().cyan());
    println!();
    println!("  {} {}", "Project:".bold(), cli.project_dir.display());
    println!("  {} {}", "Undo log:".bold(), cli.undo_log_path().display());
    println!();

    let silent = cli.is_silent();
    let options = RestoreOptions {
        project_root: cli.project_dir.clone(),
        undo_log_path: Some(cli.undo_log_path()),
        defaults_path: Some(cli.defaults_path()),
        dry_run: cli.dry_run,
        yes: cli.yes,
        restore_files: cli.restore_files.clone(),
        restore_placeholders: cli.restore_placeholders,
        silent,
        processor: ProcessorOptions {
            create_backups: config.restore.create_backups && !cli.no_backup,
            keep_backups: config.restore.keep_backups && !cli.discard_backups,
            backup_dir: config.restore.backup_dir.clone(),
            show_progress: !silent,
            ..Default::default()
        },
    };

    let mut input = TerminalInput::new();
    let mut engine = RestorationEngine::new(options, &mut input);

    match engine.restore().await? {
        RestoreOutcome::DryRun(preview) => {
            print_preview(&preview);
            println!();
            if preview.missing_values.is_empty() {
                println!("{}", "[OK] Dry run complete - no changes were made".green());
            } else {
                println!(
                    "{}",
                    "[WARNING] Dry run complete - some values still need to be provided".yellow()
                );
            }
            println!();
            println!("{}", "[Next Steps]".bold().cyan());
            println!("  To actually restore:");
            println!(
                "     {}",
                format!("templatize --restore {}", cli.project_dir.display()).bold()
            );
            Ok(())
        }
        RestoreOutcome::Declined(preview) => {
            print_preview(&preview);
            println!();
            println!("{}", "[INFO] Restore cancelled - no changes were made".yellow());
            Ok(())
        }
        RestoreOutcome::Completed { warnings, result } => {
            print_warnings(&warnings);
            print_result(&result);

            if result.success {
                println!();
                println!("{}", "[OK] Restore completed successfully!".green());
                Ok(())
            } else {
                Err(Error::RestorationPartialFailure {
                    failed: result.failed_count(),
                    total: result.action_results.len(),
                })
            }
        }
    }
}

fn print_warnings(warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }
    println!("{}", "[WARNING] Plan warnings:".bold().yellow());
    for warning in warnings {
        println!("  - {}", warning);
    }
    println!();
}

fn print_preview(preview: &PlanPreview) {
    println!("{}", "[PLAN] Restoration plan".bold().cyan());
    println!("  {} {}", "Project type:".bold(), preview.project_type);
    println!("  {} {}", "Mode:".bold(), preview.mode);
    println!("  {} {}", "Actions:".bold(), preview.actions.len());
    println!();

    for (i, action) in preview.actions.iter().enumerate() {
        let label = format!("[{}]", action.kind());
        let label = if action.is_mutating() {
            label.cyan()
        } else {
            label.dimmed()
        };
        println!("  {:>3}. {} {}", i + 1, label, action.describe());
    }

    if !preview.conflicts.is_empty() {
        println!();
        println!("{}", "[CONFLICTS]".bold().yellow());
        for conflict in &preview.conflicts {
            let line = conflict.to_string();
            if conflict.conflict_type == ConflictType::FileExists {
                println!("  - {}", line.dimmed());
            } else {
                println!("  - {}", line.yellow());
            }
        }
    }

    if !preview.missing_values.is_empty() {
        println!();
        println!("{}", "[MISSING VALUES]".bold().red());
        for placeholder in &preview.missing_values {
            println!("  - {}", placeholder);
        }
    }

    println!();
    print_warnings(&preview.warnings);
}

fn print_result(result: &ExecutionResult) {
    let skipped = result
        .action_results
        .iter()
        .filter(|r| r.success && r.skipped)
        .count();

    println!();
    println!("{}", "[SUMMARY] Restore Summary".bold().green());
    println!("  {} {}", "Successful:".bold(), result.actions_executed - skipped);
    println!("  {} {}", "Skipped:".bold(), skipped);
    println!("  {} {}", "Failed:".bold(), result.failed_count());
    if !result.backups.is_empty() {
        println!("  {} {}", "Backups:".bold(), result.backups.len());
    }

    if result.failed_count() > 0 {
        println!();
        println!("{}", "[ERRORS]".bold().red());
        for failure in result.failures() {
            println!(
                "  - {} {}: {}",
                failure.action,
                failure
                    .path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default(),
                failure.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    if !result.rollback_errors.is_empty() {
        println!();
        println!(
            "{}",
            "[ROLLBACK FAILED] The project may be partially restored:"
                .bold()
                .red()
        );
        for error in &result.rollback_errors {
            println!("  - {}", error);
        }
    }

    if !result.cleanup_guidance.is_empty() {
        println!();
        println!("{}", "[Next Steps]".bold().cyan());
        for line in &result.cleanup_guidance {
            println!("  - {}", line);
        }
    }
}
