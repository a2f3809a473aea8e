//! Init-defaults command implementation.

use crate::cli::args::Cli;
use crate::core::defaults::DefaultsManager;
use crate::core::undo_log::read_undo_log;
use crate::Result;
use colored::Colorize;

/// Scaffold a defaults file for the placeholders recorded in the undo log.
pub async fn init_defaults(cli: &Cli) -> Result<()> {
    let undo_log = read_undo_log(&cli.undo_log_path()).await?;
    let placeholders: Vec<String> = undo_log.original_values.keys().cloned().collect();

    let path = cli.defaults_path();
    DefaultsManager::new(&path)
        .generate_defaults_file(&placeholders, cli.force)
        .await?;

    println!(
        "{} {}",
        "[OK] Defaults file written to:".bold().green(),
        path.display()
    );
    println!("  {} {}", "Placeholders:".bold(), placeholders.len());
    println!();
    println!("{}", "[Next Steps]".bold().cyan());
    println!("  Edit the values, then run:");
    println!(
        "     {}",
        format!("templatize --restore --silent {}", cli.project_dir.display()).bold()
    );
    Ok(())
}
