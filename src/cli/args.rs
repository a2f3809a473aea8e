//! Command line argument definitions.

use clap::Parser;
use std::path::PathBuf;

/// Templatize - turn projects into templates and restore them
#[derive(Parser, Debug)]
#[command(name = "templatize")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Project directory
    #[arg(value_name = "PROJECT_DIR", default_value = ".")]
    pub project_dir: PathBuf,

    /// Restore the project from its undo log
    #[arg(long)]
    pub restore: bool,

    /// Dry run - show what would be done
    #[arg(long)]
    pub dry_run: bool,

    /// Do not ask for confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Only restore these files or directories (comma separated)
    #[arg(long, value_name = "FILES", value_delimiter = ',')]
    pub restore_files: Vec<PathBuf>,

    /// Only put placeholder values back
    #[arg(long)]
    pub restore_placeholders: bool,

    /// Redact sensitive values in the undo log
    #[arg(long)]
    pub sanitize_undo: bool,

    /// Never prompt; use defaults only
    #[arg(long)]
    pub silent: bool,

    /// Conversion plan to record and apply
    #[arg(long, value_name = "FILE", conflicts_with = "restore")]
    pub plan: Option<PathBuf>,

    /// Undo log path (default: <PROJECT_DIR>/.template-undo.json)
    #[arg(long, value_name = "FILE")]
    pub undo_log: Option<PathBuf>,

    /// Defaults file path (default: <PROJECT_DIR>/.restore-defaults.json)
    #[arg(long, value_name = "FILE")]
    pub defaults: Option<PathBuf>,

    /// Do not back up files before overwriting them
    #[arg(long)]
    pub no_backup: bool,

    /// Delete backups after a successful restore
    #[arg(long)]
    pub discard_backups: bool,

    /// Write a starter defaults file for the undo log's placeholders
    #[arg(long)]
    pub init_defaults: bool,

    /// Overwrite an existing defaults file
    #[arg(long)]
    pub force: bool,

    /// Show a summary of the undo log
    #[arg(long)]
    pub inspect: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Silent via flag, `TEMPLATIZE_SILENT` or a CI environment.
    pub fn is_silent(&self) -> bool {
        let env_silent = std::env::var("TEMPLATIZE_SILENT")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        self.silent || env_silent || std::env::var_os("CI").is_some()
    }

    pub fn undo_log_path(&self) -> PathBuf {
        self.undo_log.clone().unwrap_or_else(|| {
            self.project_dir
                .join(crate::models::undo_log::DEFAULT_UNDO_LOG_FILE)
        })
    }

    pub fn defaults_path(&self) -> PathBuf {
        self.defaults.clone().unwrap_or_else(|| {
            self.project_dir
                .join(crate::models::defaults::DEFAULT_DEFAULTS_FILE)
        })
    }
}
