//! Inspect command implementation.
//!
//! Validates an undo log and prints what it would restore.

use crate::cli::args::Cli;
use crate::core::sanitizer::contains_sanitized_marker;
use crate::core::undo_log::{check_integrity, read_undo_log};
use crate::models::undo_log::{FileCategory, FileOperationType};
use crate::Result;
use colored::Colorize;
use std::collections::BTreeMap;

/// Print an undo log summary.
pub async fn inspect(cli: &Cli) -> Result<()> {
    let path = cli.undo_log_path();
    let undo_log = read_undo_log(&path).await?;

    println!("{}", "[INSPECT] Undo log".bold().cyan());
    println!("  {} {}", "File:".bold(), path.display());
    println!("  {} {}", "Version:".bold(), undo_log.version);
    println!("  {} {}", "Created by:".bold(), undo_log.metadata.tool_version);
    println!("  {} {}", "Project type:".bold(), undo_log.metadata.project_type);
    println!("  {} {}", "Created at:".bold(), undo_log.metadata.timestamp);
    println!(
        "  {} {}",
        "Sanitized:".bold(),
        if undo_log.sanitized { "yes" } else { "no" }
    );
    println!();

    println!("{}", "[PLACEHOLDERS]".bold());
    for (placeholder, value) in &undo_log.original_values {
        if contains_sanitized_marker(value) {
            println!("  {} = {}", placeholder, value.yellow());
        } else {
            println!("  {} = {}", placeholder, value);
        }
    }
    println!();

    let mut by_category: BTreeMap<FileCategory, [usize; 3]> = BTreeMap::new();
    for op in &undo_log.file_operations {
        let counts = by_category.entry(op.category).or_default();
        match op.op_type {
            FileOperationType::Modified => counts[0] += 1,
            FileOperationType::Deleted => counts[1] += 1,
            FileOperationType::Created => counts[2] += 1,
        }
    }
    println!("{}", "[FILE OPERATIONS]".bold());
    for (category, [modified, deleted, created]) in &by_category {
        println!(
            "  {:<14} modified: {}, deleted: {}, created: {}",
            category.to_string(),
            modified,
            deleted,
            created
        );
    }

    if !undo_log.sanitization_map.is_empty() {
        println!();
        println!("{}", "[REDACTED]".bold());
        for (category, locations) in &undo_log.sanitization_map {
            println!("  {}: {}", category, locations.join(", "));
        }
    }

    let warnings = check_integrity(&undo_log);
    if !warnings.is_empty() {
        println!();
        println!("{}", "[WARNING] Integrity warnings:".bold().yellow());
        for warning in &warnings {
            println!("  - {}", warning);
        }
    } else {
        println!();
        println!("{}", "[OK] Undo log is valid".green());
    }

    Ok(())
}
