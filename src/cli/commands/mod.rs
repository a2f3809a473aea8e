//! CLI command implementations.

pub mod convert;
pub mod defaults;
pub mod inspect;
pub mod restore;

use colored::Colorize;

/// Print an error with its suggested remediation steps.
pub fn print_error(err: &crate::Error) {
    eprintln!();
    eprintln!("{} {}", "[ERROR]".bold().red(), err);
    let suggestions = err.suggestions();
    if !suggestions.is_empty() {
        eprintln!();
        eprintln!("{}", "[Suggestions]".bold().cyan());
        for suggestion in suggestions {
            eprintln!("  - {}", suggestion);
        }
    }
}

/// Report a command result and map it to a process exit code.
///
/// Errors are printed here and nowhere else.
pub fn exit_code(result: &crate::Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            print_error(e);
            1
        }
    }
}
