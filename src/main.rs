//! Templatize CLI
//!
//! Converts a project into a template and restores it from the undo log.

use clap::Parser;
use templatize::cli::{
    args::Cli,
    commands::{self, convert, defaults, inspect, restore},
};
use templatize::models::config::load_config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    let config = load_config();

    let result = if cli.inspect {
        inspect::inspect(&cli).await
    } else if cli.init_defaults {
        defaults::init_defaults(&cli).await
    } else if cli.restore {
        restore::restore(&cli, &config).await
    } else if let Some(plan_file) = cli.plan.as_deref() {
        convert::convert(&cli, plan_file, &config).await
    } else {
        anyhow::bail!("Nothing to do: pass --plan <FILE> to convert or --restore to restore");
    };

    // Already reported; exit without a second error print from anyhow
    let code = commands::exit_code(&result);
    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}

/// Initialize the logging system.
fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("templatize=debug")
    } else {
        EnvFilter::new("templatize=info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
