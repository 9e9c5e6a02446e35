//! addonlint CLI
//!
//! Validates the manifest of a browser extension package.

mod cli;
mod commands;
mod output;

use std::process::ExitCode;

use clap::Parser;
use miette::Result;
use tracing::error;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use commands::lint::LintArgs;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(has_errors) => {
            if has_errors {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            error!("{:?}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<bool> {
    match &cli.command {
        Commands::Lint {
            dir,
            format,
            privileged,
            self_hosted,
            already_signed,
            min_version,
            compat_data,
        } => commands::lint::run_lint(
            &cli,
            LintArgs {
                dir,
                format: *format,
                privileged: *privileged,
                self_hosted: *self_hosted,
                already_signed: *already_signed,
                min_version: min_version.as_deref(),
                compat_data: compat_data.as_deref(),
            },
        ),
        Commands::Init { force } => commands::init::run_init(*force).map(|_| false),
    }
}
