//! CLI argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// addonlint - Browser extension manifest linter
#[derive(Parser)]
#[command(name = "addonlint")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Lint an extension directory
    Lint {
        /// Extension directory containing manifest.json
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Lint as a privileged add-on
        #[arg(long)]
        privileged: bool,

        /// The add-on is distributed outside the store
        #[arg(long)]
        self_hosted: bool,

        /// The add-on was already signed
        #[arg(long)]
        already_signed: bool,

        /// Override the manifest's strict_min_version
        #[arg(long, value_name = "VERSION")]
        min_version: Option<String>,

        /// Browser compatibility data (JSON)
        #[arg(long, value_name = "FILE")]
        compat_data: Option<PathBuf>,
    },

    /// Initialize configuration
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
