//! Lint command implementation

use std::path::Path;

use addonlint_core::{DirectoryPackage, LinterConfig, ManifestLinter};
use miette::{IntoDiagnostic, Result};
use tracing::info;

use crate::cli::{Cli, OutputFormat};
use crate::output::output_report;

/// Flags of the `lint` subcommand.
pub struct LintArgs<'a> {
    pub dir: &'a Path,
    pub format: OutputFormat,
    pub privileged: bool,
    pub self_hosted: bool,
    pub already_signed: bool,
    pub min_version: Option<&'a str>,
    pub compat_data: Option<&'a Path>,
}

/// Lints one extension directory. Returns whether the package is invalid.
pub fn run_lint(cli: &Cli, args: LintArgs<'_>) -> Result<bool> {
    let mut config = if let Some(ref path) = cli.config {
        LinterConfig::from_file(path).into_diagnostic()?
    } else {
        find_config(args.dir)?
    };

    // Flags only ever switch options on.
    config.privileged |= args.privileged;
    config.self_hosted |= args.self_hosted;
    config.already_signed |= args.already_signed;
    if let Some(min_version) = args.min_version {
        config.min_version = Some(min_version.to_string());
    }
    if let Some(path) = args.compat_data {
        config.compat_data = Some(std::path::absolute(path).into_diagnostic()?);
    }

    let linter = ManifestLinter::from_config(&config).into_diagnostic()?;
    let package = DirectoryPackage::new(args.dir).into_diagnostic()?;
    let context = config.to_context();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;
    let report = runtime
        .block_on(linter.lint_package(&package, &context))
        .into_diagnostic()?;

    output_report(args.dir, &report, args.format)?;
    Ok(!report.valid)
}

/// Looks for a config file in the extension directory, then in the
/// working directory.
pub fn find_config(dir: &Path) -> Result<LinterConfig> {
    if let Some(path) = LinterConfig::discover(dir).or_else(|| LinterConfig::discover(".")) {
        info!("Using config: {}", path.display());
        return LinterConfig::from_file(&path).into_diagnostic();
    }

    info!("No config file found, using defaults");
    Ok(LinterConfig::new())
}
