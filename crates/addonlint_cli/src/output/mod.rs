//! Output formatting module

mod json;
mod text;

use std::path::Path;

use addonlint_core::LintReport;
use miette::Result;

use crate::cli::OutputFormat;

pub fn output_report(dir: &Path, report: &LintReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => json::output_json(report)?,
        OutputFormat::Text => text::output_text(dir, report),
    }
    Ok(())
}
