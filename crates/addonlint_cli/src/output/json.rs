//! JSON output formatter

use addonlint_core::LintReport;
use miette::{IntoDiagnostic, Result};

pub fn output_json(report: &LintReport) -> Result<()> {
    let output = serde_json::json!({
        "valid": report.valid,
        "summary": {
            "errors": report.errors.len(),
            "warnings": report.warnings.len(),
            "notices": report.notices.len(),
        },
        "errors": report.errors,
        "warnings": report.warnings,
        "notices": report.notices,
        "metadata": report.metadata,
    });
    println!(
        "{}",
        serde_json::to_string_pretty(&output).into_diagnostic()?
    );
    Ok(())
}
