//! Text output formatter

use std::path::Path;

use addonlint_core::LintReport;

pub fn output_text(dir: &Path, report: &LintReport) {
    if !report.is_empty() {
        println!("\n{}:", dir.display());
    }
    for diag in report.diagnostics() {
        let location = diag.file.as_deref().unwrap_or("manifest.json");
        println!(
            "  {} {} [{}]: {}",
            location,
            diag.severity.as_str(),
            diag.code,
            diag.message
        );
        if let Some(description) = &diag.description {
            println!("      {}", description);
        }
    }

    println!();
    println!(
        "{}: {} errors, {} warnings, {} notices",
        if report.valid { "Valid" } else { "Invalid" },
        report.errors.len(),
        report.warnings.len(),
        report.notices.len()
    );
}
