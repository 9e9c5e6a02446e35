//! Lint report.

use serde::{Deserialize, Serialize};

use crate::collector::DiagnosticsCollector;
use crate::diagnostic::{Diagnostic, Severity};
use crate::metadata::Metadata;

/// The outcome of linting one manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintReport {
    /// Whether the package passes validation.
    pub valid: bool,

    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    pub notices: Vec<Diagnostic>,

    /// Extracted metadata. Absent when the manifest could not be read.
    pub metadata: Option<Metadata>,
}

impl LintReport {
    /// Builds a report from everything collected during a run.
    pub fn from_collector(collector: &DiagnosticsCollector, metadata: Option<Metadata>) -> Self {
        Self {
            valid: collector.is_valid(),
            errors: collector.with_severity(Severity::Error),
            warnings: collector.with_severity(Severity::Warning),
            notices: collector.with_severity(Severity::Notice),
            metadata,
        }
    }

    /// All diagnostics, errors first.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.errors
            .iter()
            .chain(self.warnings.iter())
            .chain(self.notices.iter())
    }

    pub fn len(&self) -> usize {
        self.errors.len() + self.warnings.len() + self.notices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
