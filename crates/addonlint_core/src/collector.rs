//! Diagnostic accumulation.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::diagnostic::{Diagnostic, Severity};
use crate::messages::Catalog;

/// Accumulates diagnostics from every phase of a lint run.
///
/// Appends go through a mutex so concurrent asset checks can share one
/// collector by reference.
pub struct DiagnosticsCollector {
    diagnostics: Mutex<Vec<Diagnostic>>,
    catalog: Arc<Catalog>,
}

impl DiagnosticsCollector {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            diagnostics: Mutex::new(Vec::new()),
            catalog,
        }
    }

    /// Appends a diagnostic.
    pub fn add(&self, diagnostic: Diagnostic) {
        self.diagnostics.lock().push(diagnostic);
    }

    /// Appends a diagnostic unless one with the same code and file exists.
    ///
    /// Returns whether the diagnostic was added.
    pub fn add_unique(&self, diagnostic: Diagnostic) -> bool {
        let mut diagnostics = self.diagnostics.lock();
        let duplicate = diagnostics
            .iter()
            .any(|d| d.code == diagnostic.code && d.file == diagnostic.file);
        if duplicate {
            return false;
        }
        diagnostics.push(diagnostic);
        true
    }

    pub fn extend(&self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.lock().extend(diagnostics);
    }

    pub fn len(&self) -> usize {
        self.diagnostics.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.lock().is_empty()
    }

    /// Whether the collected diagnostics leave the package valid.
    ///
    /// Errors invalidate, as do codes the catalog marks as always
    /// invalidating whatever their severity.
    pub fn is_valid(&self) -> bool {
        self.diagnostics
            .lock()
            .iter()
            .all(|d| !d.is_error() && !self.catalog.is_always_invalidating(d.code))
    }

    /// Returns a copy of the diagnostics in emission order.
    pub fn snapshot(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }

    /// Returns the diagnostics of one severity in emission order.
    pub fn with_severity(&self, severity: Severity) -> Vec<Diagnostic> {
        self.diagnostics
            .lock()
            .iter()
            .filter(|d| d.severity == severity)
            .cloned()
            .collect()
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics.into_inner()
    }
}
