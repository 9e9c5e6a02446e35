//! Linter error types.

use thiserror::Error;

/// Errors that stop a lint run before any diagnostic can be produced.
#[derive(Debug, Error)]
pub enum LinterError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// File error.
    #[error("File error: {0}")]
    File(String),

    /// Manifest error.
    #[error("Manifest error: {0}")]
    Manifest(#[from] addonlint_manifest::ManifestError),

    /// Compatibility data error.
    #[error("Compatibility data error: {0}")]
    Compat(#[from] crate::compat::CompatError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LinterError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a file error.
    pub fn file(message: impl Into<String>) -> Self {
        Self::File(message.into())
    }
}
