//! # addonlint_core
//!
//! Manifest validation engine for browser extensions.
//!
//! This crate provides:
//! - The [`ManifestLinter`] orchestrator
//! - Schema issue classification
//! - Structural, CSP and compatibility rules
//! - Concurrent icon and theme image checks
//! - Configuration loading
//!
//! ## Example
//!
//! ```rust,ignore
//! use addonlint_core::{DirectoryPackage, LinterConfig, ManifestLinter};
//!
//! let config = LinterConfig::from_file(".addonlint.json")?;
//! let linter = ManifestLinter::from_config(&config)?;
//! let package = DirectoryPackage::new("my-extension")?;
//!
//! let report = linter.lint_package(&package, &config.to_context()).await?;
//! println!("valid: {}, {} errors", report.valid, report.errors.len());
//! ```

pub mod assets;
mod classifier;
mod collector;
pub mod compat;
mod config;
mod context;
pub mod csp;
mod diagnostic;
mod error;
mod linter;
mod messages;
mod metadata;
pub mod package;
mod policy;
mod result;
pub mod rules;
pub mod version;

pub use assets::{AssetValidator, HeaderDecoder, ImageDecoder, ImageInfo};
pub use classifier::ErrorClassifier;
pub use collector::DiagnosticsCollector;
pub use compat::{CompatError, CompatibilityChecker, CompatibilityIndex};
pub use config::LinterConfig;
pub use context::{FeatureFlags, ValidationContext};
pub use csp::CspAnalyzer;
pub use diagnostic::{Diagnostic, Severity};
pub use error::LinterError;
pub use linter::{MANIFEST_FILE, ManifestLinter};
pub use messages::{Catalog, MessageCode, Template};
pub use metadata::Metadata;
pub use package::{DirectoryPackage, FileOracle, MemoryPackage, StreamMode};
pub use policy::Policy;
pub use result::LintReport;
pub use rules::RuleEngine;

pub use addonlint_manifest::{AddonKind, ManifestDocument, SchemaAnnotations};
