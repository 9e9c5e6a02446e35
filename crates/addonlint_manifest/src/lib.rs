//! # addonlint_manifest
//!
//! Manifest document model and schema adapter for addonlint.
//!
//! This crate provides:
//! - [`ManifestDocument`], the parsed `manifest.json` with its addon kind
//! - The one-time normalization of legacy manifest shapes
//! - [`RawSchemaIssue`], the enumerated findings of schema validation
//! - [`JsonSchemaAdapter`], a [`SchemaValidator`] backed by `jsonschema`

mod document;
mod issue;
mod schema;

pub use document::{AddonKind, DEFAULT_MANIFEST_VERSION, LegacyShape, ManifestDocument};
pub use issue::{IssueKind, PathToken, RawSchemaIssue};
pub use schema::{
    DeprecatedProperty, JsonSchemaAdapter, ManifestVersionGate, PermissionGate, SchemaAnnotations,
    SchemaOptions, SchemaOutcome, SchemaValidator,
};

use thiserror::Error;

/// Error type for manifest operations.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Manifest must be a JSON object, found {0}")]
    NotAnObject(&'static str),
    #[error("Invalid manifest schema: {0}")]
    SchemaError(String),
}
