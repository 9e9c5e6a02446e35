//! Schema validation adapter.
//!
//! The engine consumes schema validation only through [`SchemaValidator`].
//! [`JsonSchemaAdapter`] runs the embedded JSON schema with `jsonschema` and
//! adds the manifest-specific annotations (deprecations, manifest-version
//! gates, privileged properties) that a plain JSON schema cannot express.

use std::sync::{Arc, OnceLock};

use jsonschema::error::ValidationErrorKind;
use jsonschema::{ValidationError, Validator};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::issue::{IssueKind, PathToken, RawSchemaIssue};
use crate::{DEFAULT_MANIFEST_VERSION, ManifestError};

// Path is relative to this file: ../../../schemas/v1/manifest.json
const MANIFEST_SCHEMA_JSON: &str = include_str!("../../../schemas/v1/manifest.json");

static BUILTIN_SCHEMA: OnceLock<Arc<Validator>> = OnceLock::new();

/// Options passed to every validation call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemaOptions {
    /// Whether the add-on is signed as privileged.
    pub privileged: bool,
}

/// Result of one schema validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaOutcome {
    pub valid: bool,
    pub issues: Vec<RawSchemaIssue>,
}

/// The schema validation boundary.
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, document: &Value, options: &SchemaOptions) -> SchemaOutcome;
}

/// A property that is still accepted but deprecated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeprecatedProperty {
    pub pointer: String,
    pub message: String,
}

/// Manifest versions in which a property may be declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestVersionGate {
    pub pointer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u64>,
}

/// Manifest versions in which a permission may be requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGate {
    pub permission: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u64>,
}

/// Manifest rules layered on top of the JSON schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaAnnotations {
    pub deprecated: Vec<DeprecatedProperty>,
    pub manifest_version_gates: Vec<ManifestVersionGate>,
    pub permission_gates: Vec<PermissionGate>,
    /// Properties only privileged add-ons may declare.
    pub privileged_properties: Vec<String>,
    /// Permissions only privileged add-ons may request.
    pub privileged_permissions: Vec<String>,
    /// The permission every privileged add-on using privileged permissions must hold.
    pub amo_permission: String,
}

impl Default for SchemaAnnotations {
    fn default() -> Self {
        let theme_alias = |pointer: &str, replacement: &str| DeprecatedProperty {
            pointer: pointer.to_string(),
            message: format!(
                "Please use {}, this alias will be removed in a future release.",
                replacement
            ),
        };
        Self {
            deprecated: vec![
                theme_alias("/theme/images/headerURL", "theme.images.theme_frame"),
                theme_alias("/theme/colors/accentcolor", "theme.colors.frame"),
                theme_alias("/theme/colors/textcolor", "theme.colors.tab_background_text"),
            ],
            manifest_version_gates: vec![
                ManifestVersionGate {
                    pointer: "/applications".to_string(),
                    min: None,
                    max: Some(2),
                },
                ManifestVersionGate {
                    pointer: "/host_permissions".to_string(),
                    min: Some(3),
                    max: None,
                },
                ManifestVersionGate {
                    pointer: "/action".to_string(),
                    min: Some(3),
                    max: None,
                },
                ManifestVersionGate {
                    pointer: "/browser_action".to_string(),
                    min: None,
                    max: Some(2),
                },
            ],
            permission_gates: Vec::new(),
            privileged_properties: vec!["/hidden".to_string(), "/experiment_apis".to_string()],
            privileged_permissions: [
                "activityLog",
                "mozillaAddons",
                "networkStatus",
                "normandyAddonStudy",
                "telemetry",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            amo_permission: "mozillaAddons".to_string(),
        }
    }
}

/// [`SchemaValidator`] backed by `jsonschema`.
pub struct JsonSchemaAdapter {
    validator: Arc<Validator>,
    annotations: SchemaAnnotations,
}

impl JsonSchemaAdapter {
    /// Creates an adapter for the embedded manifest schema.
    pub fn builtin(annotations: SchemaAnnotations) -> Self {
        let validator = BUILTIN_SCHEMA.get_or_init(|| {
            let schema_json: Value =
                serde_json::from_str(MANIFEST_SCHEMA_JSON).expect("Invalid embedded schema");
            Arc::new(Validator::new(&schema_json).expect("Invalid schema compilation"))
        });
        Self {
            validator: Arc::clone(validator),
            annotations,
        }
    }

    /// Creates an adapter for a caller-supplied schema.
    pub fn with_schema(schema: &Value, annotations: SchemaAnnotations) -> Result<Self, ManifestError> {
        let validator =
            Validator::new(schema).map_err(|e| ManifestError::SchemaError(e.to_string()))?;
        Ok(Self {
            validator: Arc::new(validator),
            annotations,
        })
    }

    fn annotation_issues(&self, document: &Value, options: &SchemaOptions) -> Vec<RawSchemaIssue> {
        let manifest_version = document
            .get("manifest_version")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_MANIFEST_VERSION);
        let mut issues = Vec::new();

        for deprecated in &self.annotations.deprecated {
            if let Some(value) = document.pointer(&deprecated.pointer) {
                issues.push(RawSchemaIssue::at(
                    IssueKind::Deprecated,
                    &deprecated.pointer,
                    Some(value.clone()),
                    deprecated.message.clone(),
                ));
            }
        }

        for gate in &self.annotations.manifest_version_gates {
            if let Some(value) = document.pointer(&gate.pointer)
                && let Some(issue) =
                    version_gate_issue(gate.min, gate.max, manifest_version, &gate.pointer, value)
            {
                issues.push(issue);
            }
        }

        for key in ["permissions", "optional_permissions"] {
            let Some(Value::Array(items)) = document.get(key) else {
                continue;
            };
            for (index, item) in items.iter().enumerate() {
                let Some(name) = item.as_str() else {
                    continue;
                };
                for gate in self.annotations.permission_gates.iter().filter(|g| g.permission == name) {
                    let pointer = format!("/{}/{}", key, index);
                    if let Some(issue) =
                        version_gate_issue(gate.min, gate.max, manifest_version, &pointer, item)
                    {
                        issues.push(issue);
                    }
                }
            }
        }

        let privileged_listed = self.privileged_permissions_listed(document);

        if !options.privileged {
            for pointer in &self.annotations.privileged_properties {
                if let Some(value) = document.pointer(pointer) {
                    issues.push(RawSchemaIssue::at(
                        IssueKind::Privileged {
                            privileged_permissions: privileged_listed.clone(),
                        },
                        pointer,
                        Some(value.clone()),
                        "is a privileged property",
                    ));
                }
            }
        }

        let permissions_rule_fails = if options.privileged {
            privileged_listed.is_empty()
                || !privileged_listed
                    .iter()
                    .any(|p| *p == self.annotations.amo_permission)
        } else {
            !privileged_listed.is_empty()
        };
        if permissions_rule_fails {
            issues.push(RawSchemaIssue::at(
                IssueKind::PrivilegedPermissions {
                    privileged_permissions: privileged_listed,
                },
                "/permissions",
                document.get("permissions").cloned(),
                "fails the privileged permissions rule",
            ));
        }

        issues
    }

    fn privileged_permissions_listed(&self, document: &Value) -> Vec<String> {
        let Some(Value::Array(items)) = document.get("permissions") else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(Value::as_str)
            .filter(|name| self.annotations.privileged_permissions.iter().any(|p| p == name))
            .map(String::from)
            .collect()
    }
}

impl SchemaValidator for JsonSchemaAdapter {
    fn validate(&self, document: &Value, options: &SchemaOptions) -> SchemaOutcome {
        let mut issues: Vec<RawSchemaIssue> = self
            .validator
            .iter_errors(document)
            .map(|error| issue_from_error(&error, document))
            .collect();
        issues.extend(self.annotation_issues(document, options));

        debug!("Schema validation produced {} issue(s)", issues.len());

        SchemaOutcome {
            valid: issues.is_empty(),
            issues,
        }
    }
}

fn version_gate_issue(
    min: Option<u64>,
    max: Option<u64>,
    manifest_version: u64,
    pointer: &str,
    value: &Value,
) -> Option<RawSchemaIssue> {
    if let Some(min) = min
        && manifest_version < min
    {
        return Some(RawSchemaIssue::at(
            IssueKind::MinManifestVersion,
            pointer,
            Some(value.clone()),
            format!("must be used with manifest_version {} or later", min),
        ));
    }
    if let Some(max) = max
        && manifest_version > max
    {
        return Some(RawSchemaIssue::at(
            IssueKind::MaxManifestVersion,
            pointer,
            Some(value.clone()),
            format!("must be used with manifest_version {} or earlier", max),
        ));
    }
    None
}

fn issue_from_error(error: &ValidationError<'_>, document: &Value) -> RawSchemaIssue {
    let pointer = error.instance_path().to_string();
    let message = error.to_string();

    if let ValidationErrorKind::Required { property } = error.kind() {
        let mut path = PathToken::parse_pointer(&pointer);
        if let Some(name) = property.as_str() {
            path.push(PathToken::Key(name.to_string()));
        }
        return RawSchemaIssue::new(IssueKind::Required, path, None, message);
    }

    let schema_path = error.schema_path().to_string();
    let keyword = schema_path.rsplit('/').next().unwrap_or_default();
    let kind = if keyword == "type" {
        IssueKind::Type
    } else {
        IssueKind::Other {
            keyword: keyword.to_string(),
        }
    };
    let value = if pointer.is_empty() {
        Some(document.clone())
    } else {
        document.pointer(&pointer).cloned()
    };
    RawSchemaIssue::at(kind, &pointer, value, message)
}
