//! Linter configuration.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use addonlint_manifest::SchemaAnnotations;
use jsonc_parser::ParseOptions;
use jsonschema::Validator;
use serde::{Deserialize, Serialize};

use crate::LinterError;
use crate::context::{FeatureFlags, ValidationContext};
use crate::policy::Policy;

// Embed the schema
const SCHEMA_JSON: &str = include_str!("../../../schemas/v1/config.json");
static CONFIG_SCHEMA: OnceLock<Validator> = OnceLock::new();

/// Configuration for the linter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinterConfig {
    /// Lint as a privileged add-on.
    pub privileged: bool,

    /// The add-on is distributed outside the store.
    pub self_hosted: bool,

    /// The add-on was already signed.
    pub already_signed: bool,

    /// Optional engine features.
    pub features: FeatureFlags,

    /// Overrides the manifest's `strict_min_version`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_version: Option<String>,

    /// Permission name to the minimum Firefox version it requires.
    pub restricted_permissions: BTreeMap<String, String>,

    /// Extra content script hosts to block.
    pub blocked_content_script_hosts: Vec<String>,

    /// Extra homepage URLs to reject.
    pub restricted_homepage_urls: Vec<String>,

    /// Path to browser compatibility data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compat_data: Option<PathBuf>,

    /// Manifest rules layered on top of the schema.
    pub annotations: SchemaAnnotations,

    /// Base directory for resolving relative paths.
    /// This is usually the directory containing the configuration file.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl LinterConfig {
    /// File names looked up by [`LinterConfig::discover`], in order.
    pub const CONFIG_FILES: &'static [&'static str] = &[".addonlint.jsonc", ".addonlint.json"];

    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds a configuration file in a directory.
    pub fn discover(dir: impl AsRef<Path>) -> Option<PathBuf> {
        let dir = dir.as_ref();
        Self::CONFIG_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Loads configuration from a file.
    ///
    /// Supports `.addonlint.jsonc`, `.addonlint.json`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LinterError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| LinterError::config(format!("Failed to read config: {}", e)))?;

        let mut config = Self::from_json(&content)?;

        if let Some(parent) = path.parent() {
            config.base_dir = Some(parent.to_path_buf());
        }

        Ok(config)
    }

    /// Parses configuration from a JSON (or JSONC) string with schema validation.
    pub fn from_json(json: &str) -> Result<Self, LinterError> {
        let value = jsonc_parser::parse_to_serde_value(json, &ParseOptions::default())
            .map_err(|e| LinterError::config(format!("Invalid JSON: {}", e)))?
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));

        let schema = CONFIG_SCHEMA.get_or_init(|| {
            let schema_json: serde_json::Value =
                serde_json::from_str(SCHEMA_JSON).expect("Invalid embedded config schema");
            Validator::new(&schema_json).expect("Invalid config schema compilation")
        });

        if let Err(e) = schema.validate(&value) {
            let error_msg = format!("{} at {}", e, e.instance_path());
            return Err(LinterError::config(format!(
                "Config validation failed: {}",
                error_msg
            )));
        }

        serde_json::from_value(value)
            .map_err(|e| LinterError::config(format!("Invalid config: {}", e)))
    }

    /// The validation context described by this configuration.
    pub fn to_context(&self) -> ValidationContext {
        ValidationContext {
            privileged: self.privileged,
            already_signed: self.already_signed,
            self_hosted: self.self_hosted,
            features: self.features.clone(),
            min_version: self.min_version.clone(),
            restricted_permissions: self.restricted_permissions.clone(),
        }
    }

    /// The built-in policy extended with the configured entries.
    pub fn policy(&self) -> Policy {
        Policy::builtin().extend(
            self.blocked_content_script_hosts.iter().cloned(),
            self.restricted_homepage_urls.iter().cloned(),
        )
    }

    /// The compatibility data path, resolved against the config directory.
    pub fn compat_data_path(&self) -> Option<PathBuf> {
        let path = self.compat_data.as_ref()?;
        match &self.base_dir {
            Some(base) if path.is_relative() => Some(base.join(path)),
            _ => Some(path.clone()),
        }
    }
}
