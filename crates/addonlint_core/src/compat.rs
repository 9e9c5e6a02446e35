//! Browser compatibility data and the minimum-version check.
//!
//! The data follows the MDN browser-compat-data layout: nested objects whose
//! `__compat.support` entries describe when a key became available. It is
//! loaded once into an immutable [`CompatNode`] tree.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use addonlint_manifest::ManifestDocument;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::diagnostic::Diagnostic;
use crate::messages::{Catalog, MessageCode};
use crate::version::major_version;

const COMPAT_KEY: &str = "__compat";
const MANIFEST_ROOT: &str = "/webextensions/manifest";

/// Keys whose array elements are permission names.
const PERMISSION_KEYS: &[&str] = &["permissions", "optional_permissions"];

/// Errors raised while loading compatibility data.
#[derive(Debug, Error)]
pub enum CompatError {
    #[error("failed to read compatibility data: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid compatibility data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("compatibility data must be a JSON object")]
    NotAnObject,
}

/// One support range for one browser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupportStatement {
    /// Version string when support landed. `None` for `true`, `false` or `null`.
    pub version_added: Option<String>,
}

/// Support ranges per browser, most relevant first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompatSupport {
    pub firefox: Vec<SupportStatement>,
    pub firefox_android: Vec<SupportStatement>,
}

impl CompatSupport {
    fn from_value(value: &Value) -> Self {
        Self {
            firefox: statements(value.get("firefox")),
            firefox_android: statements(value.get("firefox_android")),
        }
    }

    /// First listed desktop version.
    pub fn firefox_added(&self) -> Option<&str> {
        self.firefox.first()?.version_added.as_deref()
    }

    /// First listed Android version.
    pub fn firefox_android_added(&self) -> Option<&str> {
        self.firefox_android.first()?.version_added.as_deref()
    }
}

fn statements(value: Option<&Value>) -> Vec<SupportStatement> {
    let statement = |value: &Value| SupportStatement {
        version_added: value
            .get("version_added")
            .and_then(Value::as_str)
            .map(String::from),
    };
    match value {
        Some(Value::Array(items)) => items.iter().map(statement).collect(),
        Some(value @ Value::Object(_)) => vec![statement(value)],
        _ => Vec::new(),
    }
}

/// A node of the compatibility tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompatNode {
    Leaf(CompatSupport),
    Container {
        support: Option<CompatSupport>,
        children: BTreeMap<String, CompatNode>,
    },
}

impl CompatNode {
    fn from_map(map: &Map<String, Value>) -> Self {
        let support = map
            .get(COMPAT_KEY)
            .and_then(|compat| compat.get("support"))
            .map(CompatSupport::from_value);
        let children: BTreeMap<String, CompatNode> = map
            .iter()
            .filter(|(key, _)| key.as_str() != COMPAT_KEY)
            .filter_map(|(key, value)| {
                value
                    .as_object()
                    .map(|child| (key.clone(), CompatNode::from_map(child)))
            })
            .collect();

        match support {
            Some(support) if children.is_empty() => CompatNode::Leaf(support),
            support => CompatNode::Container { support, children },
        }
    }

    pub fn support(&self) -> Option<&CompatSupport> {
        match self {
            CompatNode::Leaf(support) => Some(support),
            CompatNode::Container { support, .. } => support.as_ref(),
        }
    }

    pub fn child(&self, name: &str) -> Option<&CompatNode> {
        match self {
            CompatNode::Leaf(_) => None,
            CompatNode::Container { children, .. } => children.get(name),
        }
    }
}

/// The read-only compatibility tree for manifest keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatibilityIndex {
    root: CompatNode,
}

impl CompatibilityIndex {
    /// An index with no data. Every lookup misses.
    pub fn empty() -> Self {
        Self {
            root: CompatNode::Container {
                support: None,
                children: BTreeMap::new(),
            },
        }
    }

    /// Builds the index from MDN data. Accepts either the full dataset or the
    /// `webextensions.manifest` subtree.
    pub fn from_value(value: &Value) -> Result<Self, CompatError> {
        let manifest = value.pointer(MANIFEST_ROOT).unwrap_or(value);
        let map = manifest.as_object().ok_or(CompatError::NotAnObject)?;
        Ok(Self {
            root: CompatNode::from_map(map),
        })
    }

    pub fn from_json(json: &str) -> Result<Self, CompatError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CompatError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Returns the node for a top-level manifest key.
    pub fn get(&self, key: &str) -> Option<&CompatNode> {
        self.root.child(key)
    }

    pub fn is_empty(&self) -> bool {
        matches!(&self.root, CompatNode::Container { children, .. } if children.is_empty())
    }
}

impl Default for CompatibilityIndex {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Platform {
    Desktop,
    Android,
}

/// Compares the manifest against the compatibility tree.
pub struct CompatibilityChecker {
    index: Arc<CompatibilityIndex>,
    catalog: Arc<Catalog>,
}

impl CompatibilityChecker {
    pub fn new(index: Arc<CompatibilityIndex>, catalog: Arc<Catalog>) -> Self {
        Self { index, catalog }
    }

    /// Reports every declared key or permission that needs a newer browser
    /// than the declared minimum versions.
    pub fn check(
        &self,
        manifest: &ManifestDocument,
        min_version: Option<&str>,
        android_min_version: Option<&str>,
    ) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        let desktop = min_version.and_then(|v| major_version(v).map(|major| (v, major)));
        let android = android_min_version.and_then(|v| major_version(v).map(|major| (v, major)));
        if desktop.is_none() && android.is_none() {
            debug!("No minimum version declared, skipping compatibility check");
            return diagnostics;
        }

        let mut walker = Walker {
            catalog: &self.catalog,
            desktop,
            android,
            diagnostics: &mut diagnostics,
        };
        for (key, value) in manifest.properties() {
            if let Some(node) = self.index.get(key) {
                walker.walk(value, node, key.clone(), PERMISSION_KEYS.contains(&key.as_str()), false);
            }
        }
        diagnostics
    }
}

struct Walker<'a> {
    catalog: &'a Catalog,
    desktop: Option<(&'a str, u64)>,
    android: Option<(&'a str, u64)>,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl Walker<'_> {
    fn walk(&mut self, value: &Value, node: &CompatNode, path: String, lists_permissions: bool, is_permission: bool) {
        if let Some(support) = node.support() {
            self.compare(&path, support, is_permission);
        }

        match value {
            Value::Object(map) => {
                for (key, child_value) in map {
                    if let Some(child) = node.child(key) {
                        self.walk(child_value, child, format!("{}.{}", path, key), false, false);
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::String(name) if lists_permissions => {
                            if let Some(child) = node.child(name) {
                                let child_path = format!("{}:{}", path, name);
                                self.walk(item, child, child_path, false, true);
                            }
                        }
                        Value::Object(map) => {
                            for (key, child_value) in map {
                                if let Some(child) = node.child(key) {
                                    self.walk(child_value, child, format!("{}.{}", path, key), false, false);
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    fn compare(&mut self, path: &str, support: &CompatSupport, is_permission: bool) {
        for platform in [Platform::Desktop, Platform::Android] {
            let (min, added) = match platform {
                Platform::Desktop => (self.desktop, support.firefox_added()),
                Platform::Android => (self.android, support.firefox_android_added()),
            };
            let (Some((min_version, min_major)), Some(version_added)) = (min, added) else {
                continue;
            };
            let Some(added_major) = major_version(version_added) else {
                continue;
            };
            if added_major <= min_major {
                continue;
            }
            let code = match (platform, is_permission) {
                (Platform::Desktop, false) => MessageCode::KeyFirefoxUnsupportedByMinVersion,
                (Platform::Desktop, true) => MessageCode::PermissionFirefoxUnsupportedByMinVersion,
                (Platform::Android, false) => MessageCode::KeyFirefoxAndroidUnsupportedByMinVersion,
                (Platform::Android, true) => {
                    MessageCode::PermissionFirefoxAndroidUnsupportedByMinVersion
                }
            };
            self.diagnostics.push(self.catalog.render(
                code,
                &[
                    ("key", path),
                    ("min_version", min_version),
                    ("version_added", version_added),
                ],
            ));
        }
    }
}
