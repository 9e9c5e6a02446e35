//! Metadata extracted from a manifest.

use std::collections::BTreeSet;

use addonlint_manifest::{AddonKind, ManifestDocument};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Summary of the add-on described by a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub id: Option<String>,
    pub manifest_version: u64,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: AddonKind,
    pub version: Option<String>,
    pub firefox_min_version: Option<String>,
    /// Dot-joined `parent.paths` and `child.paths` of every experiment API.
    pub experiment_api_paths: BTreeSet<String>,
}

impl Metadata {
    /// Extracts metadata from a normalized manifest.
    pub fn from_manifest(manifest: &ManifestDocument) -> Self {
        Self {
            id: manifest.addon_id().map(String::from),
            manifest_version: manifest.manifest_version(),
            name: manifest.get("name").and_then(Value::as_str).map(String::from),
            kind: manifest.kind(),
            version: manifest.get("version").and_then(Value::as_str).map(String::from),
            firefox_min_version: manifest.strict_min_version().map(String::from),
            experiment_api_paths: experiment_api_paths(manifest),
        }
    }
}

fn experiment_api_paths(manifest: &ManifestDocument) -> BTreeSet<String> {
    let Some(Value::Object(apis)) = manifest.get("experiment_apis") else {
        return BTreeSet::new();
    };
    let mut paths = BTreeSet::new();
    for api in apis.values() {
        for side in ["parent", "child"] {
            let Some(Value::Array(api_paths)) = api.pointer(&format!("/{}/paths", side)) else {
                continue;
            };
            for path in api_paths {
                if let Value::Array(segments) = path {
                    let segments: Vec<&str> = segments.iter().filter_map(Value::as_str).collect();
                    if !segments.is_empty() {
                        paths.insert(segments.join("."));
                    }
                }
            }
        }
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_metadata_from_manifest() {
        let manifest = ManifestDocument::from_value(json!({
            "manifest_version": 2,
            "name": "Demo",
            "version": "1.2",
            "browser_specific_settings": {
                "gecko": { "id": "demo@example.com", "strict_min_version": "78.0" }
            },
            "experiment_apis": {
                "demo": {
                    "parent": { "paths": [["demo", "parentApi"], ["demo", "shared"]] },
                    "child": { "paths": [["demo", "shared"], ["demo", "childApi"]] }
                }
            }
        }))
        .unwrap()
        .normalize();

        let metadata = Metadata::from_manifest(&manifest);
        assert_eq!(metadata.id.as_deref(), Some("demo@example.com"));
        assert_eq!(metadata.manifest_version, 2);
        assert_eq!(metadata.kind, AddonKind::Extension);
        assert_eq!(metadata.firefox_min_version.as_deref(), Some("78.0"));
        assert_eq!(
            metadata.experiment_api_paths,
            BTreeSet::from([
                "demo.childApi".to_string(),
                "demo.parentApi".to_string(),
                "demo.shared".to_string(),
            ])
        );
    }

    #[test]
    fn test_metadata_serializes_camel_case() {
        let manifest = ManifestDocument::from_value(json!({ "theme": {} })).unwrap();
        let json = serde_json::to_value(Metadata::from_manifest(&manifest)).unwrap();
        assert_eq!(
            json,
            json!({
                "id": null,
                "manifestVersion": 2,
                "name": null,
                "type": "static_theme",
                "version": null,
                "firefoxMinVersion": null,
                "experimentApiPaths": []
            })
        );
    }
}
