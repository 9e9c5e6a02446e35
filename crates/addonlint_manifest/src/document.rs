//! The parsed manifest document and its one-time normalization.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ManifestError;

/// Manifest version assumed when `manifest_version` is missing or not an integer.
pub const DEFAULT_MANIFEST_VERSION: u64 = 2;

/// The kind of add-on a manifest describes.
///
/// Resolved from key presence with a fixed priority:
/// `theme` > `langpack_id` > `dictionaries` > `site_permissions`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddonKind {
    #[default]
    Extension,
    StaticTheme,
    #[serde(rename = "langpack")]
    LanguagePack,
    Dictionary,
    SitePermission,
}

impl AddonKind {
    /// Detects the addon kind from the declared top-level keys.
    pub fn detect(properties: &Map<String, Value>) -> Self {
        if properties.contains_key("theme") {
            Self::StaticTheme
        } else if properties.contains_key("langpack_id") {
            Self::LanguagePack
        } else if properties.contains_key("dictionaries") {
            Self::Dictionary
        } else if properties.contains_key("site_permissions") {
            Self::SitePermission
        } else {
            Self::Extension
        }
    }

    /// Returns the fixed tag used in metadata output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Extension => "extension",
            Self::StaticTheme => "static_theme",
            Self::LanguagePack => "langpack",
            Self::Dictionary => "dictionary",
            Self::SitePermission => "site_permission",
        }
    }
}

/// How the legacy `applications` key appeared before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyShape {
    /// Both `applications` and `browser_specific_settings` were declared;
    /// `applications` is ignored.
    ApplicationsIgnored,
    /// Only the deprecated `applications` key was declared.
    ApplicationsOnly,
}

/// A parsed `manifest.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestDocument {
    manifest_version: u64,
    kind: AddonKind,
    properties: Map<String, Value>,
}

impl ManifestDocument {
    /// Builds a manifest from an already decoded JSON value.
    pub fn from_value(value: Value) -> Result<Self, ManifestError> {
        match value {
            Value::Object(properties) => Ok(Self::from_properties(properties)),
            Value::Null => Err(ManifestError::NotAnObject("null")),
            Value::Bool(_) => Err(ManifestError::NotAnObject("a boolean")),
            Value::Number(_) => Err(ManifestError::NotAnObject("a number")),
            Value::String(_) => Err(ManifestError::NotAnObject("a string")),
            Value::Array(_) => Err(ManifestError::NotAnObject("an array")),
        }
    }

    fn from_properties(properties: Map<String, Value>) -> Self {
        // Only a JSON integer counts; "3" is not manifest version 3.
        let manifest_version = properties
            .get("manifest_version")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_MANIFEST_VERSION);
        let kind = AddonKind::detect(&properties);
        Self {
            manifest_version,
            kind,
            properties,
        }
    }

    pub fn manifest_version(&self) -> u64 {
        self.manifest_version
    }

    pub fn kind(&self) -> AddonKind {
        self.kind
    }

    /// Returns all declared top-level properties.
    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    /// Returns a top-level property.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Resolves a JSON pointer (`/a/0/b`) against the document.
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        let mut tokens = pointer.strip_prefix('/')?.split('/').map(unescape_token);
        let first = tokens.next()?;
        let mut current = self.properties.get(first.as_str())?;
        for token in tokens {
            current = match current {
                Value::Object(map) => map.get(token.as_str())?,
                Value::Array(items) => items.get(token.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Resolves a JSON pointer to a string value.
    pub fn str_at(&self, pointer: &str) -> Option<&str> {
        self.pointer(pointer).and_then(Value::as_str)
    }

    /// The add-on id from `applications.gecko.id`.
    pub fn addon_id(&self) -> Option<&str> {
        self.str_at("/applications/gecko/id")
    }

    /// The desktop minimum version from `applications.gecko.strict_min_version`.
    pub fn strict_min_version(&self) -> Option<&str> {
        self.str_at("/applications/gecko/strict_min_version")
    }

    /// The Android minimum version from `applications.gecko_android.strict_min_version`.
    pub fn android_strict_min_version(&self) -> Option<&str> {
        self.str_at("/applications/gecko_android/strict_min_version")
    }

    /// Reports how the legacy `applications` key was declared, if at all.
    ///
    /// Only meaningful for manifest versions below 3, where `applications`
    /// is still accepted.
    pub fn legacy_shape(&self) -> Option<LegacyShape> {
        if self.manifest_version >= 3 || !self.properties.contains_key("applications") {
            return None;
        }
        if self.properties.contains_key("browser_specific_settings") {
            Some(LegacyShape::ApplicationsIgnored)
        } else {
            Some(LegacyShape::ApplicationsOnly)
        }
    }

    /// Produces the normalized document every rule sees.
    ///
    /// `browser_specific_settings` replaces `applications` when it declares a
    /// `gecko` section, and `developer.name`/`developer.url` are promoted into
    /// `author`/`homepage_url`.
    pub fn normalize(self) -> Self {
        let Self {
            manifest_version,
            kind,
            mut properties,
        } = self;

        if let Some(settings) = properties.get("browser_specific_settings")
            && settings.get("gecko").is_some()
        {
            let settings = settings.clone();
            properties.insert("applications".to_string(), settings);
        }

        if let Some(Value::Object(developer)) = properties.get("developer") {
            let name = developer.get("name").cloned();
            let url = developer.get("url").cloned();
            if let Some(name) = name {
                properties.insert("author".to_string(), name);
            }
            if let Some(url) = url {
                properties.insert("homepage_url".to_string(), url);
            }
        }

        Self {
            manifest_version,
            kind,
            properties,
        }
    }
}

fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}
