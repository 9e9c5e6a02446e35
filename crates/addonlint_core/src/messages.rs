//! Message codes and the message catalog.
//!
//! The [`Catalog`] is built once and shared (`Arc<Catalog>`) by every
//! component that emits diagnostics. Templates use `{name}` placeholders that
//! [`Catalog::render`] fills in.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diagnostic::{Diagnostic, Severity};

macro_rules! message_codes {
    ($($variant:ident => $code:literal,)*) => {
        /// Stable identifier of a diagnostic.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum MessageCode {
            $(#[serde(rename = $code)] $variant,)*
        }

        impl MessageCode {
            /// Every known code.
            pub const ALL: &'static [MessageCode] = &[$(MessageCode::$variant,)*];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(MessageCode::$variant => $code,)*
                }
            }
        }
    };
}

message_codes! {
    JsonInvalid => "JSON_INVALID",
    ManifestFieldRequired => "MANIFEST_FIELD_REQUIRED",
    ManifestFieldInvalid => "MANIFEST_FIELD_INVALID",
    ManifestFieldDeprecated => "MANIFEST_FIELD_DEPRECATED",
    ManifestThemeLwtAlias => "MANIFEST_THEME_LWT_ALIAS",
    ManifestFieldUnsupported => "MANIFEST_FIELD_UNSUPPORTED",
    ManifestPermissionUnsupported => "MANIFEST_PERMISSION_UNSUPPORTED",
    ApplicationsInvalid => "APPLICATIONS_INVALID",
    ManifestFieldPrivileged => "MANIFEST_FIELD_PRIVILEGED",
    ManifestPermissionsPrivileged => "MANIFEST_PERMISSIONS_PRIVILEGED",
    PrivilegedFeaturesRequired => "PRIVILEGED_FEATURES_REQUIRED",
    MozillaAddonsPermissionRequired => "MOZILLA_ADDONS_PERMISSION_REQUIRED",
    ManifestBadPermission => "MANIFEST_BAD_PERMISSION",
    ManifestBadOptionalPermission => "MANIFEST_BAD_OPTIONAL_PERMISSION",
    ManifestBadHostPermission => "MANIFEST_BAD_HOST_PERMISSION",
    ManifestPermissions => "MANIFEST_PERMISSIONS",
    ManifestOptionalPermissions => "MANIFEST_OPTIONAL_PERMISSIONS",
    ManifestHostPermissions => "MANIFEST_HOST_PERMISSIONS",
    ManifestInstallOrigins => "MANIFEST_INSTALL_ORIGINS",
    IgnoredApplicationsProperty => "IGNORED_APPLICATIONS_PROPERTY",
    ApplicationsDeprecated => "APPLICATIONS_DEPRECATED",
    ManifestCsp => "MANIFEST_CSP",
    ManifestCspUnsafeEval => "MANIFEST_CSP_UNSAFE_EVAL",
    ManifestBackgroundFileNotFound => "MANIFEST_BACKGROUND_FILE_NOT_FOUND",
    ManifestContentScriptFileNotFound => "MANIFEST_CONTENT_SCRIPT_FILE_NOT_FOUND",
    ManifestInvalidContent => "MANIFEST_INVALID_CONTENT",
    ManifestDictMissingId => "MANIFEST_DICT_MISSING_ID",
    ManifestEmptyDicts => "MANIFEST_EMPTY_DICTS",
    ManifestMultipleDicts => "MANIFEST_MULTIPLE_DICTS",
    ManifestDictNotFound => "MANIFEST_DICT_NOT_FOUND",
    ManifestUpdateUrl => "MANIFEST_UPDATE_URL",
    StrictMaxVersion => "STRICT_MAX_VERSION",
    RestrictedHomepageUrl => "RESTRICTED_HOMEPAGE_URL",
    RestrictedPermission => "RESTRICTED_PERMISSION",
    ExtensionIdRequired => "EXTENSION_ID_REQUIRED",
    HiddenNoAction => "HIDDEN_NO_ACTION",
    PropIdInvalid => "PROP_ID_INVALID",
    VersionFormatInvalid => "VERSION_FORMAT_INVALID",
    VersionFormatDeprecated => "VERSION_FORMAT_DEPRECATED",
    NoMessagesFile => "NO_MESSAGES_FILE",
    NoDefaultLocale => "NO_DEFAULT_LOCALE",
    NoMessagesFileInLocales => "NO_MESSAGES_FILE_IN_LOCALES",
    KeyFirefoxUnsupportedByMinVersion => "KEY_FIREFOX_UNSUPPORTED_BY_MIN_VERSION",
    KeyFirefoxAndroidUnsupportedByMinVersion => "KEY_FIREFOX_ANDROID_UNSUPPORTED_BY_MIN_VERSION",
    PermissionFirefoxUnsupportedByMinVersion => "PERMISSION_FIREFOX_UNSUPPORTED_BY_MIN_VERSION",
    PermissionFirefoxAndroidUnsupportedByMinVersion => "PERMISSION_FIREFOX_ANDROID_UNSUPPORTED_BY_MIN_VERSION",
    ManifestIconNotFound => "MANIFEST_ICON_NOT_FOUND",
    WrongIconExtension => "WRONG_ICON_EXTENSION",
    IconNotSquare => "ICON_NOT_SQUARE",
    IconSizeInvalid => "ICON_SIZE_INVALID",
    CorruptIconFile => "CORRUPT_ICON_FILE",
    ManifestThemeImageNotFound => "MANIFEST_THEME_IMAGE_NOT_FOUND",
    ManifestThemeImageWrongExt => "MANIFEST_THEME_IMAGE_WRONG_EXT",
    ManifestThemeImageWrongMime => "MANIFEST_THEME_IMAGE_WRONG_MIME",
    ManifestThemeImageMimeMismatch => "MANIFEST_THEME_IMAGE_MIME_MISMATCH",
    ManifestThemeImageCorrupted => "MANIFEST_THEME_IMAGE_CORRUPTED",
}

impl fmt::Display for MessageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The default text and severity of one message code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Template {
    fn new(severity: Severity, message: &str, description: Option<&str>) -> Self {
        Self {
            severity,
            message: message.to_string(),
            description: description.map(String::from),
        }
    }
}

const MDN_MANIFEST: &str = "See https://mzl.la/1ZOhoEN (MDN Docs) for more information.";

/// Message templates and the tables that decide how codes are emitted.
#[derive(Debug, Clone)]
pub struct Catalog {
    templates: HashMap<MessageCode, Template>,
    deprecated_replacements: HashMap<String, MessageCode>,
    always_invalidating: HashSet<MessageCode>,
}

impl Catalog {
    /// The built-in catalog.
    pub fn builtin() -> Self {
        use MessageCode::*;
        use Severity::{Error, Notice, Warning};

        let entries: Vec<(MessageCode, Template)> = vec![
            (JsonInvalid, Template::new(Error, "\"{path}\" {detail}", Some(MDN_MANIFEST))),
            (ManifestFieldRequired, Template::new(Error, "\"{path}\" is a required property", Some(MDN_MANIFEST))),
            (ManifestFieldInvalid, Template::new(Error, "\"{path}\" {detail}", Some(MDN_MANIFEST))),
            (ManifestFieldDeprecated, Template::new(Warning, "\"{path}\" is deprecated", Some("{detail}"))),
            (ManifestThemeLwtAlias, Template::new(Warning, "This theme LWT alias has been removed.", None)),
            (ManifestFieldUnsupported, Template::new(Warning, "\"{path}\" {detail}", Some(MDN_MANIFEST))),
            (ManifestPermissionUnsupported, Template::new(Warning, "/{field}: \"{value}\" {detail}", Some(MDN_MANIFEST))),
            (ApplicationsInvalid, Template::new(Error, "\"applications\" is no longer allowed in Manifest Version 3 and above.", Some("Use \"browser_specific_settings\" instead."))),
            (ManifestFieldPrivileged, Template::new(Error, "\"{path}\" is ignored for non-privileged add-ons.", Some(MDN_MANIFEST))),
            (ManifestPermissionsPrivileged, Template::new(Error, "Privileged permissions requested by a non-privileged add-on: {permissions}", Some("These permissions are only available to privileged add-ons."))),
            (PrivilegedFeaturesRequired, Template::new(Error, "Privileged add-ons must declare privileged permissions.", Some("This add-on is signed as privileged but does not request any privileged permission."))),
            (MozillaAddonsPermissionRequired, Template::new(Error, "The \"{permission}\" permission is required for privileged add-ons.", Some("Privileged add-ons using {permissions} must also request \"{permission}\"."))),
            (ManifestBadPermission, Template::new(Warning, "Permissions {detail}.", Some(MDN_MANIFEST))),
            (ManifestBadOptionalPermission, Template::new(Warning, "Optional permissions {detail}.", Some(MDN_MANIFEST))),
            (ManifestBadHostPermission, Template::new(Warning, "Host permissions {detail}.", Some(MDN_MANIFEST))),
            (ManifestPermissions, Template::new(Warning, "/{field}: Invalid {field} \"{value}\" at {index}.", Some(MDN_MANIFEST))),
            (ManifestOptionalPermissions, Template::new(Warning, "/{field}: Invalid {field} \"{value}\" at {index}.", Some(MDN_MANIFEST))),
            (ManifestHostPermissions, Template::new(Warning, "/{field}: Invalid {field} \"{value}\" at {index}.", Some(MDN_MANIFEST))),
            (ManifestInstallOrigins, Template::new(Error, "/{field}: Invalid {field} \"{value}\" at {index}.", Some("install_origins entries must be valid origins."))),
            (IgnoredApplicationsProperty, Template::new(Warning, "\"applications\" property overridden by \"browser_specific_settings\" property", Some("The \"applications\" property is ignored when \"browser_specific_settings\" is also declared."))),
            (ApplicationsDeprecated, Template::new(Warning, "\"applications\" is deprecated", Some("Use \"browser_specific_settings\" instead."))),
            (ManifestCsp, Template::new(Warning, "\"{property}\" allows remote code execution", Some("\"{property}\" allows remote code execution in manifest.json. A custom content security policy can only allow secure sources."))),
            (ManifestCspUnsafeEval, Template::new(Warning, "Using \"eval\" in \"{property}\" is strongly discouraged.", Some("The \"unsafe-eval\" source allows arbitrary code execution."))),
            (ManifestBackgroundFileNotFound, Template::new(Error, "A background {kind} file could not be found.", Some("A background {kind} defined in the manifest could not be found at \"{path}\"."))),
            (ManifestContentScriptFileNotFound, Template::new(Error, "A content script file could not be found.", Some("Content script defined in the manifest could not be found at \"{path}\"."))),
            (ManifestInvalidContent, Template::new(Error, "Forbidden content found in add-on.", Some("The content script match pattern \"{pattern}\" targets a blocked host \"{host}\"."))),
            (ManifestDictMissingId, Template::new(Error, "The dictionary needs an id.", Some("Dictionaries must declare \"browser_specific_settings.gecko.id\"."))),
            (ManifestEmptyDicts, Template::new(Error, "The \"dictionaries\" property must not be empty.", None)),
            (ManifestMultipleDicts, Template::new(Error, "Only one dictionary may be declared.", Some("Multiple dictionaries per add-on are not supported."))),
            (ManifestDictNotFound, Template::new(Error, "A dictionary file defined in the manifest could not be found.", Some("Dictionary file could not be found at \"{path}\"."))),
            (ManifestUpdateUrl, Template::new(Error, "\"update_url\" is not allowed.", Some("\"applications.gecko.update_url\" is only allowed for self-hosted add-ons."))),
            (StrictMaxVersion, Template::new(Notice, "\"strict_max_version\" not required.", Some("\"strict_max_version\" should only be set to prevent installation on versions known to be incompatible."))),
            (RestrictedHomepageUrl, Template::new(Error, "\"{property}\" links to a restricted site.", Some("\"{property}\" must not point to \"{url}\"."))),
            (RestrictedPermission, Template::new(Error, "The \"{permission}\" permission requires \"strict_min_version\" to be set to \"{min_version}\" or above.", Some("Set \"browser_specific_settings.gecko.strict_min_version\" to \"{min_version}\" or above."))),
            (ExtensionIdRequired, Template::new(Error, "The extension ID is required in Manifest Version 3 and above.", Some("Declare \"browser_specific_settings.gecko.id\"."))),
            (HiddenNoAction, Template::new(Error, "Cannot use actions in hidden add-ons.", Some("Hidden add-ons must not declare \"action\", \"browser_action\" or \"page_action\"."))),
            (PropIdInvalid, Template::new(Error, "The add-on ID \"{id}\" is invalid.", Some("The ID must be an email-style identifier or a GUID enclosed in braces."))),
            (VersionFormatInvalid, Template::new(Error, "The version string \"{version}\" is invalid.", Some("The version must be 1 to 4 integers separated by dots, without leading zeros."))),
            (VersionFormatDeprecated, Template::new(Warning, "The version string \"{version}\" uses a deprecated format.", Some("Toolkit version strings are only accepted in Manifest Version 2."))),
            (NoMessagesFile, Template::new(Error, "The \"default_locale\" is missing localizations.", Some("\"_locales/{locale}/messages.json\" could not be found."))),
            (NoDefaultLocale, Template::new(Error, "The \"default_locale\" is missing but \"_locales\" exist.", Some("Declare \"default_locale\" when shipping localizations."))),
            (NoMessagesFileInLocales, Template::new(Error, "Some locales are missing \"messages.json\".", Some("\"_locales/{locale}/messages.json\" could not be found."))),
            (KeyFirefoxUnsupportedByMinVersion, Template::new(Warning, "Manifest key not supported by the specified minimum Firefox version", Some("\"strict_min_version\" requires Firefox {min_version}, but \"{key}\" is only supported from version {version_added}."))),
            (KeyFirefoxAndroidUnsupportedByMinVersion, Template::new(Warning, "Manifest key not supported by the specified minimum Firefox for Android version", Some("\"strict_min_version\" requires Firefox for Android {min_version}, but \"{key}\" is only supported from version {version_added}."))),
            (PermissionFirefoxUnsupportedByMinVersion, Template::new(Notice, "Permission not supported by the specified minimum Firefox version", Some("\"strict_min_version\" requires Firefox {min_version}, but \"{key}\" is only supported from version {version_added}."))),
            (PermissionFirefoxAndroidUnsupportedByMinVersion, Template::new(Notice, "Permission not supported by the specified minimum Firefox for Android version", Some("\"strict_min_version\" requires Firefox for Android {min_version}, but \"{key}\" is only supported from version {version_added}."))),
            (ManifestIconNotFound, Template::new(Error, "An icon defined in the manifest could not be found in the package.", Some("Icon could not be found at \"{path}\"."))),
            (WrongIconExtension, Template::new(Warning, "Unsupported image extension", Some("Icons should be one of JPG/JPEG, WebP, GIF, PNG or SVG."))),
            (IconNotSquare, Template::new(Error, "Icons must be square.", Some("Icon at \"{path}\" must be square."))),
            (IconSizeInvalid, Template::new(Warning, "The size of the icon does not match the manifest.", Some("Expected icon at \"{path}\" to be {expected} pixels wide but was {actual}."))),
            (CorruptIconFile, Template::new(Warning, "Corrupt image file", Some("Icon at \"{path}\" is corrupt."))),
            (ManifestThemeImageNotFound, Template::new(Error, "Theme image for \"{property}\" could not be found in the package", Some("Theme image for \"{property}\" could not be found at \"{path}\"."))),
            (ManifestThemeImageWrongExt, Template::new(Error, "Theme image file has an unsupported file extension", Some("Theme image file at \"{path}\" has an unsupported file extension."))),
            (ManifestThemeImageWrongMime, Template::new(Error, "Theme image file has an unsupported mime type", Some("Theme image file at \"{path}\" has the unsupported mime type \"{mime}\"."))),
            (ManifestThemeImageMimeMismatch, Template::new(Warning, "Theme image file mime type does not match its file extension", Some("Theme image file extension at \"{path}\" does not match its actual mime type \"{mime}\"."))),
            (ManifestThemeImageCorrupted, Template::new(Error, "Corrupted theme image file", Some("Theme image file at \"{path}\" is corrupted."))),
        ];

        let deprecated_replacements = [
            "/theme/images/headerURL",
            "/theme/colors/accentcolor",
            "/theme/colors/textcolor",
        ]
        .into_iter()
        .map(|pointer| (pointer.to_string(), ManifestThemeLwtAlias))
        .collect();

        Self {
            templates: entries.into_iter().collect(),
            deprecated_replacements,
            always_invalidating: HashSet::from([ManifestBadPermission]),
        }
    }

    /// Returns the template for a code.
    pub fn template(&self, code: MessageCode) -> Option<&Template> {
        self.templates.get(&code)
    }

    /// Replaces the template of a code.
    pub fn with_template(mut self, code: MessageCode, template: Template) -> Self {
        self.templates.insert(code, template);
        self
    }

    /// The replacement code registered for a deprecated property, if any.
    pub fn deprecated_replacement(&self, pointer: &str) -> Option<MessageCode> {
        self.deprecated_replacements.get(pointer).copied()
    }

    /// Whether a code invalidates the package regardless of its severity.
    pub fn is_always_invalidating(&self, code: MessageCode) -> bool {
        self.always_invalidating.contains(&code)
    }

    /// Renders a code with the given placeholder values.
    pub fn render(&self, code: MessageCode, args: &[(&str, &str)]) -> Diagnostic {
        let Some(template) = self.template(code) else {
            return Diagnostic::new(code, code.as_str());
        };
        let mut diagnostic = Diagnostic::new(code, fill(&template.message, args))
            .with_severity(template.severity);
        if let Some(description) = &template.description {
            diagnostic = diagnostic.with_description(fill(description, args));
        }
        diagnostic
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Replaces `{name}` placeholders in one pass. Substituted values are never
/// scanned again, and unknown placeholders are kept as written.
fn fill(template: &str, args: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            args.iter()
                .find(|(arg, _)| *arg == name)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
