//! Identity, distribution and version rules.

use std::cmp::Ordering;

use addonlint_manifest::{AddonKind, ManifestDocument};
use serde_json::Value;

use super::{RuleEngine, string_items};
use crate::diagnostic::{Diagnostic, Severity};
use crate::messages::MessageCode;
use crate::version::{compare_versions, is_toolkit_version, is_valid_version_string};

const ACTION_KEYS: &[&str] = &["action", "browser_action", "page_action"];
const PERMISSION_LISTS: &[&str] = &["permissions", "optional_permissions"];

/// `{8-4-4-4-12}` hexadecimal GUID in braces.
fn is_guid(id: &str) -> bool {
    let Some(inner) = id.strip_prefix('{').and_then(|s| s.strip_suffix('}')) else {
        return false;
    };
    let groups: Vec<&str> = inner.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(group, len)| group.len() == len && group.chars().all(|c| c.is_ascii_hexdigit()))
}

/// `local@domain`, where both parts use `[A-Za-z0-9._-]` and the domain is not empty.
fn is_email_id(id: &str) -> bool {
    let allowed = |c: char| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-');
    match id.split_once('@') {
        Some((local, domain)) => {
            !domain.is_empty() && local.chars().all(allowed) && domain.chars().all(allowed)
        }
        None => false,
    }
}

pub(crate) fn is_valid_addon_id(id: &str) -> bool {
    is_guid(id) || is_email_id(id)
}

impl RuleEngine<'_> {
    pub(super) fn check_update_url(&self, manifest: &ManifestDocument, out: &mut Vec<Diagnostic>) {
        if self.context.self_hosted || manifest.pointer("/applications/gecko/update_url").is_none() {
            return;
        }
        let mut diagnostic = self.catalog.render(MessageCode::ManifestUpdateUrl, &[]);
        if self.context.privileged {
            diagnostic = diagnostic.with_severity(Severity::Warning);
        }
        out.push(diagnostic);
    }

    pub(super) fn check_strict_max_version(
        &self,
        manifest: &ManifestDocument,
        out: &mut Vec<Diagnostic>,
    ) {
        if self.context.self_hosted
            || manifest
                .pointer("/applications/gecko/strict_max_version")
                .is_none()
        {
            return;
        }
        let mut diagnostic = self.catalog.render(MessageCode::StrictMaxVersion, &[]);
        if manifest.kind() == AddonKind::Dictionary {
            diagnostic = diagnostic.with_severity(Severity::Error);
        }
        out.push(diagnostic);
    }

    pub(super) fn check_homepage_url(&self, manifest: &ManifestDocument, out: &mut Vec<Diagnostic>) {
        let Some(url) = manifest.get("homepage_url").and_then(Value::as_str) else {
            return;
        };
        if let Some(restricted) = self.policy.restricted_homepage(url) {
            out.push(self.catalog.render(
                MessageCode::RestrictedHomepageUrl,
                &[("property", "homepage_url"), ("url", restricted)],
            ));
        }
    }

    pub(super) fn check_restricted_permissions(
        &self,
        manifest: &ManifestDocument,
        out: &mut Vec<Diagnostic>,
    ) {
        if self.context.restricted_permissions.is_empty() {
            return;
        }
        let declared_min = self.min_version(manifest);
        for key in PERMISSION_LISTS {
            for permission in string_items(manifest.get(key)) {
                let Some(required) = self.context.restricted_permissions.get(permission) else {
                    continue;
                };
                let satisfied = declared_min
                    .is_some_and(|min| compare_versions(min, required) != Ordering::Less);
                if !satisfied {
                    out.push(self.catalog.render(
                        MessageCode::RestrictedPermission,
                        &[("permission", permission), ("min_version", required)],
                    ));
                }
            }
        }
    }

    pub(super) fn check_extension_id(&self, manifest: &ManifestDocument, out: &mut Vec<Diagnostic>) {
        if manifest.manifest_version() >= 3
            && manifest.addon_id().is_none()
            && !self.context.already_signed
        {
            out.push(self.catalog.render(MessageCode::ExtensionIdRequired, &[]));
        }
    }

    pub(super) fn check_hidden(&self, manifest: &ManifestDocument, out: &mut Vec<Diagnostic>) {
        if !self.context.privileged || manifest.get("hidden") != Some(&Value::Bool(true)) {
            return;
        }
        if ACTION_KEYS.iter().any(|key| manifest.get(key).is_some()) {
            out.push(self.catalog.render(MessageCode::HiddenNoAction, &[]));
        }
    }

    pub(super) fn check_id_format(&self, manifest: &ManifestDocument, out: &mut Vec<Diagnostic>) {
        if let Some(id) = manifest.addon_id()
            && !is_valid_addon_id(id)
        {
            out.push(self.catalog.render(MessageCode::PropIdInvalid, &[("id", id)]));
        }
    }

    pub(super) fn check_version_format(
        &self,
        manifest: &ManifestDocument,
        out: &mut Vec<Diagnostic>,
    ) {
        let Some(version) = manifest.get("version").and_then(Value::as_str) else {
            return;
        };
        if is_valid_version_string(version) {
            return;
        }
        let code = if manifest.manifest_version() < 3 && is_toolkit_version(version) {
            MessageCode::VersionFormatDeprecated
        } else {
            MessageCode::VersionFormatInvalid
        };
        out.push(self.catalog.render(code, &[("version", version)]));
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{codes, run_rules};
    use super::*;
    use crate::context::ValidationContext;
    use crate::package::MemoryPackage;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn lint(manifest: Value, context: &ValidationContext) -> Vec<Diagnostic> {
        run_rules(manifest, &MemoryPackage::new(), context)
    }

    #[rstest]
    #[case("{12345678-abcd-ef01-2345-6789abcdef01}", true)]
    #[case("addon@example.com", true)]
    #[case("@example", true)]
    #[case("addon@", false)]
    #[case("addon", false)]
    #[case("{1234}", false)]
    #[case("a b@example.com", false)]
    fn test_addon_id_format(#[case] id: &str, #[case] expected: bool) {
        assert_eq!(is_valid_addon_id(id), expected);
    }

    #[rstest]
    #[case(false, false, Some(Severity::Error))]
    #[case(true, false, Some(Severity::Warning))]
    #[case(false, true, None)]
    fn test_update_url(
        #[case] privileged: bool,
        #[case] self_hosted: bool,
        #[case] expected: Option<Severity>,
    ) {
        let context = ValidationContext::new()
            .privileged(privileged)
            .self_hosted(self_hosted);
        let diags = lint(
            json!({ "browser_specific_settings": { "gecko": { "update_url": "https://example.com/u.json" } } }),
            &context,
        );
        assert_eq!(diags.first().map(|d| d.severity), expected);
        assert!(diags.iter().all(|d| d.code == MessageCode::ManifestUpdateUrl));
    }

    #[test]
    fn test_strict_max_version_severity() {
        let settings = json!({ "gecko": { "id": "a@example.com", "strict_max_version": "100.*" } });
        let extension = lint(json!({ "applications": settings.clone() }), &ValidationContext::new());
        assert_eq!(extension[0].code, MessageCode::StrictMaxVersion);
        assert_eq!(extension[0].severity, Severity::Notice);

        let package = MemoryPackage::new().with_file("en.dic", "").with_file("en.aff", "");
        let dictionary = run_rules(
            json!({ "applications": settings, "dictionaries": { "en": "en.dic" } }),
            &package,
            &ValidationContext::new(),
        );
        assert_eq!(codes(&dictionary), vec![MessageCode::StrictMaxVersion]);
        assert_eq!(dictionary[0].severity, Severity::Error);
    }

    #[test]
    fn test_restricted_homepage_from_developer_url() {
        let diags = lint(
            json!({ "developer": { "name": "Dev", "url": "https://addons.mozilla.org/user/dev" } }),
            &ValidationContext::new(),
        );
        assert_eq!(codes(&diags), vec![MessageCode::RestrictedHomepageUrl]);
    }

    #[rstest]
    #[case(Some("60.0"), true)]
    #[case(None, true)]
    #[case(Some("80.0"), false)]
    #[case(Some("78.0"), false)]
    #[case(Some("78.0a1"), true)]
    fn test_restricted_permission(#[case] min_version: Option<&str>, #[case] flagged: bool) {
        let context = ValidationContext::new().restrict_permission("userScripts", "78.0");
        let mut gecko = json!({ "id": "a@example.com" });
        if let Some(min_version) = min_version {
            gecko["strict_min_version"] = json!(min_version);
        }
        let diags = lint(
            json!({ "permissions": ["userScripts", "tabs"], "browser_specific_settings": { "gecko": gecko } }),
            &context,
        );
        assert_eq!(codes(&diags) == vec![MessageCode::RestrictedPermission], flagged);
        if !flagged {
            assert_eq!(diags, vec![]);
        }
    }

    #[rstest]
    #[case(json!({ "manifest_version": 3 }), false, true)]
    #[case(json!({ "manifest_version": 3 }), true, false)]
    #[case(json!({ "manifest_version": 3, "browser_specific_settings": { "gecko": { "id": "a@example.com" } } }), false, false)]
    #[case(json!({ "manifest_version": 2 }), false, false)]
    fn test_extension_id_required(
        #[case] manifest: Value,
        #[case] already_signed: bool,
        #[case] flagged: bool,
    ) {
        let diags = lint(manifest, &ValidationContext::new().already_signed(already_signed));
        assert_eq!(
            diags.iter().any(|d| d.code == MessageCode::ExtensionIdRequired),
            flagged
        );
    }

    #[rstest]
    #[case(true, json!({ "hidden": true, "browser_action": {} }), true)]
    #[case(true, json!({ "hidden": true }), false)]
    #[case(true, json!({ "hidden": false, "page_action": {} }), false)]
    #[case(false, json!({ "hidden": true, "browser_action": {} }), false)]
    fn test_hidden_no_action(#[case] privileged: bool, #[case] manifest: Value, #[case] flagged: bool) {
        let diags = lint(manifest, &ValidationContext::new().privileged(privileged));
        assert_eq!(codes(&diags).contains(&MessageCode::HiddenNoAction), flagged);
    }

    #[test]
    fn test_invalid_addon_id() {
        let diags = lint(
            json!({ "browser_specific_settings": { "gecko": { "id": "not an id" } } }),
            &ValidationContext::new(),
        );
        assert_eq!(codes(&diags), vec![MessageCode::PropIdInvalid]);
    }

    #[rstest]
    #[case(2, "1.0.3", None)]
    #[case(2, "1.0a1", Some(MessageCode::VersionFormatDeprecated))]
    #[case(3, "1.0a1", Some(MessageCode::VersionFormatInvalid))]
    #[case(2, "01.0", Some(MessageCode::VersionFormatDeprecated))]
    #[case(2, "1.0 beta", Some(MessageCode::VersionFormatInvalid))]
    fn test_version_format(
        #[case] manifest_version: u64,
        #[case] version: &str,
        #[case] expected: Option<MessageCode>,
    ) {
        let diags = lint(
            json!({ "manifest_version": manifest_version, "version": version }),
            &ValidationContext::new().already_signed(true),
        );
        assert_eq!(diags.first().map(|d| d.code), expected);
    }
}
