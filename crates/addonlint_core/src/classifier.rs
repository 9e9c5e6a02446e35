//! Schema issue classification.
//!
//! Turns each [`RawSchemaIssue`] into at most one [`Diagnostic`]. The issue
//! kind is matched exhaustively, then permission-array paths are refined into
//! their field-specific codes.

use std::sync::Arc;

use addonlint_manifest::{IssueKind, PathToken, RawSchemaIssue};
use serde_json::Value;

use crate::diagnostic::Diagnostic;
use crate::messages::{Catalog, MessageCode};

const DEFAULT_AMO_PERMISSION: &str = "mozillaAddons";

/// Maps raw schema issues to diagnostics.
pub struct ErrorClassifier {
    catalog: Arc<Catalog>,
    privileged: bool,
    manifest_version: u64,
    amo_permission: String,
}

impl ErrorClassifier {
    pub fn new(catalog: Arc<Catalog>, privileged: bool, manifest_version: u64) -> Self {
        Self {
            catalog,
            privileged,
            manifest_version,
            amo_permission: DEFAULT_AMO_PERMISSION.to_string(),
        }
    }

    /// Sets the permission named by `MOZILLA_ADDONS_PERMISSION_REQUIRED`.
    pub fn with_amo_permission(mut self, permission: impl Into<String>) -> Self {
        self.amo_permission = permission.into();
        self
    }

    /// Classifies every issue, dropping the suppressed ones.
    pub fn classify_all<'a>(
        &self,
        issues: impl IntoIterator<Item = &'a RawSchemaIssue>,
    ) -> Vec<Diagnostic> {
        issues
            .into_iter()
            .filter_map(|issue| self.classify(issue))
            .collect()
    }

    /// Classifies one issue. Returns `None` when the issue is suppressed.
    pub fn classify(&self, issue: &RawSchemaIssue) -> Option<Diagnostic> {
        let pointer = issue.pointer();
        let detail = issue.message.as_str();
        let path_args = [("path", pointer.as_str()), ("detail", detail)];

        let diagnostic = match &issue.kind {
            IssueKind::Required => self.catalog.render(MessageCode::ManifestFieldRequired, &path_args),
            IssueKind::Deprecated => match self.catalog.deprecated_replacement(&pointer) {
                Some(code) => {
                    let diagnostic = self.catalog.render(code, &path_args);
                    if diagnostic.description.is_some() {
                        diagnostic
                    } else {
                        diagnostic.with_description(detail)
                    }
                }
                None => self.catalog.render(MessageCode::ManifestFieldDeprecated, &path_args),
            },
            IssueKind::MinManifestVersion | IssueKind::MaxManifestVersion => {
                self.unsupported(issue, &pointer, detail)
            }
            IssueKind::PrivilegedPermissions {
                privileged_permissions,
            } if issue.top_level() == Some("permissions") => self.privileged_branch(
                privileged_permissions,
                MessageCode::ManifestPermissionsPrivileged,
                &pointer,
            ),
            IssueKind::Type => match self.bad_permission(issue) {
                Some(diagnostic) => diagnostic,
                None => self.catalog.render(MessageCode::ManifestFieldInvalid, &path_args),
            },
            IssueKind::Privileged {
                privileged_permissions,
            } => match self.bad_permission(issue) {
                Some(diagnostic) => diagnostic,
                None => self.privileged_branch(
                    privileged_permissions,
                    MessageCode::ManifestFieldPrivileged,
                    &pointer,
                ),
            },
            IssueKind::PrivilegedPermissions { .. } | IssueKind::Other { .. } => {
                match self.bad_permission(issue) {
                    Some(diagnostic) => diagnostic,
                    None => self.catalog.render(MessageCode::JsonInvalid, &path_args),
                }
            }
        };

        let diagnostic = self.refine_array_element(issue, diagnostic);

        if self.manifest_version == 2
            && matches!(
                diagnostic.code,
                MessageCode::ManifestHostPermissions | MessageCode::ManifestBadHostPermission
            )
        {
            return None;
        }
        Some(diagnostic)
    }

    fn unsupported(&self, issue: &RawSchemaIssue, pointer: &str, detail: &str) -> Diagnostic {
        if let Some((field, _, value)) = permission_element(issue) {
            return self.catalog.render(
                MessageCode::ManifestPermissionUnsupported,
                &[("field", field), ("value", &value), ("detail", detail)],
            );
        }
        if pointer == "/applications" {
            return self.catalog.render(MessageCode::ApplicationsInvalid, &[]);
        }
        self.catalog.render(
            MessageCode::ManifestFieldUnsupported,
            &[("path", pointer), ("detail", detail)],
        )
    }

    fn privileged_branch(
        &self,
        privileged_permissions: &[String],
        non_privileged: MessageCode,
        pointer: &str,
    ) -> Diagnostic {
        let listed = privileged_permissions.join(", ");
        let args = [
            ("path", pointer),
            ("permissions", listed.as_str()),
            ("permission", self.amo_permission.as_str()),
        ];
        let code = match (self.privileged, privileged_permissions.is_empty()) {
            (true, true) => MessageCode::PrivilegedFeaturesRequired,
            (true, false) => MessageCode::MozillaAddonsPermissionRequired,
            (false, _) => non_privileged,
        };
        self.catalog.render(code, &args)
    }

    /// A non-string value inside one of the permission lists.
    fn bad_permission(&self, issue: &RawSchemaIssue) -> Option<Diagnostic> {
        let value = issue.value.as_ref()?;
        if value.is_string() {
            return None;
        }
        let code = match issue.top_level()? {
            "permissions" => MessageCode::ManifestBadPermission,
            "optional_permissions" => MessageCode::ManifestBadOptionalPermission,
            "host_permissions" => MessageCode::ManifestBadHostPermission,
            _ => return None,
        };
        Some(self.catalog.render(code, &[("detail", &issue.message)]))
    }

    fn refine_array_element(&self, issue: &RawSchemaIssue, diagnostic: Diagnostic) -> Diagnostic {
        if matches!(
            diagnostic.code,
            MessageCode::ManifestBadPermission
                | MessageCode::ManifestBadOptionalPermission
                | MessageCode::ManifestBadHostPermission
                | MessageCode::ManifestPermissionUnsupported
        ) {
            return diagnostic;
        }
        let Some((field, index, value)) = array_element(issue) else {
            return diagnostic;
        };
        let code = match field {
            "permissions" => MessageCode::ManifestPermissions,
            "optional_permissions" => MessageCode::ManifestOptionalPermissions,
            "host_permissions" => MessageCode::ManifestHostPermissions,
            "install_origins" => MessageCode::ManifestInstallOrigins,
            _ => return diagnostic,
        };
        let index = index.to_string();
        self.catalog.render(
            code,
            &[("field", field), ("value", &value), ("index", &index)],
        )
    }
}

/// `(field, index, value)` for a path of the form `/<field>/<n>`.
fn array_element(issue: &RawSchemaIssue) -> Option<(&str, usize, String)> {
    let [PathToken::Key(field), PathToken::Index(index)] = issue.path.as_slice() else {
        return None;
    };
    let value = match &issue.value {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    Some((field.as_str(), *index, value))
}

fn permission_element(issue: &RawSchemaIssue) -> Option<(&str, usize, String)> {
    array_element(issue).filter(|(field, _, _)| {
        matches!(
            *field,
            "permissions" | "optional_permissions" | "host_permissions"
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Severity;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    fn classifier(privileged: bool, manifest_version: u64) -> ErrorClassifier {
        ErrorClassifier::new(Arc::new(Catalog::builtin()), privileged, manifest_version)
    }

    fn issue(kind: IssueKind, pointer: &str, value: Option<Value>) -> RawSchemaIssue {
        RawSchemaIssue::at(kind, pointer, value, "must be valid")
    }

    #[test]
    fn test_required() {
        let diag = classifier(false, 2)
            .classify(&issue(IssueKind::Required, "/name", None))
            .unwrap();
        assert_eq!(diag.code, MessageCode::ManifestFieldRequired);
        assert_eq!(diag.severity, Severity::Error);
        assert_eq!(diag.message, "\"/name\" is a required property");
    }

    #[test]
    fn test_deprecated_with_replacement_keeps_own_description() {
        let diag = classifier(false, 2)
            .classify(&issue(
                IssueKind::Deprecated,
                "/theme/images/headerURL",
                Some(json!("a.png")),
            ))
            .unwrap();
        assert_eq!(diag.code, MessageCode::ManifestThemeLwtAlias);
        assert_eq!(diag.description.as_deref(), Some("must be valid"));
    }

    #[test]
    fn test_deprecated_without_replacement() {
        let diag = classifier(false, 2)
            .classify(&issue(IssueKind::Deprecated, "/options_page", Some(json!("o.html"))))
            .unwrap();
        assert_eq!(diag.code, MessageCode::ManifestFieldDeprecated);
        assert_eq!(diag.severity, Severity::Warning);
    }

    #[rstest]
    #[case(IssueKind::MinManifestVersion, "/permissions/1", MessageCode::ManifestPermissionUnsupported)]
    #[case(IssueKind::MaxManifestVersion, "/optional_permissions/0", MessageCode::ManifestPermissionUnsupported)]
    #[case(IssueKind::MaxManifestVersion, "/applications", MessageCode::ApplicationsInvalid)]
    #[case(IssueKind::MaxManifestVersion, "/applications/gecko", MessageCode::ManifestFieldUnsupported)]
    #[case(IssueKind::MinManifestVersion, "/action", MessageCode::ManifestFieldUnsupported)]
    fn test_manifest_version_gates(
        #[case] kind: IssueKind,
        #[case] pointer: &str,
        #[case] expected: MessageCode,
    ) {
        let diag = classifier(false, 3)
            .classify(&issue(kind, pointer, Some(json!("value"))))
            .unwrap();
        assert_eq!(diag.code, expected);
    }

    #[rstest]
    #[case(true, vec![], MessageCode::PrivilegedFeaturesRequired)]
    #[case(true, vec!["telemetry"], MessageCode::MozillaAddonsPermissionRequired)]
    #[case(false, vec!["telemetry"], MessageCode::ManifestPermissionsPrivileged)]
    fn test_privileged_permissions(
        #[case] privileged: bool,
        #[case] listed: Vec<&str>,
        #[case] expected: MessageCode,
    ) {
        let kind = IssueKind::PrivilegedPermissions {
            privileged_permissions: listed.into_iter().map(String::from).collect(),
        };
        let diag = classifier(privileged, 2)
            .classify(&issue(kind, "/permissions", Some(json!(["telemetry"]))))
            .unwrap();
        assert_eq!(diag.code, expected);
    }

    #[test]
    fn test_non_privileged_message_lists_permissions() {
        let kind = IssueKind::PrivilegedPermissions {
            privileged_permissions: vec!["telemetry".into(), "networkStatus".into()],
        };
        let diag = classifier(false, 2)
            .classify(&issue(kind, "/permissions", None))
            .unwrap();
        assert_eq!(
            diag.message,
            "Privileged permissions requested by a non-privileged add-on: telemetry, networkStatus"
        );
    }

    #[test]
    fn test_privileged_permissions_elsewhere_is_json_invalid() {
        let kind = IssueKind::PrivilegedPermissions {
            privileged_permissions: vec![],
        };
        let diag = classifier(false, 2)
            .classify(&issue(kind, "/name", Some(json!("x"))))
            .unwrap();
        assert_eq!(diag.code, MessageCode::JsonInvalid);
    }

    #[rstest]
    #[case("/permissions/0", MessageCode::ManifestBadPermission)]
    #[case("/optional_permissions/2", MessageCode::ManifestBadOptionalPermission)]
    #[case("/host_permissions/0", MessageCode::ManifestBadHostPermission)]
    fn test_non_string_permission(#[case] pointer: &str, #[case] expected: MessageCode) {
        let diag = classifier(false, 3)
            .classify(&issue(IssueKind::Type, pointer, Some(json!(42))))
            .unwrap();
        assert_eq!(diag.code, expected);
        assert!(diag.message.contains("must be valid"));
    }

    #[test]
    fn test_type_elsewhere_is_field_invalid() {
        let diag = classifier(false, 2)
            .classify(&issue(IssueKind::Type, "/name", Some(json!(42))))
            .unwrap();
        assert_eq!(diag.code, MessageCode::ManifestFieldInvalid);
    }

    #[rstest]
    #[case(true, MessageCode::PrivilegedFeaturesRequired)]
    #[case(false, MessageCode::ManifestFieldPrivileged)]
    fn test_bare_privileged_property(#[case] privileged: bool, #[case] expected: MessageCode) {
        let kind = IssueKind::Privileged {
            privileged_permissions: vec![],
        };
        let diag = classifier(privileged, 2)
            .classify(&issue(kind, "/hidden", Some(json!(true))))
            .unwrap();
        assert_eq!(diag.code, expected);
    }

    #[test]
    fn test_other_keyword_is_json_invalid() {
        let kind = IssueKind::Other {
            keyword: "pattern".into(),
        };
        let diag = classifier(false, 2)
            .classify(&issue(kind, "/version", Some(json!("1.0"))))
            .unwrap();
        assert_eq!(diag.code, MessageCode::JsonInvalid);
        assert_eq!(diag.severity, Severity::Error);
    }

    #[rstest]
    #[case("/permissions/1", MessageCode::ManifestPermissions, "/permissions: Invalid permissions \"foo\" at 1.")]
    #[case("/optional_permissions/0", MessageCode::ManifestOptionalPermissions, "/optional_permissions: Invalid optional_permissions \"foo\" at 0.")]
    #[case("/host_permissions/3", MessageCode::ManifestHostPermissions, "/host_permissions: Invalid host_permissions \"foo\" at 3.")]
    #[case("/install_origins/0", MessageCode::ManifestInstallOrigins, "/install_origins: Invalid install_origins \"foo\" at 0.")]
    fn test_array_element_refinement(
        #[case] pointer: &str,
        #[case] expected: MessageCode,
        #[case] message: &str,
    ) {
        let kind = IssueKind::Other {
            keyword: "anyOf".into(),
        };
        let diag = classifier(false, 3)
            .classify(&issue(kind, pointer, Some(json!("foo"))))
            .unwrap();
        assert_eq!(diag.code, expected);
        assert_eq!(diag.message, message);
    }

    #[rstest]
    #[case(Some(json!("*://foo/")), IssueKind::Other { keyword: "anyOf".into() })]
    #[case(Some(json!(7)), IssueKind::Type)]
    fn test_host_permission_codes_suppressed_for_mv2(
        #[case] value: Option<Value>,
        #[case] kind: IssueKind,
    ) {
        let raw = issue(kind, "/host_permissions/0", value);
        assert_eq!(classifier(false, 2).classify(&raw), None);
        assert!(classifier(false, 3).classify(&raw).is_some());
    }

    #[test]
    fn test_classify_all_preserves_order() {
        let issues = vec![
            issue(IssueKind::Required, "/name", None),
            issue(IssueKind::Type, "/host_permissions/0", Some(json!(1))),
            issue(IssueKind::Required, "/version", None),
        ];
        let diags = classifier(false, 2).classify_all(&issues);
        let codes: Vec<_> = diags.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(
            codes,
            vec![
                "\"/name\" is a required property",
                "\"/version\" is a required property"
            ]
        );
    }
}
