//! End-to-end tests of the manifest linter.
//!
//! Each test runs the full pass: schema validation, classification,
//! structural rules and asset checks.

use std::collections::BTreeSet;
use std::sync::Arc;

use addonlint_core::{
    Diagnostic, LintReport, ManifestLinter, MemoryPackage, MessageCode, Severity,
    ValidationContext,
};
use addonlint_manifest::{
    IssueKind, JsonSchemaAdapter, RawSchemaIssue, SchemaAnnotations, SchemaOptions,
    SchemaOutcome, SchemaValidator,
};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{Value, json};

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&13u32.to_be_bytes());
    bytes.extend_from_slice(b"IHDR");
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&[8, 6, 0, 0, 0, 0, 0, 0, 0]);
    bytes
}

fn base_manifest() -> Value {
    json!({ "manifest_version": 2, "name": "Demo", "version": "1.0" })
}

fn with(mut manifest: Value, extra: Value) -> Value {
    if let (Value::Object(target), Value::Object(extra)) = (&mut manifest, extra) {
        target.extend(extra);
    }
    manifest
}

async fn lint(manifest: Value, package: &MemoryPackage, context: &ValidationContext) -> LintReport {
    ManifestLinter::new()
        .lint(&manifest, package, context)
        .await
        .unwrap()
}

fn codes_of(report: &LintReport) -> Vec<MessageCode> {
    report.diagnostics().map(|d| d.code).collect()
}

fn count(report: &LintReport, code: MessageCode) -> usize {
    report.diagnostics().filter(|d| d.code == code).count()
}

#[tokio::test]
async fn missing_required_field_is_one_error() {
    let manifest = json!({ "manifest_version": 2, "version": "1.0" });

    let outcome = JsonSchemaAdapter::builtin(SchemaAnnotations::default())
        .validate(&manifest, &SchemaOptions::default());
    assert!(!outcome.valid);

    let report = lint(manifest, &MemoryPackage::new(), &ValidationContext::new()).await;
    assert!(!report.valid);
    let required: Vec<&Diagnostic> = report
        .diagnostics()
        .filter(|d| d.code == MessageCode::ManifestFieldRequired)
        .collect();
    assert_eq!(required.len(), 1);
    assert!(required[0].message.contains("/name"));
}

#[tokio::test]
async fn lint_is_deterministic() {
    let manifest = with(
        base_manifest(),
        json!({
            "icons": { "16": "a.png", "32": "b.png", "48": "missing.png" },
            "content_security_policy": "default-src * 'unsafe-eval'",
            "content_scripts": [{ "matches": ["*://addons.mozilla.org/*"], "js": ["c.js"] }]
        }),
    );
    let package = MemoryPackage::new()
        .with_file("a.png", png(16, 16))
        .with_file("b.png", png(20, 32));
    let context = ValidationContext::new();

    let first = lint(manifest.clone(), &package, &context).await;
    let second = lint(manifest, &package, &context).await;

    let as_set = |report: &LintReport| report.diagnostics().cloned().collect::<BTreeSet<_>>();
    assert_eq!(as_set(&first), as_set(&second));
    assert_eq!(first.valid, second.valid);
    assert_eq!(first.metadata, second.metadata);
}

#[rstest]
#[case("script-src 'self'", false, false)]
#[case("default-src *", true, false)]
#[case("default-src 'self'; script-src 'self' 'unsafe-eval'", false, true)]
#[case("script-src 'self' 'unsafe-eval'; object-src 'self'", true, true)]
#[tokio::test]
async fn csp_posture(#[case] policy: &str, #[case] insecure: bool, #[case] eval: bool) {
    let manifest = with(base_manifest(), json!({ "content_security_policy": policy }));
    let report = lint(manifest, &MemoryPackage::new(), &ValidationContext::new()).await;

    assert_eq!(count(&report, MessageCode::ManifestCsp), usize::from(insecure));
    assert_eq!(count(&report, MessageCode::ManifestCspUnsafeEval), usize::from(eval));
    assert!(report.valid);
}

#[rstest]
#[case("icon.png", png(32, 16), Severity::Error)]
#[case(
    "icon.svg",
    b"<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"32\" height=\"16\"></svg>".to_vec(),
    Severity::Warning
)]
#[tokio::test]
async fn non_square_icon(#[case] path: &str, #[case] bytes: Vec<u8>, #[case] severity: Severity) {
    let manifest = with(base_manifest(), json!({ "icons": { "32": path } }));
    let package = MemoryPackage::new().with_file(path, bytes);
    let report = lint(manifest, &package, &ValidationContext::new()).await;

    let not_square: Vec<_> = report
        .diagnostics()
        .filter(|d| d.code == MessageCode::IconNotSquare)
        .collect();
    assert_eq!(not_square.len(), 1);
    assert_eq!(not_square[0].severity, severity);
    assert_eq!(not_square[0].file.as_deref(), Some(path));
}

#[tokio::test]
async fn two_dictionaries_are_one_error() {
    let manifest = with(
        base_manifest(),
        json!({
            "browser_specific_settings": { "gecko": { "id": "dict@example.com" } },
            "dictionaries": { "en-US": "en.dic", "fr": "fr.dic" }
        }),
    );
    let package = MemoryPackage::new()
        .with_file("en.dic", "")
        .with_file("en.aff", "")
        .with_file("fr.dic", "")
        .with_file("fr.aff", "");
    let report = lint(manifest, &package, &ValidationContext::new()).await;

    assert_eq!(codes_of(&report), vec![MessageCode::ManifestMultipleDicts]);
    assert!(!report.valid);
}

#[tokio::test]
async fn empty_dictionaries_are_an_error() {
    let manifest = with(
        base_manifest(),
        json!({
            "browser_specific_settings": { "gecko": { "id": "dict@example.com" } },
            "dictionaries": {}
        }),
    );
    let report = lint(manifest, &MemoryPackage::new(), &ValidationContext::new()).await;
    assert_eq!(codes_of(&report), vec![MessageCode::ManifestEmptyDicts]);
    assert!(!report.valid);
}

struct HostPermissionIssue;

impl SchemaValidator for HostPermissionIssue {
    fn validate(&self, document: &Value, _options: &SchemaOptions) -> SchemaOutcome {
        let issue = RawSchemaIssue::at(
            IssueKind::Other {
                keyword: "format".into(),
            },
            "/host_permissions/0",
            document.pointer("/host_permissions/0").cloned(),
            "must be a valid match pattern",
        );
        SchemaOutcome {
            valid: false,
            issues: vec![issue],
        }
    }
}

#[rstest]
#[case(2, 0)]
#[case(3, 1)]
#[tokio::test]
async fn host_permission_issue_depends_on_manifest_version(
    #[case] manifest_version: u64,
    #[case] expected: usize,
) {
    let manifest = json!({
        "manifest_version": manifest_version,
        "name": "Demo",
        "version": "1.0",
        "host_permissions": ["not a pattern"]
    });
    let linter = ManifestLinter::new().with_schema(Arc::new(HostPermissionIssue));
    let report = linter
        .lint(
            &manifest,
            &MemoryPackage::new(),
            &ValidationContext::new().already_signed(true),
        )
        .await
        .unwrap();

    assert_eq!(report.len(), expected);
    assert_eq!(count(&report, MessageCode::ManifestHostPermissions), expected);
    assert_eq!(report.warnings.len(), expected);
    assert!(report.valid);
}

fn locale_package() -> MemoryPackage {
    MemoryPackage::new()
        .with_file("_locales/fr/messages.json", "{}")
        .with_dir("_locales/de")
}

#[tokio::test]
async fn locales_without_default_locale() {
    let report = lint(base_manifest(), &locale_package(), &ValidationContext::new()).await;
    assert_eq!(codes_of(&report), vec![MessageCode::NoDefaultLocale]);
}

#[tokio::test]
async fn locales_with_default_locale() {
    let manifest = with(base_manifest(), json!({ "default_locale": "fr" }));
    let report = lint(manifest, &locale_package(), &ValidationContext::new()).await;

    assert_eq!(codes_of(&report), vec![MessageCode::NoMessagesFileInLocales]);
    let description = report.errors[0].description.as_deref().unwrap();
    assert!(description.contains("_locales/de/"));
    assert!(!description.contains("_locales/fr/"));
}

#[rstest]
#[case("60.0", true)]
#[case("80.0", false)]
#[tokio::test]
async fn restricted_permission_minimum_version(#[case] min_version: &str, #[case] flagged: bool) {
    let manifest = with(
        base_manifest(),
        json!({
            "permissions": ["userScripts"],
            "browser_specific_settings": {
                "gecko": { "id": "demo@example.com", "strict_min_version": min_version }
            }
        }),
    );
    let context = ValidationContext::new().restrict_permission("userScripts", "78.0");
    let report = lint(manifest, &MemoryPackage::new(), &context).await;

    if flagged {
        assert_eq!(codes_of(&report), vec![MessageCode::RestrictedPermission]);
        assert!(!report.valid);
    } else {
        assert!(report.is_empty(), "{:?}", report);
    }
}

#[tokio::test]
async fn legacy_applications_key() {
    let manifest = with(
        base_manifest(),
        json!({
            "applications": { "gecko": { "id": "old@example.com" } },
            "browser_specific_settings": { "gecko": { "id": "new@example.com" } }
        }),
    );
    let report = lint(manifest, &MemoryPackage::new(), &ValidationContext::new()).await;

    assert_eq!(codes_of(&report), vec![MessageCode::IgnoredApplicationsProperty]);
    assert_eq!(
        report.metadata.unwrap().id.as_deref(),
        Some("new@example.com")
    );
}

#[tokio::test]
async fn applications_rejected_in_mv3() {
    let manifest = json!({
        "manifest_version": 3,
        "name": "Demo",
        "version": "1.0",
        "applications": { "gecko": { "id": "demo@example.com" } }
    });
    let report = lint(manifest, &MemoryPackage::new(), &ValidationContext::new()).await;
    assert!(codes_of(&report).contains(&MessageCode::ApplicationsInvalid));
    assert!(!report.valid);
}

#[rstest]
#[case(false, MessageCode::ManifestPermissionsPrivileged)]
#[case(true, MessageCode::MozillaAddonsPermissionRequired)]
#[tokio::test]
async fn privileged_permissions(#[case] privileged: bool, #[case] expected: MessageCode) {
    let manifest = with(base_manifest(), json!({ "permissions": ["telemetry", "tabs"] }));
    let report = lint(
        manifest,
        &MemoryPackage::new(),
        &ValidationContext::new().privileged(privileged),
    )
    .await;
    assert_eq!(codes_of(&report), vec![expected]);
}

#[tokio::test]
async fn non_string_permission_invalidates_as_warning() {
    let manifest = with(base_manifest(), json!({ "permissions": [42] }));
    let report = lint(manifest, &MemoryPackage::new(), &ValidationContext::new()).await;

    assert_eq!(codes_of(&report), vec![MessageCode::ManifestBadPermission]);
    assert_eq!(report.warnings.len(), 1);
    assert!(!report.valid);
}

#[tokio::test]
async fn metadata_is_extracted() {
    let manifest = json!({
        "manifest_version": 2,
        "name": "Experiments",
        "version": "2.1",
        "browser_specific_settings": {
            "gecko": { "id": "exp@example.com", "strict_min_version": "91.0" }
        },
        "experiment_apis": {
            "exp": { "parent": { "paths": [["exp", "run"]] } }
        }
    });
    let report = lint(
        manifest,
        &MemoryPackage::new(),
        &ValidationContext::new().privileged(true),
    )
    .await;

    let metadata = report.metadata.clone().unwrap();
    assert_eq!(metadata.id.as_deref(), Some("exp@example.com"));
    assert_eq!(metadata.version.as_deref(), Some("2.1"));
    assert_eq!(metadata.firefox_min_version.as_deref(), Some("91.0"));
    assert_eq!(
        metadata.experiment_api_paths,
        BTreeSet::from(["exp.run".to_string()])
    );
}
