//! Structural manifest rules.
//!
//! [`RuleEngine`] runs every rule over the normalized manifest and returns
//! the diagnostics in rule order. No rule stops the pass.

mod files;
mod identity;
mod locales;

use std::sync::Arc;

use addonlint_manifest::{LegacyShape, ManifestDocument};
use serde_json::Value;
use tracing::debug;

use crate::compat::{CompatibilityChecker, CompatibilityIndex};
use crate::context::ValidationContext;
use crate::csp::CspAnalyzer;
use crate::diagnostic::Diagnostic;
use crate::messages::{Catalog, MessageCode};
use crate::package::{FileOracle, normalize_path};
use crate::policy::Policy;

const CSP_PROPERTY: &str = "content_security_policy";

/// Runs the structural rules of one lint pass.
pub struct RuleEngine<'a> {
    catalog: Arc<Catalog>,
    policy: Arc<Policy>,
    context: &'a ValidationContext,
    package: &'a dyn FileOracle,
    csp: CspAnalyzer,
    compat: Option<CompatibilityChecker>,
}

impl<'a> RuleEngine<'a> {
    pub fn new(
        catalog: Arc<Catalog>,
        policy: Arc<Policy>,
        compat: Arc<CompatibilityIndex>,
        context: &'a ValidationContext,
        package: &'a dyn FileOracle,
    ) -> Self {
        let compat = (!compat.is_empty())
            .then(|| CompatibilityChecker::new(compat, Arc::clone(&catalog)));
        Self {
            csp: CspAnalyzer::new(Arc::clone(&catalog)),
            catalog,
            policy,
            context,
            package,
            compat,
        }
    }

    /// Warns about the legacy `applications` key. Runs on the manifest as
    /// declared, before normalization.
    pub fn check_legacy_shape(&self, manifest: &ManifestDocument) -> Option<Diagnostic> {
        let code = match manifest.legacy_shape()? {
            LegacyShape::ApplicationsIgnored => MessageCode::IgnoredApplicationsProperty,
            LegacyShape::ApplicationsOnly => MessageCode::ApplicationsDeprecated,
        };
        Some(self.catalog.render(code, &[]))
    }

    /// Runs every rule over a normalized manifest.
    pub fn run(&self, manifest: &ManifestDocument) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        self.check_csp(manifest, &mut out);
        self.check_background(manifest, &mut out);
        self.check_content_scripts(manifest, &mut out);
        self.check_dictionaries(manifest, &mut out);
        self.check_update_url(manifest, &mut out);
        self.check_strict_max_version(manifest, &mut out);
        self.check_homepage_url(manifest, &mut out);
        self.check_restricted_permissions(manifest, &mut out);
        self.check_extension_id(manifest, &mut out);
        self.check_hidden(manifest, &mut out);
        self.check_id_format(manifest, &mut out);
        self.check_version_format(manifest, &mut out);
        self.check_locales(manifest, &mut out);
        self.check_compatibility(manifest, &mut out);
        debug!("Structural rules produced {} diagnostic(s)", out.len());
        out
    }

    /// Whether a manifest-relative path is in the package.
    fn file_exists(&self, path: &str) -> bool {
        self.package.exists(&normalize_path(path))
    }

    /// The minimum desktop version, with the context override first.
    fn min_version<'m>(&'m self, manifest: &'m ManifestDocument) -> Option<&'m str> {
        self.context
            .min_version
            .as_deref()
            .or_else(|| manifest.strict_min_version())
    }

    fn check_csp(&self, manifest: &ManifestDocument, out: &mut Vec<Diagnostic>) {
        match manifest.get(CSP_PROPERTY) {
            Some(Value::String(policy)) => out.extend(self.csp.check(policy, CSP_PROPERTY)),
            Some(Value::Object(policies)) => {
                for (context, policy) in policies {
                    if let Some(policy) = policy.as_str() {
                        let property = format!("{}.{}", CSP_PROPERTY, context);
                        out.extend(self.csp.check(policy, &property));
                    }
                }
            }
            _ => {}
        }
    }

    fn check_compatibility(&self, manifest: &ManifestDocument, out: &mut Vec<Diagnostic>) {
        let Some(checker) = &self.compat else {
            return;
        };
        let min_version = self.min_version(manifest);
        let android_min_version = manifest.android_strict_min_version().or(min_version);
        out.extend(checker.check(manifest, min_version, android_min_version));
    }
}

/// String elements of an array property.
fn string_items<'m>(value: Option<&'m Value>) -> impl Iterator<Item = &'m str> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}
