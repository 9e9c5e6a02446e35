//! Core linter engine.

use std::sync::Arc;

use addonlint_manifest::{
    AddonKind, JsonSchemaAdapter, ManifestDocument, SchemaAnnotations, SchemaOptions,
    SchemaValidator,
};
use jsonc_parser::ParseOptions;
use serde_json::Value;
use tracing::{debug, info};

use crate::assets::{AssetValidator, HeaderDecoder, ImageDecoder, collect_icons, collect_theme_images};
use crate::classifier::ErrorClassifier;
use crate::collector::DiagnosticsCollector;
use crate::compat::CompatibilityIndex;
use crate::config::LinterConfig;
use crate::context::ValidationContext;
use crate::messages::{Catalog, MessageCode};
use crate::metadata::Metadata;
use crate::package::{FileOracle, read_text};
use crate::policy::Policy;
use crate::result::LintReport;
use crate::rules::RuleEngine;
use crate::LinterError;

/// Name of the manifest file at the package root.
pub const MANIFEST_FILE: &str = "manifest.json";

/// The manifest validation engine.
///
/// Holds the immutable tables shared by every run. One instance can lint any
/// number of packages, concurrently.
pub struct ManifestLinter {
    catalog: Arc<Catalog>,
    policy: Arc<Policy>,
    compat: Arc<CompatibilityIndex>,
    schema: Arc<dyn SchemaValidator>,
    decoder: Arc<dyn ImageDecoder>,
    amo_permission: String,
}

impl ManifestLinter {
    /// Creates a linter with the built-in tables and no compatibility data.
    pub fn new() -> Self {
        let annotations = SchemaAnnotations::default();
        Self {
            amo_permission: annotations.amo_permission.clone(),
            catalog: Arc::new(Catalog::builtin()),
            policy: Arc::new(Policy::builtin()),
            compat: Arc::new(CompatibilityIndex::empty()),
            schema: Arc::new(JsonSchemaAdapter::builtin(annotations)),
            decoder: Arc::new(HeaderDecoder),
        }
    }

    /// Creates a linter from a configuration, loading compatibility data.
    pub fn from_config(config: &LinterConfig) -> Result<Self, LinterError> {
        let compat = match config.compat_data_path() {
            Some(path) => {
                info!("Loading compatibility data from {}", path.display());
                CompatibilityIndex::from_file(&path)?
            }
            None => CompatibilityIndex::empty(),
        };
        Ok(Self {
            amo_permission: config.annotations.amo_permission.clone(),
            schema: Arc::new(JsonSchemaAdapter::builtin(config.annotations.clone())),
            policy: Arc::new(config.policy()),
            compat: Arc::new(compat),
            ..Self::new()
        })
    }

    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.catalog = Arc::new(catalog);
        self
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn with_compat(mut self, compat: CompatibilityIndex) -> Self {
        self.compat = Arc::new(compat);
        self
    }

    pub fn with_schema(mut self, schema: Arc<dyn SchemaValidator>) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn ImageDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Lints the `manifest.json` of a package.
    pub async fn lint_package(
        &self,
        package: &dyn FileOracle,
        context: &ValidationContext,
    ) -> Result<LintReport, LinterError> {
        if !package.exists(MANIFEST_FILE) {
            return Err(LinterError::file(format!(
                "{} not found in package",
                MANIFEST_FILE
            )));
        }
        let text = read_text(package, MANIFEST_FILE).await?;
        self.lint_text(&text, package, context).await
    }

    /// Lints manifest text. Comments and trailing commas are tolerated;
    /// text that still does not parse yields a `JSON_INVALID` report.
    pub async fn lint_text(
        &self,
        text: &str,
        package: &dyn FileOracle,
        context: &ValidationContext,
    ) -> Result<LintReport, LinterError> {
        let parsed = jsonc_parser::parse_to_serde_value(text, &ParseOptions::default())
            .map_err(|e| e.to_string())
            .and_then(|value| value.ok_or_else(|| "the file is empty".to_string()));

        match parsed {
            Ok(document @ Value::Object(_)) => self.lint(&document, package, context).await,
            Ok(_) => Ok(self.json_invalid("must be a JSON object")),
            Err(detail) => Ok(self.json_invalid(&detail)),
        }
    }

    fn json_invalid(&self, detail: &str) -> LintReport {
        let collector = DiagnosticsCollector::new(Arc::clone(&self.catalog));
        collector.add(
            self.catalog
                .render(MessageCode::JsonInvalid, &[("path", MANIFEST_FILE), ("detail", detail)])
                .with_file(MANIFEST_FILE),
        );
        LintReport::from_collector(&collector, None)
    }

    /// Lints a decoded manifest document.
    pub async fn lint(
        &self,
        document: &Value,
        package: &dyn FileOracle,
        context: &ValidationContext,
    ) -> Result<LintReport, LinterError> {
        let collector = DiagnosticsCollector::new(Arc::clone(&self.catalog));

        let outcome = self.schema.validate(
            document,
            &SchemaOptions {
                privileged: context.privileged,
            },
        );
        debug!(
            "Schema validation: valid={}, {} issue(s)",
            outcome.valid,
            outcome.issues.len()
        );

        let manifest = ManifestDocument::from_value(document.clone())?;
        let classifier = ErrorClassifier::new(
            Arc::clone(&self.catalog),
            context.privileged,
            manifest.manifest_version(),
        )
        .with_amo_permission(self.amo_permission.as_str());
        collector.extend(classifier.classify_all(&outcome.issues));

        let engine = RuleEngine::new(
            Arc::clone(&self.catalog),
            Arc::clone(&self.policy),
            Arc::clone(&self.compat),
            context,
            package,
        );
        if let Some(diagnostic) = engine.check_legacy_shape(&manifest) {
            collector.add(diagnostic);
        }

        let manifest = manifest.normalize();
        collector.extend(engine.run(&manifest));

        let assets = AssetValidator::new(package, self.decoder.as_ref(), &self.catalog, &collector);
        assets.validate_icons(&collect_icons(&manifest)).await;
        if manifest.kind() == AddonKind::StaticTheme {
            assets
                .validate_theme_images(&collect_theme_images(&manifest))
                .await;
        }

        let metadata = Metadata::from_manifest(&manifest);
        let report = LintReport::from_collector(&collector, Some(metadata));
        info!(
            "Linted {}: {} error(s), {} warning(s), {} notice(s)",
            manifest.kind().as_str(),
            report.errors.len(),
            report.warnings.len(),
            report.notices.len()
        );
        Ok(report)
    }
}

impl Default for ManifestLinter {
    fn default() -> Self {
        Self::new()
    }
}
