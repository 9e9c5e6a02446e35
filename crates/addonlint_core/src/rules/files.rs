//! Rules about files referenced by the manifest.

use addonlint_manifest::{AddonKind, ManifestDocument};
use serde_json::Value;

use super::{RuleEngine, string_items};
use crate::diagnostic::{Diagnostic, Severity};
use crate::messages::MessageCode;
use crate::package::normalize_path;

impl RuleEngine<'_> {
    pub(super) fn check_background(&self, manifest: &ManifestDocument, out: &mut Vec<Diagnostic>) {
        let Some(background) = manifest.get("background") else {
            return;
        };

        for script in string_items(background.get("scripts")) {
            self.require_background_file(script, "script", out);
        }
        if let Some(page) = background.get("page").and_then(Value::as_str) {
            self.require_background_file(page, "page", out);
        }

        let Some(worker) = background.get("service_worker").and_then(Value::as_str) else {
            return;
        };
        if !self.context.features.background_service_worker {
            out.push(
                self.catalog
                    .render(
                        MessageCode::ManifestFieldUnsupported,
                        &[
                            ("path", "/background/service_worker"),
                            ("detail", "is not supported"),
                        ],
                    )
                    .with_severity(Severity::Error),
            );
        } else if manifest.manifest_version() >= 3 {
            self.require_background_file(worker, "service_worker", out);
        }
    }

    fn require_background_file(&self, path: &str, kind: &str, out: &mut Vec<Diagnostic>) {
        if !self.file_exists(path) {
            let path = normalize_path(path);
            out.push(
                self.catalog
                    .render(
                        MessageCode::ManifestBackgroundFileNotFound,
                        &[("kind", kind), ("path", &path)],
                    )
                    .with_file(path.as_str()),
            );
        }
    }

    pub(super) fn check_content_scripts(
        &self,
        manifest: &ManifestDocument,
        out: &mut Vec<Diagnostic>,
    ) {
        let Some(Value::Array(scripts)) = manifest.get("content_scripts") else {
            return;
        };
        for script in scripts {
            for pattern in string_items(script.get("matches")) {
                if let Some(host) = self.policy.blocked_host(pattern) {
                    out.push(self.catalog.render(
                        MessageCode::ManifestInvalidContent,
                        &[("pattern", pattern), ("host", host)],
                    ));
                }
            }
            for file in string_items(script.get("js")).chain(string_items(script.get("css"))) {
                if !self.file_exists(file) {
                    let path = normalize_path(file);
                    out.push(
                        self.catalog
                            .render(MessageCode::ManifestContentScriptFileNotFound, &[("path", &path)])
                            .with_file(path.as_str()),
                    );
                }
            }
        }
    }

    pub(super) fn check_dictionaries(&self, manifest: &ManifestDocument, out: &mut Vec<Diagnostic>) {
        if manifest.kind() != AddonKind::Dictionary {
            return;
        }
        if manifest.addon_id().is_none() {
            out.push(self.catalog.render(MessageCode::ManifestDictMissingId, &[]));
        }

        let Some(Value::Object(dictionaries)) = manifest.get("dictionaries") else {
            return;
        };
        match dictionaries.len() {
            0 => out.push(self.catalog.render(MessageCode::ManifestEmptyDicts, &[])),
            1 => {}
            _ => out.push(self.catalog.render(MessageCode::ManifestMultipleDicts, &[])),
        }

        for dic in dictionaries.values().filter_map(Value::as_str) {
            let dic = normalize_path(dic);
            let aff = match dic.strip_suffix(".dic") {
                Some(stem) => format!("{}.aff", stem),
                None => format!("{}.aff", dic),
            };
            for path in [dic, aff] {
                if !self.file_exists(&path) {
                    out.push(
                        self.catalog
                            .render(MessageCode::ManifestDictNotFound, &[("path", &path)])
                            .with_file(path.as_str()),
                    );
                }
            }
        }
    }
}
