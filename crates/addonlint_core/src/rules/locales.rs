//! `_locales` consistency.

use std::collections::BTreeSet;

use addonlint_manifest::ManifestDocument;
use serde_json::Value;
use tracing::debug;

use super::RuleEngine;
use crate::diagnostic::Diagnostic;
use crate::messages::MessageCode;

const LOCALES_DIR: &str = "_locales/";
const MESSAGES_FILE: &str = "messages.json";

/// Locale directories in the package and those holding a messages file.
#[derive(Debug, Default, PartialEq, Eq)]
struct LocaleListing<'a> {
    present: BTreeSet<&'a str>,
    with_messages: BTreeSet<&'a str>,
}

impl<'a> LocaleListing<'a> {
    fn from_paths(paths: impl IntoIterator<Item = &'a str>) -> Self {
        let mut listing = Self::default();
        for path in paths {
            let Some(rest) = path.strip_prefix(LOCALES_DIR) else {
                continue;
            };
            let Some((locale, file)) = rest.split_once('/') else {
                continue;
            };
            if locale.is_empty() {
                continue;
            }
            listing.present.insert(locale);
            if file == MESSAGES_FILE {
                listing.with_messages.insert(locale);
            }
        }
        listing
    }
}

impl RuleEngine<'_> {
    pub(super) fn check_locales(&self, manifest: &ManifestDocument, out: &mut Vec<Diagnostic>) {
        let listing = LocaleListing::from_paths(self.package.paths());
        debug!(
            "Found {} locale(s), {} with messages",
            listing.present.len(),
            listing.with_messages.len()
        );

        let Some(default_locale) = manifest.get("default_locale").and_then(Value::as_str) else {
            if !listing.with_messages.is_empty() {
                out.push(self.catalog.render(MessageCode::NoDefaultLocale, &[]));
            }
            return;
        };

        if !listing.with_messages.contains(default_locale) {
            out.push(
                self.catalog
                    .render(MessageCode::NoMessagesFile, &[("locale", default_locale)]),
            );
        }
        for locale in listing.present.difference(&listing.with_messages) {
            if *locale != default_locale {
                out.push(
                    self.catalog
                        .render(MessageCode::NoMessagesFileInLocales, &[("locale", *locale)])
                        .with_file(format!("{}{}/{}", LOCALES_DIR, locale, MESSAGES_FILE)),
                );
            }
        }
    }
}
