//! Icon and theme image validation.
//!
//! Every referenced path is checked in its own future; the futures of one
//! call are joined, so decoding overlaps while rule logic stays synchronous.

mod image;

pub use image::{DecodeError, HeaderDecoder, ImageDecoder, ImageInfo, SVG_MIME, read_image_info};

use std::collections::BTreeMap;

use addonlint_manifest::ManifestDocument;
use futures_util::future::join_all;
use serde_json::Value;
use tracing::{debug, warn};

use crate::collector::DiagnosticsCollector;
use crate::diagnostic::Severity;
use crate::messages::{Catalog, MessageCode};
use crate::package::{FileOracle, StreamMode, normalize_path};

const ICON_EXTENSIONS: &[&str] = &["jpg", "jpeg", "webp", "gif", "png", "svg"];
const ACTION_KEYS: &[&str] = &["browser_action", "page_action", "action"];

/// Allowed theme image extensions and the mime each implies.
const THEME_IMAGE_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("png", "image/png"),
];

/// An icon path with the sizes it is declared for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IconRef {
    pub path: String,
    /// Declared pixel sizes. Empty when declared without a size.
    pub sizes: Vec<u32>,
}

/// A theme image path and the property declaring it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeImageRef {
    pub property: String,
    pub path: String,
}

fn extension(path: &str) -> Option<String> {
    let name = path.rsplit('/').next()?;
    let (_, ext) = name.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

/// Adds a `"path"` or `{ "<size>": "path" }` declaration.
fn add_icon_value(value: &Value, add: &mut dyn FnMut(&str, Option<u32>)) {
    match value {
        Value::String(path) => add(path, None),
        Value::Object(map) => {
            for (size, path) in map {
                if let Some(path) = path.as_str() {
                    add(path, size.parse().ok());
                }
            }
        }
        _ => {}
    }
}

/// Collects icons from `icons`, each action's `default_icon` and `theme_icons`.
///
/// Paths are normalized and grouped; the result is sorted by path.
pub fn collect_icons(manifest: &ManifestDocument) -> Vec<IconRef> {
    let mut icons: BTreeMap<String, Vec<u32>> = BTreeMap::new();
    let mut add = |path: &str, size: Option<u32>| {
        let sizes = icons.entry(normalize_path(path)).or_default();
        if let Some(size) = size
            && !sizes.contains(&size)
        {
            sizes.push(size);
        }
    };
    if let Some(value) = manifest.get("icons") {
        add_icon_value(value, &mut add);
    }
    for key in ACTION_KEYS {
        let Some(action) = manifest.get(key) else {
            continue;
        };
        if let Some(value) = action.get("default_icon") {
            add_icon_value(value, &mut add);
        }
        if let Some(Value::Array(theme_icons)) = action.get("theme_icons") {
            for entry in theme_icons {
                let size = entry
                    .get("size")
                    .and_then(Value::as_u64)
                    .and_then(|size| u32::try_from(size).ok());
                for variant in ["light", "dark"] {
                    if let Some(path) = entry.get(variant).and_then(Value::as_str) {
                        add(path, size);
                    }
                }
            }
        }
    }

    icons
        .into_iter()
        .map(|(path, sizes)| IconRef { path, sizes })
        .collect()
}

/// Collects `theme.images` entries. Values may be a path or a list of paths.
pub fn collect_theme_images(manifest: &ManifestDocument) -> Vec<ThemeImageRef> {
    let Some(Value::Object(images)) = manifest.pointer("/theme/images") else {
        return Vec::new();
    };
    let mut refs = Vec::new();
    for (key, value) in images {
        let property = format!("theme.images.{}", key);
        let paths: Vec<&str> = match value {
            Value::String(path) => vec![path.as_str()],
            Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        };
        refs.extend(paths.into_iter().map(|path| ThemeImageRef {
            property: property.clone(),
            path: normalize_path(path),
        }));
    }
    refs
}

/// Checks referenced images against the package.
pub struct AssetValidator<'a> {
    package: &'a dyn FileOracle,
    decoder: &'a dyn ImageDecoder,
    catalog: &'a Catalog,
    collector: &'a DiagnosticsCollector,
}

impl<'a> AssetValidator<'a> {
    pub fn new(
        package: &'a dyn FileOracle,
        decoder: &'a dyn ImageDecoder,
        catalog: &'a Catalog,
        collector: &'a DiagnosticsCollector,
    ) -> Self {
        Self {
            package,
            decoder,
            catalog,
            collector,
        }
    }

    async fn decode(&self, path: &str) -> Result<ImageInfo, DecodeError> {
        let stream = self.package.open_stream(path, StreamMode::Binary)?;
        read_image_info(stream, self.decoder).await
    }

    /// Validates every icon, one future per path.
    pub async fn validate_icons(&self, icons: &[IconRef]) {
        debug!("Validating {} icon(s)", icons.len());
        join_all(icons.iter().map(|icon| self.validate_icon(icon))).await;
    }

    async fn validate_icon(&self, icon: &IconRef) {
        let path = icon.path.as_str();
        let args = [("path", path)];
        if !self.package.exists(path) {
            self.collector.add_unique(
                self.catalog
                    .render(MessageCode::ManifestIconNotFound, &args)
                    .with_file(path),
            );
            return;
        }
        if !extension(path).is_some_and(|ext| ICON_EXTENSIONS.contains(&ext.as_str())) {
            self.collector.add_unique(
                self.catalog
                    .render(MessageCode::WrongIconExtension, &args)
                    .with_file(path),
            );
            return;
        }

        let info = match self.decode(path).await {
            Ok(info) => info,
            Err(e) => {
                warn!("Failed to decode icon {}: {}", path, e);
                self.collector.add_unique(
                    self.catalog
                        .render(MessageCode::CorruptIconFile, &args)
                        .with_file(path),
                );
                return;
            }
        };

        if info.width != info.height {
            let mut diagnostic = self
                .catalog
                .render(MessageCode::IconNotSquare, &args)
                .with_file(path);
            if info.is_svg() {
                diagnostic = diagnostic.with_severity(Severity::Warning);
            }
            self.collector.add_unique(diagnostic);
        }

        if info.is_svg() {
            return;
        }
        let mut mismatched: Vec<u32> = icon
            .sizes
            .iter()
            .copied()
            .filter(|expected| *expected != info.width)
            .collect();
        if mismatched.is_empty() {
            return;
        }
        mismatched.sort_unstable();
        let expected = mismatched
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let actual = info.width.to_string();
        self.collector.add_unique(
            self.catalog
                .render(
                    MessageCode::IconSizeInvalid,
                    &[("path", path), ("expected", &expected), ("actual", &actual)],
                )
                .with_file(path),
        );
    }

    /// Validates every theme image, one future per path.
    pub async fn validate_theme_images(&self, images: &[ThemeImageRef]) {
        debug!("Validating {} theme image(s)", images.len());
        join_all(images.iter().map(|image| self.validate_theme_image(image))).await;
    }

    async fn validate_theme_image(&self, image: &ThemeImageRef) {
        let path = image.path.as_str();
        let property = image.property.as_str();
        if !self.package.exists(path) {
            self.collector.add_unique(
                self.catalog
                    .render(
                        MessageCode::ManifestThemeImageNotFound,
                        &[("property", property), ("path", path)],
                    )
                    .with_file(path),
            );
            return;
        }

        let Some(expected_mime) = extension(path).and_then(|ext| {
            THEME_IMAGE_TYPES
                .iter()
                .find(|(allowed, _)| *allowed == ext)
                .map(|(_, mime)| *mime)
        }) else {
            self.collector.add_unique(
                self.catalog
                    .render(MessageCode::ManifestThemeImageWrongExt, &[("path", path)])
                    .with_file(path),
            );
            return;
        };

        let info = match self.decode(path).await {
            Ok(info) => info,
            Err(e) => {
                warn!("Failed to decode theme image {}: {}", path, e);
                self.collector.add_unique(
                    self.catalog
                        .render(MessageCode::ManifestThemeImageCorrupted, &[("path", path)])
                        .with_file(path),
                );
                return;
            }
        };

        let args = [("path", path), ("mime", info.mime.as_str())];
        if !THEME_IMAGE_TYPES.iter().any(|(_, mime)| *mime == info.mime) {
            self.collector.add_unique(
                self.catalog
                    .render(MessageCode::ManifestThemeImageWrongMime, &args)
                    .with_file(path),
            );
        } else if info.mime != expected_mime {
            self.collector.add_unique(
                self.catalog
                    .render(MessageCode::ManifestThemeImageMimeMismatch, &args)
                    .with_file(path),
            );
        }
    }
}
