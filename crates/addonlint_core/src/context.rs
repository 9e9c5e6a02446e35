//! Per-run validation context.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Optional engine features.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    /// Accept `background.service_worker`.
    pub background_service_worker: bool,
}

/// Read-only inputs that gate rules but are not part of the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationContext {
    /// The add-on is signed as privileged.
    pub privileged: bool,
    /// The add-on was already signed, so its id is known.
    pub already_signed: bool,
    /// The add-on is distributed outside the store.
    pub self_hosted: bool,
    pub features: FeatureFlags,
    /// Overrides the manifest's `strict_min_version`.
    pub min_version: Option<String>,
    /// Permission name to the minimum Firefox version it requires.
    pub restricted_permissions: BTreeMap<String, String>,
}

impl ValidationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    pub fn already_signed(mut self, already_signed: bool) -> Self {
        self.already_signed = already_signed;
        self
    }

    pub fn self_hosted(mut self, self_hosted: bool) -> Self {
        self.self_hosted = self_hosted;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    pub fn min_version(mut self, min_version: impl Into<String>) -> Self {
        self.min_version = Some(min_version.into());
        self
    }

    pub fn restrict_permission(
        mut self,
        permission: impl Into<String>,
        min_version: impl Into<String>,
    ) -> Self {
        self.restricted_permissions
            .insert(permission.into(), min_version.into());
        self
    }
}
