use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::RouteSource;
use crate::handler::{HandlerKind, HandlerRecord};
use crate::tree::RouteEntry;

/// One route in a manifest file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRoute {
    /// Declared route in source syntax, e.g. `/(shop)/products/[id]`
    pub path: String,
    #[serde(default = "default_kind")]
    pub kind: HandlerKind,
    pub handler: String,
}

fn default_kind() -> HandlerKind {
    HandlerKind::Page
}

/// Manifest document: `routes: [{ path, kind, handler }]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteManifest {
    #[serde(default)]
    pub routes: Vec<ManifestRoute>,
}

impl RouteManifest {
    /// Parse YAML (which also accepts JSON documents)
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not describe a manifest.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).context("Failed to parse route manifest as YAML")
    }

    /// # Errors
    ///
    /// Returns an error if the document does not describe a manifest.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse route manifest as JSON")
    }

    #[must_use]
    pub fn into_entries(self) -> Vec<RouteEntry> {
        self.routes
            .into_iter()
            .map(|r| RouteEntry::new(&r.path, HandlerRecord::new(r.kind, r.handler)))
            .collect()
    }
}

/// Routes listed in a YAML or JSON manifest file.
///
/// The format is picked from the extension: `.json` is parsed with
/// `serde_json`, anything else with `serde_yaml`.
#[derive(Debug, Clone)]
pub struct ManifestSource {
    path: PathBuf,
}

impl ManifestSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_json(&self) -> bool {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"))
    }

    /// Read and parse the manifest without converting it to entries
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn manifest(&self) -> Result<RouteManifest> {
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read route manifest {}", self.path.display()))?;
        let manifest = if self.is_json() {
            RouteManifest::from_json_str(&text)
        } else {
            RouteManifest::from_yaml_str(&text)
        };
        manifest.with_context(|| format!("Invalid route manifest {}", self.path.display()))
    }
}

impl RouteSource for ManifestSource {
    fn load(&self) -> Result<Vec<RouteEntry>> {
        Ok(self.manifest()?.into_entries())
    }

    fn describe(&self) -> String {
        format!("manifest {}", self.path.display())
    }

    fn watch_path(&self) -> Option<&Path> {
        Some(&self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_manifest() {
        let manifest = RouteManifest::from_yaml_str(
            r#"
routes:
  - path: /blog/[slug]
    kind: page
    handler: blog::show
  - path: /api/users
    kind: route
    handler: users::list
  - path: /
    handler: home
"#,
        )
        .unwrap();
        let entries = manifest.into_entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].segments, vec!["blog", "[slug]"]);
        assert_eq!(entries[1].handler.kind, HandlerKind::Api);
        assert_eq!(entries[2].handler.kind, HandlerKind::Page);
        assert!(entries[2].segments.is_empty());
    }

    #[test]
    fn test_json_manifest() {
        let manifest = RouteManifest::from_json_str(
            r#"{"routes":[{"path":"/(shop)","kind":"layout","handler":"ShopLayout"}]}"#,
        )
        .unwrap();
        let entries = manifest.into_entries();
        assert_eq!(entries[0].handler, HandlerRecord::layout("ShopLayout"));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(RouteManifest::from_yaml_str(
            "routes:\n  - path: /a\n    kind: middleware\n    handler: x\n"
        )
        .is_err());
    }
}
