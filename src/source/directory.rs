use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use super::RouteSource;
use crate::handler::{HandlerKind, HandlerRecord};
use crate::tree::RouteEntry;

/// Routes discovered from a directory tree.
///
/// Each directory is one segment level, named in segment syntax (`blog`,
/// `[slug]`, `(marketing)`, ...). Files whose stem is `page`, `route`,
/// `layout` or `error` attach a record of that kind to the directory they sit
/// in; the record's handler is the file path relative to the root, using `/`
/// separators. Other files are ignored. Entries starting with `.` or `_` are
/// skipped together with everything below them.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn is_skipped(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.') || name.starts_with('_'))
}

/// Handler kind a file name stands for, by stem
fn kind_for_file(path: &Path) -> Option<HandlerKind> {
    match path.file_stem()?.to_str()? {
        "page" => Some(HandlerKind::Page),
        "route" => Some(HandlerKind::Api),
        "layout" => Some(HandlerKind::Layout),
        "error" => Some(HandlerKind::Error),
        _ => None,
    }
}

impl RouteSource for DirectorySource {
    fn load(&self) -> Result<Vec<RouteEntry>> {
        if !self.root.is_dir() {
            return Err(anyhow!(
                "Route directory {} does not exist or is not a directory",
                self.root.display()
            ));
        }

        let mut entries = Vec::new();
        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_skipped(e));

        for entry in walker {
            let entry = entry
                .with_context(|| format!("Failed to scan route directory {}", self.root.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Some(kind) = kind_for_file(path) else {
                continue;
            };
            let relative = path.strip_prefix(&self.root).with_context(|| {
                format!("{} is outside {}", path.display(), self.root.display())
            })?;

            let mut components = Vec::new();
            for component in relative.components() {
                let name = component.as_os_str().to_str().ok_or_else(|| {
                    anyhow!("Route path {} is not valid UTF-8", relative.display())
                })?;
                components.push(name.to_string());
            }
            let handler = components.join("/");
            components.pop();

            debug!(file = %handler, kind = %kind, "Discovered route file");
            entries.push(RouteEntry::from_segments(
                components,
                HandlerRecord::new(kind, handler),
            ));
        }
        Ok(entries)
    }

    fn describe(&self) -> String {
        format!("directory {}", self.root.display())
    }

    fn watch_path(&self) -> Option<&Path> {
        Some(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_for_file() {
        assert_eq!(kind_for_file(Path::new("page.tsx")), Some(HandlerKind::Page));
        assert_eq!(kind_for_file(Path::new("route.rs")), Some(HandlerKind::Api));
        assert_eq!(kind_for_file(Path::new("layout")), Some(HandlerKind::Layout));
        assert_eq!(kind_for_file(Path::new("error.html")), Some(HandlerKind::Error));
        assert_eq!(kind_for_file(Path::new("helpers.rs")), None);
    }

    #[test]
    fn test_missing_root_is_error() {
        let source = DirectorySource::new("/definitely/not/a/route/dir");
        assert!(source.load().is_err());
    }
}
