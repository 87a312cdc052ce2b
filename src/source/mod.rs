//! # Route Sources
//!
//! A route source produces the segment-chain listing a [`RouteTree`] is built
//! from. The tree itself never performs I/O; sources are the collaborators that
//! read manifests or scan directories.
//!
//! - [`StaticListing`]: entries held in memory
//! - [`ManifestSource`]: a YAML or JSON file listing routes
//! - [`DirectorySource`]: a directory tree using `page.*`, `route.*`, `layout.*`
//!   and `error.*` file conventions
//!
//! [`RouteTree`]: crate::tree::RouteTree

mod directory;
mod manifest;

use anyhow::Result;
use std::path::Path;

use crate::tree::RouteEntry;

pub use directory::DirectorySource;
pub use manifest::{ManifestRoute, ManifestSource, RouteManifest};

/// Anything that can produce a segment-chain listing
pub trait RouteSource: Send + Sync {
    /// Produce the current listing.
    ///
    /// # Errors
    ///
    /// Returns an error when the underlying data cannot be read or parsed.
    fn load(&self) -> Result<Vec<RouteEntry>>;

    /// Short human description used in logs
    fn describe(&self) -> String;

    /// File or directory to watch for changes, if the source lives on disk
    fn watch_path(&self) -> Option<&Path> {
        None
    }
}

/// In-memory listing
#[derive(Debug, Clone, Default)]
pub struct StaticListing {
    entries: Vec<RouteEntry>,
}

impl StaticListing {
    #[must_use]
    pub fn new(entries: Vec<RouteEntry>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, entry: RouteEntry) {
        self.entries.push(entry);
    }
}

impl FromIterator<RouteEntry> for StaticListing {
    fn from_iter<I: IntoIterator<Item = RouteEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl RouteSource for StaticListing {
    fn load(&self) -> Result<Vec<RouteEntry>> {
        Ok(self.entries.clone())
    }

    fn describe(&self) -> String {
        format!("static listing ({} entries)", self.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::HandlerRecord;

    #[test]
    fn test_static_listing_returns_entries_in_order() {
        let listing: StaticListing = vec![
            RouteEntry::new("/b", HandlerRecord::page("b")),
            RouteEntry::new("/a", HandlerRecord::page("a")),
        ]
        .into_iter()
        .collect();
        let loaded = listing.load().unwrap();
        assert_eq!(loaded[0].route(), "/b");
        assert_eq!(loaded[1].route(), "/a");
        assert!(listing.watch_path().is_none());
    }
}
