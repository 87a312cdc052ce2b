//! # Hot Reload Module
//!
//! Live reloading of route sources without restarting the process.
//!
//! ## Overview
//!
//! A filesystem watcher observes the path a [`RouteSource`] reports through
//! [`RouteSource::watch_path`] and, after a short debounce, asks the
//! [`Router`] to rebuild:
//!
//! 1. **Detection** - `notify` reports a create, modify or remove event
//! 2. **Debounce** - further events within the debounce window are folded in
//! 3. **Rebuild** - [`Router::rebuild`] loads the source and compiles a new tree
//! 4. **Publish** - the new snapshot is swapped in; in-flight matches keep theirs
//! 5. **Hook** - the caller's callback sees the outcome
//!
//! ## Usage
//!
//! ```rust,no_run
//! use segroute::config::HotReloadConfig;
//! use segroute::hot_reload::watch_source;
//! use segroute::router::Router;
//! use segroute::source::{DirectorySource, RouteSource};
//! use std::sync::Arc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let source: Arc<dyn RouteSource> = Arc::new(DirectorySource::new("app"));
//! let router = Arc::new(Router::from_source(source.as_ref(), &Default::default())?);
//!
//! let _watcher = watch_source(
//!     Arc::clone(&source),
//!     Arc::clone(&router),
//!     &HotReloadConfig::default(),
//!     |result| println!("reloaded: {result:?}"),
//! )?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! If the source fails to load or the listing no longer compiles, the errors
//! are logged and the previous tree keeps serving requests. Saving a broken
//! route layout never takes routing down.

use anyhow::{Context, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::HotReloadConfig;
use crate::router::{RebuildError, RebuildOutcome, Router};
use crate::source::RouteSource;

/// Keeps a source under watch; dropping it stops reloading.
pub struct RouteWatcher {
    watcher: Option<RecommendedWatcher>,
    worker: Option<JoinHandle<()>>,
    path: PathBuf,
}

impl RouteWatcher {
    /// The path being watched
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for RouteWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteWatcher")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl Drop for RouteWatcher {
    fn drop(&mut self) {
        // Dropping the watcher closes the event channel, which ends the
        // debounce thread.
        drop(self.watcher.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!(path = %self.path.display(), "hot-reload worker panicked");
            }
        }
    }
}

/// Watch `source` and rebuild `router` whenever it changes.
///
/// `on_reload` runs on the debounce thread after every rebuild attempt with
/// its result.
///
/// # Errors
///
/// Returns an error if the source has nothing to watch or the filesystem
/// watcher cannot be started.
pub fn watch_source<F>(
    source: Arc<dyn RouteSource>,
    router: Arc<Router>,
    config: &HotReloadConfig,
    mut on_reload: F,
) -> Result<RouteWatcher>
where
    F: FnMut(&Result<RebuildOutcome, RebuildError>) + Send + 'static,
{
    let path = source
        .watch_path()
        .map(Path::to_path_buf)
        .with_context(|| format!("route source {} has no path to watch", source.describe()))?;

    // Editors often replace files instead of writing in place, so a single
    // file is watched through its parent directory.
    let (watch_target, mode, file_filter) = if path.is_dir() {
        (path.clone(), RecursiveMode::Recursive, None)
    } else {
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        let name = path.file_name().map(ToOwned::to_owned);
        (parent, RecursiveMode::NonRecursive, name)
    };

    let (tx, rx) = mpsc::channel::<()>();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if !is_relevant(&event, file_filter.as_deref()) {
                    return;
                }
                debug!(kind = ?event.kind, paths = ?event.paths, "hot-reload: change detected");
                if tx.send(()).is_err() {
                    debug!("hot-reload: worker gone, dropping event");
                }
            }
            Err(e) => warn!(error = %e, "hot-reload: watch error"),
        },
        Config::default(),
    )
    .context("failed to create filesystem watcher")?;

    watcher
        .watch(&watch_target, mode)
        .with_context(|| format!("failed to watch {}", watch_target.display()))?;

    let debounce = config.debounce();
    let describe = source.describe();
    let worker = std::thread::Builder::new()
        .name("segroute-hot-reload".to_string())
        .spawn(move || {
            // One rebuild per burst of events
            while rx.recv().is_ok() {
                loop {
                    match rx.recv_timeout(debounce) {
                        Ok(()) => continue,
                        Err(RecvTimeoutError::Timeout) => break,
                        Err(RecvTimeoutError::Disconnected) => return,
                    }
                }
                let result = router.rebuild(source.as_ref());
                match &result {
                    Ok(RebuildOutcome::Published { generation, routes }) => info!(
                        source = %describe,
                        generation,
                        routes,
                        "hot-reload: applied route updates"
                    ),
                    Ok(RebuildOutcome::Coalesced) => {
                        debug!(source = %describe, "hot-reload: rebuild coalesced");
                    }
                    Err(e) => warn!(
                        source = %describe,
                        error = %e,
                        "hot-reload: rebuild failed; previous routes remain active"
                    ),
                }
                on_reload(&result);
            }
        })
        .context("failed to spawn hot-reload thread")?;

    info!(path = %path.display(), debounce_ms = debounce.as_millis(), "hot-reload: watching route source");

    Ok(RouteWatcher {
        watcher: Some(watcher),
        worker: Some(worker),
        path,
    })
}

fn is_relevant(event: &Event, file_name: Option<&std::ffi::OsStr>) -> bool {
    if !matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    ) {
        return false;
    }
    match file_name {
        None => true,
        Some(name) => event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(name)),
    }
}
