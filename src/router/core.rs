//! Router core - snapshot publication and the request hot path.
//!
//! The current [`RouteTree`] lives behind an [`ArcSwap`]. Every match loads the
//! snapshot once and keeps its `Arc` inside the returned [`RouteMatch`], so a
//! rebuild that publishes a new tree mid-request never invalidates a match in
//! flight; the old tree is dropped when its last match is.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use arc_swap::ArcSwap;
use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, TryLockError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::matcher::{ParamValue, Params};
use crate::config::RouterConfig;
use crate::handler::{HandlerKind, HandlerRecord};
use crate::layout;
use crate::source::RouteSource;
use crate::tree::{BuildErrors, NodeId, RouteNode, RouteTree};

/// Result of successfully matching a request path to a route
///
/// Holds the tree snapshot it was matched against, so node ids and handler
/// records stay valid for as long as the match is alive.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    tree: Arc<RouteTree>,
    node: NodeId,
    params: Params,
}

impl RouteMatch {
    pub(crate) fn new(tree: Arc<RouteTree>, node: NodeId, params: Params) -> Self {
        Self { tree, node, params }
    }

    /// The snapshot this match was produced from
    #[must_use]
    pub fn tree(&self) -> &Arc<RouteTree> {
        &self.tree
    }

    #[must_use]
    pub fn node_id(&self) -> NodeId {
        self.node
    }

    #[must_use]
    pub fn node(&self) -> &RouteNode {
        self.tree.node(self.node)
    }

    /// Path parameters in encounter order
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Get a path parameter by name
    #[inline]
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    /// Page handler at the matched node
    #[must_use]
    pub fn page(&self) -> Option<&HandlerRecord> {
        self.node().handlers().get(HandlerKind::Page)
    }

    /// API handler at the matched node
    #[must_use]
    pub fn api(&self) -> Option<&HandlerRecord> {
        self.node().handlers().get(HandlerKind::Api)
    }

    /// The handler answering the request: the page if present, else the API handler
    #[must_use]
    pub fn handler(&self) -> Option<&HandlerRecord> {
        self.page().or_else(|| self.api())
    }

    /// Layout handlers wrapping the matched page, root-first
    #[must_use]
    pub fn layout_chain(&self) -> Vec<HandlerRecord> {
        layout::compose_layout_chain(self)
    }

    /// Nearest error boundary on the matched path
    #[must_use]
    pub fn error_boundary(&self) -> Option<&HandlerRecord> {
        layout::error_boundary(self)
    }

    /// URL pattern of the matched node, e.g. `/blog/[slug]`
    #[must_use]
    pub fn url_pattern(&self) -> String {
        self.tree.url_pattern(self.node)
    }

    /// Declared route of the matched node, groups included
    #[must_use]
    pub fn declared_route(&self) -> String {
        self.tree.declared_route(self.node)
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.tree.generation()
    }
}

/// Outcome of a match. Not-found is a normal value, not an error.
#[derive(Debug, Clone)]
pub enum MatchResult {
    Matched(RouteMatch),
    NotFound,
}

impl MatchResult {
    #[must_use]
    pub fn is_match(&self) -> bool {
        matches!(self, MatchResult::Matched(_))
    }

    #[must_use]
    pub fn as_match(&self) -> Option<&RouteMatch> {
        match self {
            MatchResult::Matched(m) => Some(m),
            MatchResult::NotFound => None,
        }
    }

    #[must_use]
    pub fn into_match(self) -> Option<RouteMatch> {
        match self {
            MatchResult::Matched(m) => Some(m),
            MatchResult::NotFound => None,
        }
    }
}

/// What a call to [`Router::rebuild`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildOutcome {
    /// A new tree was built and published
    Published { generation: u64, routes: usize },
    /// Another rebuild was running; it will run once more on this request's behalf
    Coalesced,
}

/// Why a rebuild left the previous tree in place
#[derive(Debug)]
pub enum RebuildError {
    /// The route source could not produce a listing
    Source(anyhow::Error),
    /// The listing did not compile
    Build(BuildErrors),
}

impl fmt::Display for RebuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RebuildError::Source(e) => write!(f, "route source failed: {e:#}"),
            RebuildError::Build(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RebuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RebuildError::Source(e) => Some(&**e),
            RebuildError::Build(e) => Some(e),
        }
    }
}

/// Matches request paths against the currently published route tree
pub struct Router {
    current: ArcSwap<RouteTree>,
    generation: AtomicU64,
    rebuild_lock: Mutex<()>,
    rebuild_pending: AtomicBool,
    slow_match_threshold: Duration,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("generation", &self.generation())
            .field("slow_match_threshold", &self.slow_match_threshold)
            .finish_non_exhaustive()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new(RouteTree::empty())
    }
}

impl Router {
    /// Create a router serving `tree` as generation 1
    #[must_use]
    pub fn new(tree: RouteTree) -> Self {
        Self::with_config(tree, &RouterConfig::default())
    }

    #[must_use]
    pub fn with_config(mut tree: RouteTree, config: &RouterConfig) -> Self {
        tree.set_generation(1);
        info!(
            nodes = tree.len(),
            routes = tree.route_count(),
            generation = 1,
            "Route tree published"
        );
        Self {
            current: ArcSwap::from_pointee(tree),
            generation: AtomicU64::new(1),
            rebuild_lock: Mutex::new(()),
            rebuild_pending: AtomicBool::new(false),
            slow_match_threshold: config.slow_match_threshold(),
        }
    }

    /// Load and compile `source`, then serve it
    ///
    /// # Errors
    ///
    /// Returns an error if the source fails or the listing does not compile.
    pub fn from_source(source: &dyn RouteSource, config: &RouterConfig) -> Result<Self, RebuildError> {
        let listing = source.load().map_err(RebuildError::Source)?;
        let tree = RouteTree::build(listing).map_err(RebuildError::Build)?;
        Ok(Self::with_config(tree, config))
    }

    /// The currently published snapshot
    #[must_use]
    pub fn snapshot(&self) -> Arc<RouteTree> {
        self.current.load_full()
    }

    /// Generation of the currently published snapshot
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Publish a new tree, returning its generation
    pub fn publish(&self, mut tree: RouteTree) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        tree.set_generation(generation);
        info!(
            nodes = tree.len(),
            routes = tree.route_count(),
            generation,
            "Route tree published"
        );
        self.current.store(Arc::new(tree));
        generation
    }

    /// Rebuild from `source` and publish the result.
    ///
    /// Only one rebuild runs at a time. A request that arrives while one is
    /// running returns [`RebuildOutcome::Coalesced`] and the running rebuild
    /// loads the source once more before returning. On failure the previously
    /// published tree stays in place.
    ///
    /// # Errors
    ///
    /// Returns the failure of the last rebuild pass this call ran.
    pub fn rebuild(&self, source: &dyn RouteSource) -> Result<RebuildOutcome, RebuildError> {
        self.rebuild_pending.store(true, Ordering::SeqCst);
        let mut last = Ok(RebuildOutcome::Coalesced);
        loop {
            let guard = match self.rebuild_lock.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => {
                    debug!(source = %source.describe(), "Rebuild coalesced into running rebuild");
                    return last;
                }
            };
            // A failed pass does not end the loop: a coalesced request may
            // carry the fix.
            while self.rebuild_pending.swap(false, Ordering::SeqCst) {
                last = self.rebuild_once(source);
            }
            drop(guard);
            // A request may have set the flag after the last check but before
            // the lock was released.
            if !self.rebuild_pending.load(Ordering::SeqCst) {
                return last;
            }
        }
    }

    fn rebuild_once(&self, source: &dyn RouteSource) -> Result<RebuildOutcome, RebuildError> {
        let started = Instant::now();
        let listing = source.load().map_err(|e| {
            warn!(source = %source.describe(), error = %format!("{e:#}"), "Route source failed; keeping previous tree");
            RebuildError::Source(e)
        })?;
        let tree = RouteTree::build(listing).map_err(|e| {
            warn!(
                source = %source.describe(),
                error_count = e.len(),
                "Route tree rebuild failed; keeping previous tree"
            );
            RebuildError::Build(e)
        })?;
        let routes = tree.route_count();
        let generation = self.publish(tree);
        debug!(
            source = %source.describe(),
            generation,
            duration_us = started.elapsed().as_micros(),
            "Rebuild complete"
        );
        Ok(RebuildOutcome::Published { generation, routes })
    }

    /// Match a raw request path.
    ///
    /// The path is split on `/`, empty segments are ignored (so `/a//b/` is
    /// `/a/b`) and each segment is percent-decoded. Segments that are not valid
    /// percent-encoded UTF-8 are used verbatim.
    #[must_use]
    pub fn route(&self, path: &str) -> MatchResult {
        let segments: Vec<Cow<'_, str>> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| urlencoding::decode(s).unwrap_or(Cow::Borrowed(s)))
            .collect();
        self.route_inner(path, &segments)
    }

    /// Match already-decoded path segments
    #[must_use]
    pub fn route_segments<S: AsRef<str>>(&self, segments: &[S]) -> MatchResult {
        let path = crate::segment::chain_to_string(segments);
        self.route_inner(&path, segments)
    }

    fn route_inner<S: AsRef<str>>(&self, path: &str, segments: &[S]) -> MatchResult {
        debug!(path = %path, "Route match attempt");

        let tree = self.current.load_full();
        let match_start = Instant::now();
        let result = tree.match_segments(segments);
        let match_duration = match_start.elapsed();

        let Some((node, params)) = result else {
            debug!(
                path = %path,
                generation = tree.generation(),
                duration_us = match_duration.as_micros(),
                "No route matched"
            );
            return MatchResult::NotFound;
        };

        if match_duration > self.slow_match_threshold {
            warn!(
                path = %path,
                route_pattern = %tree.declared_route(node),
                path_params = ?params,
                duration_us = match_duration.as_micros(),
                generation = tree.generation(),
                "Slow route matching detected"
            );
        } else {
            debug!(
                path = %path,
                route_pattern = %tree.declared_route(node),
                path_params = ?params,
                duration_us = match_duration.as_micros(),
                generation = tree.generation(),
                "Route matched"
            );
        }

        MatchResult::Matched(RouteMatch::new(tree, node, params))
    }
}
