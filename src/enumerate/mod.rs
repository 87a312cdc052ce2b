//! # Static Path Enumeration
//!
//! Ahead-of-time expansion of a parameterised route into concrete URLs. Each
//! parameter level on the way to a node (the node itself included) gets its
//! possible values from a [`ValueSource`]; the enumerator takes the Cartesian
//! product of those sets and renders one [`StaticPath`] per combination.
//!
//! ## Example
//!
//! ```
//! use segroute::config::EnumeratorConfig;
//! use segroute::enumerate::{NodeSelector, StaticPathEnumerator, ValueSources};
//! use segroute::handler::HandlerRecord;
//! use segroute::tree::{RouteEntry, RouteTree};
//!
//! let tree = RouteTree::build(vec![
//!     RouteEntry::new("/[lang]/blog/[slug]", HandlerRecord::page("post")),
//! ])
//! .unwrap();
//!
//! let mut sources = ValueSources::new();
//! sources.insert_values("lang", ["en", "de"]);
//! sources.insert_values("slug", ["hello"]);
//!
//! let enumerator = StaticPathEnumerator::new(&EnumeratorConfig::default());
//! let set = enumerator
//!     .enumerate(&tree, &NodeSelector::route("/[lang]/blog/[slug]"), &sources)
//!     .unwrap();
//! let paths: Vec<&str> = set.iter().map(|p| p.path.as_str()).collect();
//! assert_eq!(paths, vec!["/en/blog/hello", "/de/blog/hello"]);
//! ```
//!
//! ## Failure Isolation
//!
//! A source that errors, panics, times out, is cancelled or is simply missing
//! contributes zero values. The failure is recorded as an
//! [`EnumerationDiagnostic`] on the returned set; it never turns into an error.

mod enumerator;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::router::{ParamValue, Params};
use crate::segment::SegmentKind;
use crate::tree::NodeId;

pub use enumerator::StaticPathEnumerator;

/// What a value source is being asked about
#[derive(Debug, Clone)]
pub struct SourceContext {
    /// The parameter node whose values are requested
    pub node: NodeId,
    /// Declared route of that node, e.g. `/[lang]/blog/[slug]`
    pub route: String,
    /// Parameter name, e.g. `slug`
    pub param: Arc<str>,
    pub kind: SegmentKind,
    cancelled: Arc<AtomicBool>,
}

impl SourceContext {
    pub(crate) fn new(
        node: NodeId,
        route: String,
        param: Arc<str>,
        kind: SegmentKind,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        Self {
            node,
            route,
            param,
            kind,
            cancelled,
        }
    }

    /// Set once the caller stopped waiting; long-running sources should
    /// check this and return early.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Lists the possible values of one parameter.
///
/// Dynamic parameters expect [`ParamValue::One`]; catch-all and optional
/// catch-all parameters expect [`ParamValue::Many`]. Values of the wrong shape
/// are dropped with a diagnostic.
///
/// Closures implement this trait. Annotate the signature
/// (`|ctx: &SourceContext| -> anyhow::Result<Vec<ParamValue>> { ... }`) or use
/// [`ValueSources::insert_fn`], which infers it.
pub trait ValueSource: Send + Sync {
    /// # Errors
    ///
    /// Any error is reported as a diagnostic and counts as zero values.
    fn values(&self, ctx: &SourceContext) -> anyhow::Result<Vec<ParamValue>>;
}

impl<F> ValueSource for F
where
    F: Fn(&SourceContext) -> anyhow::Result<Vec<ParamValue>> + Send + Sync,
{
    fn values(&self, ctx: &SourceContext) -> anyhow::Result<Vec<ParamValue>> {
        self(ctx)
    }
}

/// Value sources keyed by parameter name, with optional per-route overrides
#[derive(Clone, Default)]
pub struct ValueSources {
    by_name: HashMap<String, Arc<dyn ValueSource>>,
    by_route: HashMap<String, Arc<dyn ValueSource>>,
}

impl fmt::Debug for ValueSources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.by_name.keys().collect();
        let mut routes: Vec<&String> = self.by_route.keys().collect();
        names.sort();
        routes.sort();
        f.debug_struct("ValueSources")
            .field("by_name", &names)
            .field("by_route", &routes)
            .finish()
    }
}

impl ValueSources {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Source for every parameter called `name`
    pub fn insert(&mut self, name: impl Into<String>, source: impl ValueSource + 'static) {
        self.by_name.insert(name.into(), Arc::new(source));
    }

    pub fn insert_fn<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(&SourceContext) -> anyhow::Result<Vec<ParamValue>> + Send + Sync + 'static,
    {
        self.insert(name, f);
    }

    /// Source for the one parameter node declared by `route` (groups included,
    /// e.g. `/(shop)/[category]`). Takes precedence over name-keyed sources.
    pub fn insert_for_route(&mut self, route: impl Into<String>, source: impl ValueSource + 'static) {
        self.by_route.insert(route.into(), Arc::new(source));
    }

    /// A fixed list of single values, for dynamic parameters
    pub fn insert_values<I, S>(&mut self, name: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values: Vec<ParamValue> = values.into_iter().map(|v| ParamValue::One(v.into())).collect();
        self.insert_fn(name, move |_: &SourceContext| Ok(values.clone()));
    }

    /// A fixed list of segment sequences, for catch-all parameters
    pub fn insert_sequences<I>(&mut self, name: impl Into<String>, sequences: I)
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let values: Vec<ParamValue> = sequences.into_iter().map(ParamValue::Many).collect();
        self.insert_fn(name, move |_: &SourceContext| Ok(values.clone()));
    }

    pub(crate) fn lookup(&self, route: &str, name: &str) -> Option<Arc<dyn ValueSource>> {
        self.by_route
            .get(route)
            .or_else(|| self.by_name.get(name))
            .map(Arc::clone)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty() && self.by_route.is_empty()
    }
}

/// Which node to enumerate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeSelector {
    Id(NodeId),
    /// Declared route in source syntax, groups included
    Route(String),
}

impl NodeSelector {
    pub fn route(route: impl Into<String>) -> Self {
        NodeSelector::Route(route.into())
    }
}

impl From<NodeId> for NodeSelector {
    fn from(id: NodeId) -> Self {
        NodeSelector::Id(id)
    }
}

impl fmt::Display for NodeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeSelector::Id(id) => write!(f, "{id}"),
            NodeSelector::Route(route) => f.write_str(route),
        }
    }
}

/// The selector does not name a node of the tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumerateError {
    UnknownNode(NodeId),
    UnknownRoute(String),
}

impl fmt::Display for EnumerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumerateError::UnknownNode(id) => write!(f, "no node {id} in this route tree"),
            EnumerateError::UnknownRoute(route) => {
                write!(f, "no route declared as '{route}' in this route tree")
            }
        }
    }
}

impl std::error::Error for EnumerateError {}

/// Why a value source contributed no values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFailure {
    /// No source registered for the parameter
    Missing,
    Error(String),
    Panicked(String),
    TimedOut(Duration),
    Cancelled,
}

impl fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFailure::Missing => f.write_str("no value source registered"),
            SourceFailure::Error(e) => write!(f, "value source failed: {e}"),
            SourceFailure::Panicked(msg) => write!(f, "value source panicked: {msg}"),
            SourceFailure::TimedOut(after) => {
                write!(f, "value source timed out after {}ms", after.as_millis())
            }
            SourceFailure::Cancelled => f.write_str("enumeration was cancelled"),
        }
    }
}

impl std::error::Error for SourceFailure {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    Source(SourceFailure),
    /// A value that cannot fill its slot (wrong shape, empty, contains `/`)
    InvalidValue { value: String, reason: &'static str },
    /// The product exceeded the configured cap; output was cut at `limit`
    Truncated { limit: usize },
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::Source(failure) => write!(f, "{failure}"),
            DiagnosticKind::InvalidValue { value, reason } => {
                write!(f, "value {value} dropped: {reason}")
            }
            DiagnosticKind::Truncated { limit } => {
                write!(f, "output truncated at {limit} paths")
            }
        }
    }
}

/// Something that went wrong while enumerating one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumerationDiagnostic {
    /// The node being enumerated
    pub node: NodeId,
    /// Parameter the problem concerns, if any
    pub param: Option<String>,
    pub kind: DiagnosticKind,
}

impl fmt::Display for EnumerationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.param {
            Some(param) => write!(f, "{} [{param}]: {}", self.node, self.kind),
            None => write!(f, "{}: {}", self.node, self.kind),
        }
    }
}

/// One concrete URL and the parameters that produce it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticPath {
    /// Percent-encoded URL path, `/` for the root
    pub path: String,
    pub params: Params,
}

/// All paths of one node, deduplicated by path, plus diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticPathSet {
    pub node: NodeId,
    /// Declared route of the node
    pub route: String,
    pub paths: Vec<StaticPath>,
    pub diagnostics: Vec<EnumerationDiagnostic>,
}

impl StaticPathSet {
    pub fn iter(&self) -> impl Iterator<Item = &StaticPath> {
        self.paths.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p.path == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_override_wins_over_name() {
        let mut sources = ValueSources::new();
        sources.insert_values("slug", ["by-name"]);
        sources.insert_for_route(
            "/blog/[slug]",
            |_: &SourceContext| -> anyhow::Result<Vec<ParamValue>> {
                Ok(vec![ParamValue::from("by-route")])
            },
        );
        let ctx = SourceContext::new(
            NodeId::ROOT,
            "/blog/[slug]".to_string(),
            Arc::from("slug"),
            SegmentKind::Dynamic,
            Arc::new(AtomicBool::new(false)),
        );
        let source = sources.lookup("/blog/[slug]", "slug").unwrap();
        assert_eq!(source.values(&ctx).unwrap(), vec![ParamValue::from("by-route")]);
        let source = sources.lookup("/news/[slug]", "slug").unwrap();
        assert_eq!(source.values(&ctx).unwrap(), vec![ParamValue::from("by-name")]);
        assert!(sources.lookup("/x/[id]", "id").is_none());
    }

    #[test]
    fn test_diagnostic_display() {
        let d = EnumerationDiagnostic {
            node: NodeId(3),
            param: Some("slug".to_string()),
            kind: DiagnosticKind::Source(SourceFailure::TimedOut(Duration::from_millis(20))),
        };
        assert_eq!(d.to_string(), "#3 [slug]: value source timed out after 20ms");
    }
}
