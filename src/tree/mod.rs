//! # Route Tree Module
//!
//! The compiled, immutable route tree produced from a segment-chain listing.
//!
//! ## Overview
//!
//! Every discovered route is an ordered chain of raw segment names plus a
//! [`HandlerRecord`]. Chains are parsed into [`SegmentDescriptor`]s and folded
//! into a single tree by the [`RouteTreeBuilder`], which merges shared prefixes
//! and reports every structural conflict it finds in one pass.
//!
//! ## Layout
//!
//! Nodes live in an arena (`Vec<RouteNode>`) and refer to each other by
//! [`NodeId`]. The root is always `NodeId(0)`. A node's children are split by
//! kind:
//!
//! - static children keyed by literal text
//! - group children keyed by label (visited in label order)
//! - at most one dynamic, one catch-all and one optional catch-all child
//!
//! Group nodes are real tree levels (they may carry layouts and error
//! boundaries) but do not advance [`RouteNode::depth`] and never appear in URLs.
//!
//! ## Example
//!
//! ```
//! use segroute::handler::HandlerRecord;
//! use segroute::tree::{RouteEntry, RouteTree};
//!
//! let tree = RouteTree::build(vec![
//!     RouteEntry::new("/blog/[slug]", HandlerRecord::page("blog::show")),
//!     RouteEntry::new("/blog/featured", HandlerRecord::page("blog::featured")),
//! ])
//! .unwrap();
//!
//! let (node, params) = tree.match_segments(&["blog", "my-post"]).unwrap();
//! assert_eq!(tree.url_pattern(node), "/blog/[slug]");
//! assert_eq!(params.get("slug").and_then(|v| v.as_str()), Some("my-post"));
//! ```

mod builder;
mod error;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::handler::{HandlerRecord, HandlerSlots};
use crate::segment::{SegmentDescriptor, SegmentKind};

pub use builder::RouteTreeBuilder;
pub use error::{BuildError, BuildErrors};

/// Index of a node in a [`RouteTree`] arena.
///
/// Ids are only meaningful for the tree (generation) that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One entry of a segment-chain listing: the raw segment names of a route and
/// the handler that terminates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub segments: Vec<String>,
    pub handler: HandlerRecord,
}

impl RouteEntry {
    /// Build an entry from a `/`-separated route string such as `/blog/[slug]`.
    ///
    /// Empty components are dropped, so `/`, `""` and `//` all name the root.
    pub fn new(route: &str, handler: HandlerRecord) -> Self {
        Self {
            segments: route
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            handler,
        }
    }

    pub fn from_segments<S: Into<String>>(
        segments: impl IntoIterator<Item = S>,
        handler: HandlerRecord,
    ) -> Self {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
            handler,
        }
    }

    /// The chain rendered as a route string
    #[must_use]
    pub fn route(&self) -> String {
        crate::segment::chain_to_string(&self.segments)
    }
}

/// Children of a node, split by segment kind
#[derive(Debug, Clone, Default)]
pub struct Children {
    pub(crate) statics: BTreeMap<Arc<str>, NodeId>,
    pub(crate) groups: BTreeMap<Arc<str>, NodeId>,
    pub(crate) dynamic: Option<NodeId>,
    pub(crate) catch_all: Option<NodeId>,
    pub(crate) optional_catch_all: Option<NodeId>,
}

impl Children {
    #[must_use]
    pub fn static_child(&self, literal: &str) -> Option<NodeId> {
        self.statics.get(literal).copied()
    }

    pub fn statics(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.statics.values().copied()
    }

    pub fn groups(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.groups.values().copied()
    }

    #[must_use]
    pub fn dynamic(&self) -> Option<NodeId> {
        self.dynamic
    }

    #[must_use]
    pub fn catch_all(&self) -> Option<NodeId> {
        self.catch_all
    }

    #[must_use]
    pub fn optional_catch_all(&self) -> Option<NodeId> {
        self.optional_catch_all
    }

    /// All children: statics, groups, dynamic, catch-all, optional catch-all
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.statics()
            .chain(self.groups())
            .chain(self.dynamic)
            .chain(self.catch_all)
            .chain(self.optional_catch_all)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// One node of the compiled tree
#[derive(Debug, Clone)]
pub struct RouteNode {
    pub(crate) id: NodeId,
    pub(crate) parent: Option<NodeId>,
    pub(crate) segment: Option<SegmentDescriptor>,
    pub(crate) depth: usize,
    pub(crate) origin: Arc<str>,
    pub(crate) children: Children,
    pub(crate) handlers: HandlerSlots,
}

impl RouteNode {
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// The segment that leads to this node; `None` for the root
    #[must_use]
    pub fn segment(&self) -> Option<&SegmentDescriptor> {
        self.segment.as_ref()
    }

    #[must_use]
    pub fn kind(&self) -> Option<SegmentKind> {
        self.segment.as_ref().map(SegmentDescriptor::kind)
    }

    /// Distance from the root in URL levels; groups do not count
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The first chain (in sorted order) that passes through this node
    #[must_use]
    pub fn origin(&self) -> &str {
        &self.origin
    }

    #[must_use]
    pub fn children(&self) -> &Children {
        &self.children
    }

    #[must_use]
    pub fn handlers(&self) -> &HandlerSlots {
        &self.handlers
    }

    /// Whether a request can terminate here
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.handlers.is_terminal()
    }
}

/// Immutable compiled route tree.
///
/// Built once per source snapshot with [`RouteTree::build`] or
/// [`RouteTreeBuilder`] and never mutated afterwards, so it can be shared
/// across threads behind an `Arc` without locking.
#[derive(Debug, Clone)]
pub struct RouteTree {
    pub(crate) nodes: Vec<RouteNode>,
    pub(crate) generation: u64,
    pub(crate) route_count: usize,
}

impl RouteTree {
    /// Compile a segment-chain listing into a tree.
    ///
    /// # Errors
    ///
    /// Returns every build error found (parse errors, ambiguous parameter
    /// names, duplicate handlers, invariant violations) in a single
    /// [`BuildErrors`].
    pub fn build(listing: impl IntoIterator<Item = RouteEntry>) -> Result<Self, BuildErrors> {
        let mut builder = RouteTreeBuilder::new();
        for entry in listing {
            builder.insert(&entry.segments, entry.handler);
        }
        builder.finish()
    }

    /// A tree with only an empty root; matches nothing
    #[must_use]
    pub fn empty() -> Self {
        RouteTreeBuilder::new().finish_unchecked()
    }

    #[must_use]
    pub fn root(&self) -> &RouteNode {
        &self.nodes[0]
    }

    /// Look up a node. Ids from a different tree may be out of range.
    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&RouteNode> {
        self.nodes.get(id.0)
    }

    pub(crate) fn node(&self, id: NodeId) -> &RouteNode {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = &RouteNode> {
        self.nodes.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.route_count == 0
    }

    /// Number of handler records attached across all nodes
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.route_count
    }

    /// Build number assigned when the tree was published by a
    /// [`Router`](crate::router::Router); 0 for trees that were never published
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Nodes that answer requests (page or API handler), in arena order
    pub fn terminals(&self) -> impl Iterator<Item = &RouteNode> {
        self.nodes.iter().filter(|n| n.is_terminal())
    }

    /// Path from the root to `id`, root first, `id` last
    #[must_use]
    pub fn lineage(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::with_capacity(self.node(id).depth + 1);
        let mut cur = Some(id);
        while let Some(n) = cur {
            path.push(n);
            cur = self.node(n).parent;
        }
        path.reverse();
        path
    }

    /// Declared route including groups, e.g. `/(shop)/products/[id]`
    #[must_use]
    pub fn declared_route(&self, id: NodeId) -> String {
        self.render(id, |_| true)
    }

    /// URL pattern with groups removed, e.g. `/products/[id]`
    #[must_use]
    pub fn url_pattern(&self, id: NodeId) -> String {
        self.render(id, SegmentDescriptor::is_url_visible)
    }

    fn render(&self, id: NodeId, keep: impl Fn(&SegmentDescriptor) -> bool) -> String {
        let segments: Vec<String> = self
            .lineage(id)
            .into_iter()
            .filter_map(|n| self.node(n).segment.as_ref())
            .filter(|s| keep(s))
            .map(ToString::to_string)
            .collect();
        crate::segment::chain_to_string(&segments)
    }

    /// Find the node a declared route leads to, following the source syntax
    /// exactly (groups included, parameter names must agree).
    #[must_use]
    pub fn find_declared<S: AsRef<str>>(&self, segments: &[S]) -> Option<NodeId> {
        let mut cur = NodeId::ROOT;
        for raw in segments {
            let desc = crate::segment::parse_segment(raw.as_ref()).ok()?;
            let children = &self.node(cur).children;
            let next = match &desc {
                SegmentDescriptor::Static { literal } => children.static_child(literal),
                SegmentDescriptor::Group { label } => children.groups.get(label).copied(),
                SegmentDescriptor::Dynamic { .. } => children.dynamic,
                SegmentDescriptor::CatchAll { .. } => children.catch_all,
                SegmentDescriptor::OptionalCatchAll { .. } => children.optional_catch_all,
            }?;
            if self.node(next).segment.as_ref() != Some(&desc) {
                return None;
            }
            cur = next;
        }
        Some(cur)
    }

    pub(crate) fn set_generation(&mut self, generation: u64) {
        self.generation = generation;
    }
}

impl Default for RouteTree {
    fn default() -> Self {
        Self::empty()
    }
}
