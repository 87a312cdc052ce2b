//! Route tree construction and conflict detection.
//!
//! Insertion builds a draft tree in which restricted child kinds (dynamic,
//! catch-all, optional catch-all) are lists, one entry per distinct parameter
//! name. Ambiguity, duplicate handlers and the restricted-children invariant are
//! then checked over the whole draft, so the reported errors do not depend on
//! the order chains were inserted in.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::error::{BuildError, BuildErrors};
use super::{Children, NodeId, RouteNode, RouteTree};
use crate::handler::{HandlerKind, HandlerRecord, HandlerSlots};
use crate::segment::{chain_to_string, parse_chain, SegmentDescriptor, SegmentKind};

#[derive(Debug)]
struct DraftNode {
    parent: Option<usize>,
    segment: Option<SegmentDescriptor>,
    depth: usize,
    /// Smallest chain (lexicographically) that passes through this node
    origin: Arc<str>,
    statics: BTreeMap<Arc<str>, usize>,
    groups: BTreeMap<Arc<str>, usize>,
    dynamic: Vec<usize>,
    catch_all: Vec<usize>,
    optional_catch_all: Vec<usize>,
    /// Every (chain, record) attached here, per kind
    attached: BTreeMap<HandlerKind, Vec<(Arc<str>, HandlerRecord)>>,
}

impl DraftNode {
    fn new(parent: Option<usize>, segment: Option<SegmentDescriptor>, depth: usize, origin: Arc<str>) -> Self {
        Self {
            parent,
            segment,
            depth,
            origin,
            statics: BTreeMap::new(),
            groups: BTreeMap::new(),
            dynamic: Vec::new(),
            catch_all: Vec::new(),
            optional_catch_all: Vec::new(),
            attached: BTreeMap::new(),
        }
    }

    fn restricted(&self, kind: SegmentKind) -> &[usize] {
        match kind {
            SegmentKind::Dynamic => &self.dynamic,
            SegmentKind::CatchAll => &self.catch_all,
            SegmentKind::OptionalCatchAll => &self.optional_catch_all,
            SegmentKind::Static | SegmentKind::Group => &[],
        }
    }

    fn restricted_mut(&mut self, kind: SegmentKind) -> Option<&mut Vec<usize>> {
        match kind {
            SegmentKind::Dynamic => Some(&mut self.dynamic),
            SegmentKind::CatchAll => Some(&mut self.catch_all),
            SegmentKind::OptionalCatchAll => Some(&mut self.optional_catch_all),
            SegmentKind::Static | SegmentKind::Group => None,
        }
    }
}

const RESTRICTED: [SegmentKind; 3] = [
    SegmentKind::Dynamic,
    SegmentKind::CatchAll,
    SegmentKind::OptionalCatchAll,
];

/// Folds segment chains into a [`RouteTree`], collecting every conflict.
///
/// ```
/// use segroute::handler::HandlerRecord;
/// use segroute::tree::{BuildError, RouteTreeBuilder};
///
/// let mut builder = RouteTreeBuilder::new();
/// builder.insert(&["users", "[id]"], HandlerRecord::page("a"));
/// builder.insert(&["users", "[userId]"], HandlerRecord::page("b"));
///
/// let errors = builder.finish().unwrap_err();
/// assert_eq!(errors.len(), 1);
/// assert!(matches!(errors.iter().next(), Some(BuildError::AmbiguousDynamicName { .. })));
/// ```
#[derive(Debug)]
pub struct RouteTreeBuilder {
    nodes: Vec<DraftNode>,
    errors: Vec<BuildError>,
    inserted: usize,
}

impl Default for RouteTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteTreeBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![DraftNode::new(None, None, 0, Arc::from("/"))],
            errors: Vec::new(),
            inserted: 0,
        }
    }

    /// Insert one chain of raw segment names terminating in `record`.
    ///
    /// Problems are recorded and reported by [`finish`](Self::finish); a chain
    /// that fails to parse, or puts segments after a catch-all, is not inserted.
    pub fn insert<S: AsRef<str>>(&mut self, segments: &[S], record: HandlerRecord) {
        let chain: Arc<str> = Arc::from(chain_to_string(segments));
        self.inserted += 1;

        let descriptors = match parse_chain(segments) {
            Ok(d) => d,
            Err(parse_errors) => {
                for error in parse_errors {
                    self.errors.push(BuildError::Parse {
                        chain: chain.to_string(),
                        error,
                    });
                }
                return;
            }
        };

        if let Some(pos) = descriptors.iter().position(|d| d.kind().is_catch_all()) {
            if pos + 1 < descriptors.len() {
                self.errors.push(BuildError::CatchAllNotLast {
                    chain: chain.to_string(),
                    segment: descriptors[pos].to_string(),
                });
                return;
            }
        }

        let mut cur = 0;
        self.touch(cur, &chain);
        for desc in descriptors {
            cur = self.child_for(cur, desc, &chain);
            self.touch(cur, &chain);
        }

        debug!(chain = %chain, handler = %record, "Route chain inserted");
        self.nodes[cur]
            .attached
            .entry(record.kind)
            .or_default()
            .push((chain, record));
    }

    fn touch(&mut self, idx: usize, chain: &Arc<str>) {
        let node = &mut self.nodes[idx];
        if chain.as_ref() < node.origin.as_ref() {
            node.origin = Arc::clone(chain);
        }
    }

    fn push_node(&mut self, parent: usize, segment: SegmentDescriptor, chain: &Arc<str>) -> usize {
        let depth = self.nodes[parent].depth + usize::from(segment.is_url_visible());
        self.nodes.push(DraftNode::new(
            Some(parent),
            Some(segment),
            depth,
            Arc::clone(chain),
        ));
        self.nodes.len() - 1
    }

    fn child_for(&mut self, parent: usize, desc: SegmentDescriptor, chain: &Arc<str>) -> usize {
        match &desc {
            SegmentDescriptor::Static { literal } => {
                if let Some(&idx) = self.nodes[parent].statics.get(literal) {
                    return idx;
                }
                let key = Arc::clone(literal);
                let idx = self.push_node(parent, desc, chain);
                self.nodes[parent].statics.insert(key, idx);
                idx
            }
            SegmentDescriptor::Group { label } => {
                if let Some(&idx) = self.nodes[parent].groups.get(label) {
                    return idx;
                }
                let key = Arc::clone(label);
                let idx = self.push_node(parent, desc, chain);
                self.nodes[parent].groups.insert(key, idx);
                idx
            }
            SegmentDescriptor::Dynamic { .. }
            | SegmentDescriptor::CatchAll { .. }
            | SegmentDescriptor::OptionalCatchAll { .. } => {
                let kind = desc.kind();
                let existing = self.nodes[parent]
                    .restricted(kind)
                    .iter()
                    .copied()
                    .find(|&idx| self.nodes[idx].segment.as_ref() == Some(&desc));
                if let Some(idx) = existing {
                    return idx;
                }
                let idx = self.push_node(parent, desc, chain);
                if let Some(list) = self.nodes[parent].restricted_mut(kind) {
                    list.push(idx);
                }
                idx
            }
        }
    }

    /// Validate the whole draft and freeze it into an immutable [`RouteTree`].
    ///
    /// # Errors
    ///
    /// Returns all problems found, sorted, if there were any.
    pub fn finish(mut self) -> Result<RouteTree, BuildErrors> {
        self.check_ambiguous_names();
        self.check_restricted_children();
        self.check_duplicate_handlers();
        self.check_conflicting_paths();

        if !self.errors.is_empty() {
            let mut errors = std::mem::take(&mut self.errors);
            errors.sort();
            errors.dedup();
            for error in &errors {
                warn!(error = %error, "Route tree build error");
            }
            warn!(
                error_count = errors.len(),
                chains = self.inserted,
                "Route tree build failed"
            );
            return Err(BuildErrors::new(errors));
        }

        let tree = self.finish_unchecked();
        info!(
            nodes = tree.len(),
            routes = tree.route_count(),
            terminals = tree.terminals().count(),
            "Route tree built"
        );
        Ok(tree)
    }

    /// Freeze without validation; restricted lists keep their first entry.
    pub(crate) fn finish_unchecked(self) -> RouteTree {
        let mut route_count = 0;
        let nodes = self
            .nodes
            .into_iter()
            .enumerate()
            .map(|(idx, draft)| {
                let mut handlers = HandlerSlots::default();
                for (_, records) in draft.attached {
                    let first = records.into_iter().next();
                    if let Some((_, record)) = first {
                        if handlers.attach(record).is_ok() {
                            route_count += 1;
                        }
                    }
                }
                RouteNode {
                    id: NodeId(idx),
                    parent: draft.parent.map(NodeId),
                    segment: draft.segment,
                    depth: draft.depth,
                    origin: draft.origin,
                    children: Children {
                        statics: draft
                            .statics
                            .into_iter()
                            .map(|(k, v)| (k, NodeId(v)))
                            .collect(),
                        groups: draft
                            .groups
                            .into_iter()
                            .map(|(k, v)| (k, NodeId(v)))
                            .collect(),
                        dynamic: draft.dynamic.first().copied().map(NodeId),
                        catch_all: draft.catch_all.first().copied().map(NodeId),
                        optional_catch_all: draft.optional_catch_all.first().copied().map(NodeId),
                    },
                    handlers,
                }
            })
            .collect();
        RouteTree {
            nodes,
            generation: 0,
            route_count,
        }
    }

    fn declared_route(&self, idx: usize) -> String {
        let mut segments = Vec::new();
        let mut cur = Some(idx);
        while let Some(i) = cur {
            if let Some(seg) = &self.nodes[i].segment {
                segments.push(seg.to_string());
            }
            cur = self.nodes[i].parent;
        }
        segments.reverse();
        chain_to_string(&segments)
    }

    /// URL shape with groups dropped and parameter names erased
    fn url_shape(&self, idx: usize) -> String {
        self.shape(idx, false)
    }

    /// Declared shape with groups kept and parameter names erased
    fn declared_shape(&self, idx: usize) -> String {
        self.shape(idx, true)
    }

    fn shape(&self, idx: usize, keep_groups: bool) -> String {
        let mut segments = Vec::new();
        let mut cur = Some(idx);
        while let Some(i) = cur {
            if let Some(seg) = &self.nodes[i].segment {
                let rendered = match seg {
                    SegmentDescriptor::Static { literal } => Some(literal.to_string()),
                    SegmentDescriptor::Dynamic { .. } => Some("[]".to_string()),
                    SegmentDescriptor::CatchAll { .. } => Some("[...]".to_string()),
                    SegmentDescriptor::OptionalCatchAll { .. } => Some("[[...]]".to_string()),
                    SegmentDescriptor::Group { label } => keep_groups.then(|| format!("({label})")),
                };
                segments.extend(rendered);
            }
            cur = self.nodes[i].parent;
        }
        segments.reverse();
        chain_to_string(&segments)
    }

    fn check_ambiguous_names(&mut self) {
        let mut found = Vec::new();
        for (idx, node) in self.nodes.iter().enumerate() {
            for kind in RESTRICTED {
                let children = node.restricted(kind);
                if children.len() < 2 {
                    continue;
                }
                let names: BTreeSet<String> = children
                    .iter()
                    .filter_map(|&c| self.nodes[c].segment.as_ref())
                    .filter_map(|s| s.param_name().map(str::to_string))
                    .collect();
                let chains: BTreeSet<String> = children
                    .iter()
                    .map(|&c| self.nodes[c].origin.to_string())
                    .collect();
                found.push(BuildError::AmbiguousDynamicName {
                    route: self.declared_route(idx),
                    kind,
                    names: names.into_iter().collect(),
                    chains: chains.into_iter().collect(),
                });
            }
        }
        self.errors.extend(found);
    }

    /// A catch-all and an optional catch-all under one parent would both claim
    /// every remaining segment.
    fn check_restricted_children(&mut self) {
        let mut found = Vec::new();
        for (idx, node) in self.nodes.iter().enumerate() {
            if node.catch_all.is_empty() || node.optional_catch_all.is_empty() {
                continue;
            }
            let mut children: Vec<String> = node
                .catch_all
                .iter()
                .chain(&node.optional_catch_all)
                .filter_map(|&c| self.nodes[c].segment.as_ref().map(ToString::to_string))
                .collect();
            children.sort();
            found.push(BuildError::MultipleRestrictedChildren {
                route: self.declared_route(idx),
                kinds: vec![SegmentKind::CatchAll, SegmentKind::OptionalCatchAll],
                children,
            });
        }
        self.errors.extend(found);
    }

    fn check_duplicate_handlers(&mut self) {
        let mut found = Vec::new();
        for (idx, node) in self.nodes.iter().enumerate() {
            for (&kind, records) in &node.attached {
                if records.len() < 2 {
                    continue;
                }
                let mut chains: Vec<String> = records.iter().map(|(c, _)| c.to_string()).collect();
                let mut handlers: Vec<String> =
                    records.iter().map(|(_, r)| r.handler.to_string()).collect();
                chains.sort();
                handlers.sort();
                found.push(BuildError::DuplicateHandler {
                    route: self.declared_route(idx),
                    kind,
                    chains,
                    handlers,
                });
            }
        }
        self.errors.extend(found);
    }

    /// Two terminals with the same URL shape reached through different groups.
    ///
    /// Terminals that also share the declared shape differ only in parameter
    /// names, which `check_ambiguous_names` already reports.
    fn check_conflicting_paths(&mut self) {
        let mut by_shape: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (idx, node) in self.nodes.iter().enumerate() {
            let terminal = node.attached.contains_key(&HandlerKind::Page)
                || node.attached.contains_key(&HandlerKind::Api);
            if terminal {
                by_shape.entry(self.url_shape(idx)).or_default().push(idx);
            }
        }
        let mut found = Vec::new();
        for (shape, nodes) in by_shape {
            if nodes.len() < 2 {
                continue;
            }
            let declared: BTreeSet<String> = nodes.iter().map(|&n| self.declared_shape(n)).collect();
            if declared.len() < 2 {
                continue;
            }
            let mut routes: Vec<String> = nodes.iter().map(|&n| self.declared_route(n)).collect();
            routes.sort();
            found.push(BuildError::ConflictingPaths { shape, routes });
        }
        self.errors.extend(found);
    }
}
