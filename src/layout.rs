//! Layout chain composition.
//!
//! Layouts wrap every page at or below the node that declares them, including
//! a page declared in the same directory. Group nodes count: a layout attached
//! to `(marketing)` wraps `/about` when `/about` lives under `(marketing)`.
//! Nothing here renders; the chain is the invocation order handed to the
//! rendering layer, outermost first.

use crate::handler::{HandlerKind, HandlerRecord};
use crate::router::RouteMatch;
use crate::tree::{NodeId, RouteTree};

/// Layout handlers on the path root to matched node, root-first.
///
/// Levels without a layout contribute nothing; a match with no layouts
/// anywhere yields an empty chain.
#[must_use]
pub fn compose_layout_chain(route_match: &RouteMatch) -> Vec<HandlerRecord> {
    layout_chain_for(route_match.tree(), route_match.node_id())
}

/// [`compose_layout_chain`] for any node of a tree
#[must_use]
pub fn layout_chain_for(tree: &RouteTree, node: NodeId) -> Vec<HandlerRecord> {
    tree.lineage(node)
        .into_iter()
        .filter_map(|id| tree.node(id).handlers().get(HandlerKind::Layout).cloned())
        .collect()
}

/// Nearest error boundary: the matched node's own, else the closest ancestor's
#[must_use]
pub fn error_boundary(route_match: &RouteMatch) -> Option<&HandlerRecord> {
    let tree = route_match.tree();
    let mut cur = Some(route_match.node_id());
    while let Some(id) = cur {
        let node = tree.node(id);
        if let Some(record) = node.handlers().get(HandlerKind::Error) {
            return Some(record);
        }
        cur = node.parent();
    }
    None
}

/// The root error handler, used to render not-found results
#[must_use]
pub fn not_found_handler(tree: &RouteTree) -> Option<&HandlerRecord> {
    tree.root().handlers().get(HandlerKind::Error)
}
