//! Depth-first request matching over a compiled [`RouteTree`].
//!
//! Precedence at every level is static, then dynamic, then catch-all, then
//! optional catch-all. Group nodes are transparent: a node's "scope" is the node
//! itself followed by every group reachable from it through group edges only
//! (pre-order, labels ascending), and each precedence class is tried across the
//! whole scope before the next class. Descending through a literal (or a
//! parameter name) continues from every scope node that has it, so pages
//! declared under sibling groups compete at the same level.

use serde::Serialize;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::tree::{NodeId, RouteTree};

/// Maximum number of path parameters before heap allocation.
/// File-convention routes rarely nest more than a handful of dynamic levels.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated parameter storage for the match hot path.
///
/// Names are `Arc<str>` shared with the route tree; values are per-request.
pub type ParamVec = SmallVec<[(Arc<str>, ParamValue); MAX_INLINE_PARAMS]>;

/// Value bound to a path parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// A dynamic segment's single value
    One(String),
    /// A catch-all or optional catch-all's segments, possibly empty
    Many(Vec<String>),
}

impl ParamValue {
    /// The single value of a dynamic parameter
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::One(v) => Some(v),
            ParamValue::Many(_) => None,
        }
    }

    /// The segments of a catch-all parameter
    #[must_use]
    pub fn as_slice(&self) -> Option<&[String]> {
        match self {
            ParamValue::One(_) => None,
            ParamValue::Many(v) => Some(v),
        }
    }

    /// Every segment this value contributes to a URL
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            ParamValue::One(v) => std::slice::from_ref(v),
            ParamValue::Many(v) => v,
        };
        slice.iter().map(String::as_str)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::One(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::One(v)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(v: Vec<String>) -> Self {
        ParamValue::Many(v)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(v: Vec<&str>) -> Self {
        ParamValue::Many(v.into_iter().map(str::to_string).collect())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::One(v) => f.write_str(v),
            ParamValue::Many(v) => write!(f, "[{}]", v.join(", ")),
        }
    }
}

/// Ordered path parameters, one per parameter node on the matched path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params(ParamVec);

impl Params {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a parameter by name.
    ///
    /// Uses "last write wins" semantics when the same name appears at two
    /// depths (e.g. `/org/[id]/user/[id]`), returning the deeper value.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v)
    }

    pub fn push(&mut self, name: impl Into<Arc<str>>, value: impl Into<ParamValue>) {
        self.0.push((name.into(), value.into()));
    }

    /// Parameters in encounter order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_ref(), v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Convert to a `HashMap`. This allocates; prefer [`get`](Self::get).
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, ParamValue> {
        self.0
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }
}

impl Serialize for Params {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k.as_ref(), v)?;
        }
        map.end()
    }
}

type Scope = SmallVec<[NodeId; 4]>;

impl RouteTree {
    /// Resolve already-decoded path segments to a terminal node.
    ///
    /// Returns `None` when nothing matches, including when any segment is
    /// empty (a segment never matches the empty string).
    #[must_use]
    pub fn match_segments<S: AsRef<str>>(&self, segments: &[S]) -> Option<(NodeId, Params)> {
        if segments.iter().any(|s| s.as_ref().is_empty()) {
            return None;
        }
        let mut params = ParamVec::new();
        let scope = self.scope_of([NodeId::ROOT]);
        let node = self.search(&scope, segments, &mut params)?;
        Some((node, Params(params)))
    }

    /// Every node in `ids` followed by its group closure, in order
    fn scope_of(&self, ids: impl IntoIterator<Item = NodeId>) -> Scope {
        let mut scope = Scope::new();
        for id in ids {
            self.collect_scope(id, &mut scope);
        }
        scope
    }

    fn collect_scope(&self, id: NodeId, scope: &mut Scope) {
        scope.push(id);
        for group in self.node(id).children.groups() {
            self.collect_scope(group, scope);
        }
    }

    /// Match `segments` against one URL level.
    ///
    /// `scope` holds every node that sits at this level, so a literal present
    /// under several groups continues from all of them at once.
    fn search<S: AsRef<str>>(
        &self,
        scope: &[NodeId],
        segments: &[S],
        params: &mut ParamVec,
    ) -> Option<NodeId> {
        let Some((first, rest)) = segments.split_first() else {
            if let Some(&n) = scope.iter().find(|&&n| self.node(n).is_terminal()) {
                return Some(n);
            }
            return scope.iter().find_map(|&n| {
                let child = self.node(n).children.optional_catch_all?;
                self.bind_rest(child, segments, params)
            });
        };
        let first = first.as_ref();

        let statics = self.scope_of(
            scope
                .iter()
                .filter_map(|&n| self.node(n).children.static_child(first)),
        );
        if !statics.is_empty() {
            if let Some(found) = self.search(&statics, rest, params) {
                return Some(found);
            }
        }

        let dynamics: Scope = scope
            .iter()
            .filter_map(|&n| self.node(n).children.dynamic)
            .collect();
        let mut tried: SmallVec<[Arc<str>; 2]> = SmallVec::new();
        for &child in &dynamics {
            let Some(name) = self.param_name(child) else {
                continue;
            };
            if tried.contains(&name) {
                continue;
            }
            // Same-named dynamics under sibling groups share one level
            let next = self.scope_of(
                dynamics
                    .iter()
                    .copied()
                    .filter(|&d| self.param_name(d).as_ref() == Some(&name)),
            );
            params.push((Arc::clone(&name), ParamValue::One(first.to_string())));
            if let Some(found) = self.search(&next, rest, params) {
                return Some(found);
            }
            // Backtrack
            params.pop();
            tried.push(name);
        }

        for &n in scope {
            if let Some(child) = self.node(n).children.catch_all {
                if let Some(found) = self.bind_rest(child, segments, params) {
                    return Some(found);
                }
            }
        }

        scope.iter().find_map(|&n| {
            let child = self.node(n).children.optional_catch_all?;
            self.bind_rest(child, segments, params)
        })
    }

    /// Bind every remaining segment to a catch-all node if it answers requests
    fn bind_rest<S: AsRef<str>>(
        &self,
        child: NodeId,
        segments: &[S],
        params: &mut ParamVec,
    ) -> Option<NodeId> {
        if !self.node(child).is_terminal() {
            return None;
        }
        let name = self.param_name(child)?;
        let values = segments.iter().map(|s| s.as_ref().to_string()).collect();
        params.push((name, ParamValue::Many(values)));
        Some(child)
    }

    fn param_name(&self, id: NodeId) -> Option<Arc<str>> {
        self.node(id)
            .segment
            .as_ref()
            .and_then(|s| s.param_name_arc())
            .map(Arc::clone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_last_write_wins() {
        let mut params = Params::new();
        params.push("id", "org");
        params.push("id", "user");
        assert_eq!(params.get("id").and_then(ParamValue::as_str), Some("user"));
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_param_value_accessors() {
        let one = ParamValue::from("x");
        let many = ParamValue::from(vec!["a", "b"]);
        assert_eq!(one.as_str(), Some("x"));
        assert_eq!(one.as_slice(), None);
        assert_eq!(many.as_slice().map(<[String]>::len), Some(2));
        assert_eq!(many.segments().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(many.to_string(), "[a, b]");
    }

    #[test]
    fn test_params_serialize_as_object() {
        let mut params = Params::new();
        params.push("slug", vec!["a", "b"]);
        params.push("id", "7");
        let json = serde_json::to_string(&params).unwrap();
        assert_eq!(json, r#"{"slug":["a","b"],"id":"7"}"#);
    }
}
