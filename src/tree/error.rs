use std::fmt;

use crate::handler::HandlerKind;
use crate::segment::{SegmentKind, SegmentParseError};

/// A fatal problem found while building a [`RouteTree`](super::RouteTree).
///
/// Chains and routes are rendered in source syntax (`/users/[id]`) so the
/// messages can be read against the route source directly.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuildError {
    /// A segment name in `chain` is malformed
    Parse {
        chain: String,
        error: SegmentParseError,
    },
    /// `chain` puts segments after a catch-all or optional catch-all
    CatchAllNotLast { chain: String, segment: String },
    /// Siblings of the same parameter kind under `route` use different names
    AmbiguousDynamicName {
        route: String,
        kind: SegmentKind,
        names: Vec<String>,
        chains: Vec<String>,
    },
    /// More than one handler of `kind` attached to the same node
    DuplicateHandler {
        route: String,
        kind: HandlerKind,
        chains: Vec<String>,
        handlers: Vec<String>,
    },
    /// Restricted children under `route` that would claim the same segments
    MultipleRestrictedChildren {
        route: String,
        kinds: Vec<SegmentKind>,
        children: Vec<String>,
    },
    /// Terminals in different groups that resolve to the same URL shape
    ConflictingPaths { shape: String, routes: Vec<String> },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::Parse { chain, error } => write!(f, "{chain}: {error}"),
            BuildError::CatchAllNotLast { chain, segment } => write!(
                f,
                "{chain}: catch-all segment '{segment}' must be the last segment of its route"
            ),
            BuildError::AmbiguousDynamicName {
                route,
                kind,
                names,
                chains,
            } => write!(
                f,
                "{route}: {kind} siblings use different names [{}] (declared by {})",
                names.join(", "),
                chains.join(", ")
            ),
            BuildError::DuplicateHandler {
                route,
                kind,
                chains,
                handlers,
            } => write!(
                f,
                "{route}: {kind} handler declared {} times [{}] (by {})",
                handlers.len(),
                handlers.join(", "),
                chains.join(", ")
            ),
            BuildError::MultipleRestrictedChildren {
                route,
                kinds,
                children,
            } => {
                let kinds: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
                write!(
                    f,
                    "{route}: {} children cannot be siblings [{}]",
                    kinds.join(" and "),
                    children.join(", ")
                )
            }
            BuildError::ConflictingPaths { shape, routes } => write!(
                f,
                "routes [{}] all resolve to URL shape {shape}",
                routes.join(", ")
            ),
        }
    }
}

impl std::error::Error for BuildError {}

/// Every [`BuildError`] from one build, sorted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildErrors(Vec<BuildError>);

impl BuildErrors {
    pub(crate) fn new(errors: Vec<BuildError>) -> Self {
        Self(errors)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BuildError> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[BuildError] {
        &self.0
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<BuildError> {
        self.0
    }
}

impl fmt::Display for BuildErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "route tree build failed with {} error(s)", self.0.len())?;
        for error in &self.0 {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BuildErrors {}

impl<'a> IntoIterator for &'a BuildErrors {
    type Item = &'a BuildError;
    type IntoIter = std::slice::Iter<'a, BuildError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
