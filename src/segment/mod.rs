//! # Segment Module
//!
//! Turns a single path segment name, as it appears in a route source (a directory
//! name, or one `/`-separated component of a manifest path), into a tagged
//! [`SegmentDescriptor`].
//!
//! ## Naming Rules
//!
//! Rules are checked in this order:
//!
//! | Syntax         | Kind                 | Parameter value          |
//! |----------------|----------------------|--------------------------|
//! | `[[...slug]]`  | `OptionalCatchAll`   | zero or more segments    |
//! | `[...slug]`    | `CatchAll`           | one or more segments     |
//! | `[id]`         | `Dynamic`            | exactly one segment      |
//! | `(marketing)`  | `Group`              | none, invisible in URLs  |
//! | anything else  | `Static`             | none, matched literally  |
//!
//! Malformed names (`[]`, `[...]`, `(` without `)`, ...) produce a
//! [`SegmentParseError`], which the tree builder reports as a fatal build error.
//!
//! ## Example
//!
//! ```
//! use segroute::segment::{parse_segment, SegmentKind};
//!
//! let seg = parse_segment("[...slug]").unwrap();
//! assert_eq!(seg.kind(), SegmentKind::CatchAll);
//! assert_eq!(seg.param_name(), Some("slug"));
//!
//! assert!(parse_segment("[]").is_err());
//! ```

mod parser;

use std::fmt;
use std::sync::Arc;

pub use parser::{parse_chain, parse_segment, SegmentParseError};

/// The kind of a route segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SegmentKind {
    /// Literal text, matched exactly
    Static,
    /// `[name]` - any single non-empty segment
    Dynamic,
    /// `[...name]` - one or more trailing segments
    CatchAll,
    /// `[[...name]]` - zero or more trailing segments
    OptionalCatchAll,
    /// `(name)` - organisational level, invisible in URLs
    Group,
}

impl SegmentKind {
    /// Whether a segment of this kind binds a path parameter
    #[must_use]
    pub fn is_param(self) -> bool {
        matches!(
            self,
            SegmentKind::Dynamic | SegmentKind::CatchAll | SegmentKind::OptionalCatchAll
        )
    }

    /// Whether the parameter value is a sequence of segments
    #[must_use]
    pub fn is_catch_all(self) -> bool {
        matches!(self, SegmentKind::CatchAll | SegmentKind::OptionalCatchAll)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SegmentKind::Static => "static",
            SegmentKind::Dynamic => "dynamic",
            SegmentKind::CatchAll => "catch-all",
            SegmentKind::OptionalCatchAll => "optional catch-all",
            SegmentKind::Group => "group",
        }
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed path-tree level.
///
/// Names are stored as `Arc<str>` because they are copied into every
/// [`Params`](crate::router::Params) produced by a match; cloning the `Arc` is a
/// refcount bump rather than a string copy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SegmentDescriptor {
    Static { literal: Arc<str> },
    Dynamic { name: Arc<str> },
    CatchAll { name: Arc<str> },
    OptionalCatchAll { name: Arc<str> },
    Group { label: Arc<str> },
}

impl SegmentDescriptor {
    #[must_use]
    pub fn kind(&self) -> SegmentKind {
        match self {
            SegmentDescriptor::Static { .. } => SegmentKind::Static,
            SegmentDescriptor::Dynamic { .. } => SegmentKind::Dynamic,
            SegmentDescriptor::CatchAll { .. } => SegmentKind::CatchAll,
            SegmentDescriptor::OptionalCatchAll { .. } => SegmentKind::OptionalCatchAll,
            SegmentDescriptor::Group { .. } => SegmentKind::Group,
        }
    }

    /// Parameter name for dynamic and catch-all segments, `None` otherwise
    #[must_use]
    pub fn param_name(&self) -> Option<&str> {
        self.param_name_arc().map(|n| n.as_ref())
    }

    pub(crate) fn param_name_arc(&self) -> Option<&Arc<str>> {
        match self {
            SegmentDescriptor::Dynamic { name }
            | SegmentDescriptor::CatchAll { name }
            | SegmentDescriptor::OptionalCatchAll { name } => Some(name),
            SegmentDescriptor::Static { .. } | SegmentDescriptor::Group { .. } => None,
        }
    }

    /// Literal text of a static segment
    #[must_use]
    pub fn literal(&self) -> Option<&str> {
        match self {
            SegmentDescriptor::Static { literal } => Some(literal),
            _ => None,
        }
    }

    /// Human label of a group segment
    #[must_use]
    pub fn group_label(&self) -> Option<&str> {
        match self {
            SegmentDescriptor::Group { label } => Some(label),
            _ => None,
        }
    }

    /// Whether this segment contributes a level to the matched URL
    #[must_use]
    pub fn is_url_visible(&self) -> bool {
        !matches!(self, SegmentDescriptor::Group { .. })
    }
}

/// Renders the segment back in its source syntax (`[id]`, `(group)`, ...)
impl fmt::Display for SegmentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentDescriptor::Static { literal } => write!(f, "{literal}"),
            SegmentDescriptor::Dynamic { name } => write!(f, "[{name}]"),
            SegmentDescriptor::CatchAll { name } => write!(f, "[...{name}]"),
            SegmentDescriptor::OptionalCatchAll { name } => write!(f, "[[...{name}]]"),
            SegmentDescriptor::Group { label } => write!(f, "({label})"),
        }
    }
}

/// Render a chain of raw segment names as a route string (`/blog/[slug]`)
#[must_use]
pub fn chain_to_string<S: AsRef<str>>(segments: &[S]) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut out = String::new();
    for seg in segments {
        out.push('/');
        out.push_str(seg.as_ref());
    }
    out
}
