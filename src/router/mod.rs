//! # Router Module
//!
//! Resolves request paths against a compiled [`RouteTree`](crate::tree::RouteTree)
//! and publishes rebuilt trees to concurrent readers.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Matching decoded path segments to a terminal node with explicit precedence
//! - Extracting path parameters (single values and catch-all sequences)
//! - Holding the current tree snapshot and swapping in rebuilds atomically
//!
//! ## Matching Precedence
//!
//! At each level, with segments remaining:
//!
//! 1. static child equal to the segment
//! 2. dynamic child (binds one segment)
//! 3. catch-all child (binds every remaining segment, at least one)
//! 4. optional catch-all child (binds every remaining segment)
//!
//! With no segments remaining the node itself must carry a page or API handler,
//! otherwise an optional catch-all child with a handler matches with an empty
//! sequence. Group children are transparent and share their parent's level;
//! failed branches backtrack.
//!
//! ## Example
//!
//! ```
//! use segroute::handler::HandlerRecord;
//! use segroute::router::{MatchResult, Router};
//! use segroute::tree::{RouteEntry, RouteTree};
//!
//! let tree = RouteTree::build(vec![
//!     RouteEntry::new("/docs/[...slug]", HandlerRecord::page("docs")),
//! ])
//! .unwrap();
//! let router = Router::new(tree);
//!
//! let m = router.route("/docs/guides/installation").into_match().unwrap();
//! assert_eq!(
//!     m.param("slug").and_then(|v| v.as_slice()).map(|s| s.len()),
//!     Some(2)
//! );
//! assert!(matches!(router.route("/docs"), MatchResult::NotFound));
//! ```
//!
//! ## Performance
//!
//! Matching is a depth-first walk over an arena; cost grows with path length
//! and branching at each level, not with the total number of routes.
//! Parameters are stored inline for up to [`MAX_INLINE_PARAMS`] entries.

mod core;
mod matcher;
#[cfg(test)]
mod performance_tests;
#[cfg(test)]
mod tests;

pub use core::{MatchResult, RebuildError, RebuildOutcome, RouteMatch, Router};
pub use matcher::{ParamValue, ParamVec, Params, MAX_INLINE_PARAMS};
