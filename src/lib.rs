//! # segroute
//!
//! **segroute** compiles a file-convention route layout (directories named
//! `blog`, `[slug]`, `[...slug]`, `[[...slug]]`, `(group)`) into an immutable
//! route tree and matches request paths against it.
//!
//! ## Overview
//!
//! A route layout is a listing of segment chains, each carrying a handler
//! record (page, API handler, layout or error boundary). segroute:
//!
//! - parses every segment into a typed descriptor and rejects malformed names
//! - folds the listing into a tree, reporting every conflict in one pass
//! - matches request paths with fixed precedence and backtracking
//! - composes the layout chain wrapping a matched page
//! - enumerates the concrete URLs a parameterised route can produce
//!
//! ## Architecture
//!
//! - **[`segment`]** - Segment name parsing (`[id]`, `[...slug]`, `(group)`, ...)
//! - **[`tree`]** - Route tree arena and the order-independent builder
//! - **[`router`]** - Request matcher and snapshot publication
//! - **[`layout`]** - Layout chain and error boundary composition
//! - **[`enumerate`]** - Static path enumeration over a coroutine worker pool
//! - **[`source`]** - Route listings from memory, manifest files or directories
//! - **[`hot_reload`]** - Rebuild on filesystem changes
//! - **[`config`]** / **[`logging`]** - Runtime configuration and tracing setup
//! - **[`cli`]** - The `segroute` command-line tool
//!
//! ### Build and Match Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Source as RouteSource
//!     participant Builder as RouteTreeBuilder
//!     participant Router as Router
//!     participant Layout as layout
//!
//!     Source->>Builder: Vec<RouteEntry>
//!     Builder->>Builder: parse segments, merge prefixes
//!     Builder->>Builder: check names, handlers, URL shapes
//!     alt Conflicts found
//!         Builder-->>Source: BuildErrors (all of them)
//!     end
//!     Builder-->>Router: RouteTree (published as a snapshot)
//!
//!     Router->>Router: route("/docs/guides/install")
//!     Router->>Router: static > dynamic > catch-all > optional
//!     Router-->>Layout: RouteMatch {node, params}
//!     Layout-->>Router: [RootLayout, DocsLayout]
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use segroute::handler::HandlerRecord;
//! use segroute::router::Router;
//! use segroute::tree::{RouteEntry, RouteTree};
//!
//! let tree = RouteTree::build(vec![
//!     RouteEntry::new("/", HandlerRecord::layout("RootLayout")),
//!     RouteEntry::new("/(marketing)/about", HandlerRecord::page("About")),
//!     RouteEntry::new("/shop/[[...slug]]", HandlerRecord::page("Shop")),
//! ])
//! .unwrap();
//! let router = Router::new(tree);
//!
//! let m = router.route("/shop").into_match().unwrap();
//! assert_eq!(m.param("slug").and_then(|v| v.as_slice()), Some(&[][..]));
//!
//! let m = router.route("/about").into_match().unwrap();
//! let layouts: Vec<_> = m.layout_chain().iter().map(|l| l.handler.to_string()).collect();
//! assert_eq!(layouts, vec!["RootLayout"]);
//! ```
//!
//! ## Runtime Considerations
//!
//! Matching is synchronous and allocation-light. Value sources used for static
//! path enumeration run on `may` coroutines; worker count and stack size are
//! configured through [`config::EnumeratorConfig`] (`SEGROUTE_ENUM_WORKERS`,
//! `SEGROUTE_STACK_SIZE`).

pub mod cli;
pub mod config;
pub mod enumerate;
pub mod handler;
pub mod hot_reload;
pub mod layout;
pub mod logging;
pub mod router;
pub mod segment;
pub mod source;
pub mod tree;
pub mod worker_pool;

pub use config::RouterConfig;
pub use enumerate::{NodeSelector, StaticPathEnumerator, StaticPathSet, ValueSources};
pub use handler::{HandlerKind, HandlerRecord};
pub use layout::compose_layout_chain;
pub use router::{MatchResult, ParamValue, Params, RouteMatch, Router};
pub use segment::{parse_segment, SegmentDescriptor, SegmentKind, SegmentParseError};
pub use source::RouteSource;
pub use tree::{BuildError, BuildErrors, NodeId, RouteEntry, RouteTree};
