//! # CLI Module
//!
//! Command-line tooling for inspecting a route layout without running an
//! application around it.
//!
//! ## Commands
//!
//! Every command reads routes from exactly one source: a directory of
//! file-convention routes (`--dir`) or a YAML/JSON manifest (`--manifest`).
//!
//! ### `check`
//!
//! Compile the routes and report every build error. Exits non-zero if the
//! tree does not compile:
//!
//! ```bash
//! segroute check --dir app
//! ```
//!
//! ### `routes`
//!
//! Print every node that carries a handler, with its URL pattern:
//!
//! ```bash
//! segroute routes --manifest routes.yaml --json
//! ```
//!
//! ### `match`
//!
//! Resolve a request path and show the handler, parameters, layout chain and
//! error boundary:
//!
//! ```bash
//! segroute match --dir app /docs/guides/installation
//! ```
//!
//! ### `paths`
//!
//! Enumerate static paths for a route from literal value lists. Catch-all
//! values use `/` between segments:
//!
//! ```bash
//! segroute paths --dir app '/[lang]/docs/[...slug]' \
//!     --values lang=en,de --values slug=intro,guides/install
//! ```
//!
//! ### `watch`
//!
//! Keep the routes under watch and report each rebuild:
//!
//! ```bash
//! segroute watch --dir app
//! ```
//!
//! ## Usage from Code
//!
//! ```rust,no_run
//! use clap::Parser;
//! use segroute::cli::{run, Cli};
//!
//! let cli = Cli::parse();
//! let code = run(cli, &mut std::io::stdout())?;
//! # Ok::<(), anyhow::Error>(())
//! ```

mod commands;


pub use commands::{parse_values, run, run_cli, Cli, Commands, SourceArgs};
