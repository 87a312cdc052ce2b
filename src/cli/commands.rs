use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;
use std::sync::Arc;

use crate::config::RouterConfig;
use crate::enumerate::{NodeSelector, SourceContext, StaticPathEnumerator, ValueSources};
use crate::handler::HandlerKind;
use crate::hot_reload::watch_source;
use crate::router::{MatchResult, ParamValue, RebuildError, Router};
use crate::source::{DirectorySource, ManifestSource, RouteSource};
use crate::tree::RouteTree;

/// Command-line interface for segroute
///
/// Compiles file-convention route layouts and answers questions about them.
#[derive(Debug, Parser)]
#[command(name = "segroute")]
#[command(about = "File-convention route tree compiler and matcher", long_about = None)]
pub struct Cli {
    /// Router configuration file (YAML); environment overrides still apply
    #[arg(long, global = true, env = "SEGROUTE_CONFIG")]
    pub config: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Where the routes come from
#[derive(Debug, Clone, Args)]
#[group(required = true, multiple = false)]
pub struct SourceArgs {
    /// Directory of file-convention routes (page.*, route.*, layout.*, error.*)
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Route manifest file (YAML, or JSON by extension)
    #[arg(long)]
    pub manifest: Option<PathBuf>,
}

impl SourceArgs {
    fn into_source(self) -> Result<Arc<dyn RouteSource>> {
        match (self.dir, self.manifest) {
            (Some(dir), _) => Ok(Arc::new(DirectorySource::new(dir))),
            (None, Some(manifest)) => Ok(Arc::new(ManifestSource::new(manifest))),
            (None, None) => anyhow::bail!("one of --dir or --manifest is required"),
        }
    }
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Compile the routes and report every build error
    Check {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Print every node that carries a handler
    Routes {
        #[command(flatten)]
        source: SourceArgs,

        /// Emit JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Resolve a request path
    Match {
        #[command(flatten)]
        source: SourceArgs,

        /// Request path, e.g. /blog/my-post
        path: String,
    },
    /// Enumerate static paths from literal value lists
    Paths {
        #[command(flatten)]
        source: SourceArgs,

        /// Declared route to enumerate (groups included); every page when omitted
        route: Option<String>,

        /// Values for a parameter: name=a,b,c (repeatable)
        #[arg(long = "values", value_parser = parse_values)]
        values: Vec<(String, Vec<String>)>,
    },
    /// Watch the source and report each rebuild until interrupted
    Watch {
        #[command(flatten)]
        source: SourceArgs,
    },
}

/// Parse a `name=a,b,c` value list
///
/// # Errors
///
/// Returns an error message if there is no `=` or the name is empty.
pub fn parse_values(raw: &str) -> Result<(String, Vec<String>), String> {
    let (name, values) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=a,b,c but got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing parameter name in '{raw}'"));
    }
    let values = values
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    Ok((name.to_string(), values))
}

#[derive(Debug, Serialize)]
struct RouteRow {
    route: String,
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    page: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    api: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    layout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Parse the process arguments and run
///
/// # Errors
///
/// Returns an error if configuration or the route source cannot be loaded, or
/// output cannot be written.
pub fn run_cli() -> Result<ExitCode> {
    let cli = Cli::parse();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    run(cli, &mut out)
}

/// Run a parsed command, writing human output to `out`
///
/// Build errors and unmatched paths are reported through the exit code, not
/// as errors.
///
/// # Errors
///
/// Returns an error if configuration or the route source cannot be loaded, or
/// output cannot be written.
pub fn run(cli: Cli, out: &mut dyn Write) -> Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => RouterConfig::load(path)?,
        None => RouterConfig::default(),
    };
    config.apply_env();

    match cli.command {
        Commands::Check { source } => {
            let source = source.into_source()?;
            match compile(source.as_ref())? {
                Ok(tree) => {
                    writeln!(
                        out,
                        "ok: {} routes, {} nodes ({})",
                        tree.route_count(),
                        tree.len(),
                        source.describe()
                    )?;
                    Ok(ExitCode::SUCCESS)
                }
                Err(errors) => {
                    writeln!(out, "{errors}")?;
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Commands::Routes { source, json } => {
            let source = source.into_source()?;
            let tree = match compile(source.as_ref())? {
                Ok(tree) => tree,
                Err(errors) => {
                    writeln!(out, "{errors}")?;
                    return Ok(ExitCode::FAILURE);
                }
            };
            let rows = route_rows(&tree);
            if json {
                serde_json::to_writer_pretty(&mut *out, &rows)?;
                writeln!(out)?;
            } else {
                for row in &rows {
                    write_row(out, row)?;
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Match { source, path } => {
            let source = source.into_source()?;
            let router = match Router::from_source(source.as_ref(), &config) {
                Ok(router) => router,
                Err(RebuildError::Build(errors)) => {
                    writeln!(out, "{errors}")?;
                    return Ok(ExitCode::FAILURE);
                }
                Err(e) => return Err(e.into()),
            };
            let MatchResult::Matched(m) = router.route(&path) else {
                writeln!(out, "no match: {path}")?;
                return Ok(ExitCode::FAILURE);
            };
            writeln!(out, "route:    {}", m.declared_route())?;
            writeln!(out, "url:      {}", m.url_pattern())?;
            if let Some(handler) = m.handler() {
                writeln!(out, "handler:  {} ({})", handler.handler, handler.kind)?;
            }
            writeln!(out, "params:   {}", serde_json::to_string(m.params())?)?;
            let layouts: Vec<String> = m
                .layout_chain()
                .iter()
                .map(|l| l.handler.to_string())
                .collect();
            writeln!(out, "layouts:  [{}]", layouts.join(", "))?;
            if let Some(boundary) = m.error_boundary() {
                writeln!(out, "error:    {}", boundary.handler)?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Paths {
            source,
            route,
            values,
        } => {
            let source = source.into_source()?;
            let tree = match compile(source.as_ref())? {
                Ok(tree) => tree,
                Err(errors) => {
                    writeln!(out, "{errors}")?;
                    return Ok(ExitCode::FAILURE);
                }
            };
            let sources = literal_sources(values);
            let enumerator = StaticPathEnumerator::new(&config.enumerator);
            let sets = match route {
                Some(route) => {
                    vec![enumerator.enumerate(&tree, &NodeSelector::route(route), &sources)?]
                }
                None => enumerator.enumerate_all(&tree, &sources),
            };
            for set in &sets {
                for path in set.iter() {
                    writeln!(out, "{}", path.path)?;
                }
                for diagnostic in &set.diagnostics {
                    writeln!(out, "warning: {} {diagnostic}", set.route)?;
                }
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Watch { source } => {
            let source = source.into_source()?;
            let router = Arc::new(
                Router::from_source(source.as_ref(), &config)
                    .with_context(|| format!("initial build of {} failed", source.describe()))?,
            );
            writeln!(
                out,
                "watching {} ({} routes)",
                source.describe(),
                router.snapshot().route_count()
            )?;
            let (tx, rx) = mpsc::channel();
            let _watcher = watch_source(
                Arc::clone(&source),
                Arc::clone(&router),
                &config.hot_reload,
                move |result| {
                    let line = match result {
                        Ok(outcome) => format!("rebuilt: {outcome:?}"),
                        Err(e) => format!("rebuild failed: {e}"),
                    };
                    if tx.send(line).is_err() {
                        tracing::debug!("watch output closed");
                    }
                },
            )?;
            for line in rx {
                writeln!(out, "{line}")?;
                out.flush()?;
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn compile(source: &dyn RouteSource) -> Result<Result<RouteTree, crate::tree::BuildErrors>> {
    let listing = source
        .load()
        .with_context(|| format!("failed to load {}", source.describe()))?;
    Ok(RouteTree::build(listing))
}

fn route_rows(tree: &RouteTree) -> Vec<RouteRow> {
    let handler = |node: &crate::tree::RouteNode, kind: HandlerKind| {
        node.handlers().get(kind).map(|h| h.handler.to_string())
    };
    let mut rows: Vec<RouteRow> = tree
        .nodes()
        .filter(|n| !n.handlers().is_empty())
        .map(|n| RouteRow {
            route: tree.declared_route(n.id()),
            url: tree.url_pattern(n.id()),
            page: handler(n, HandlerKind::Page),
            api: handler(n, HandlerKind::Api),
            layout: handler(n, HandlerKind::Layout),
            error: handler(n, HandlerKind::Error),
        })
        .collect();
    rows.sort_by(|a, b| a.route.cmp(&b.route));
    rows
}

fn write_row(out: &mut dyn Write, row: &RouteRow) -> std::io::Result<()> {
    let mut kinds = Vec::new();
    for (kind, value) in [
        ("page", &row.page),
        ("api", &row.api),
        ("layout", &row.layout),
        ("error", &row.error),
    ] {
        if let Some(v) = value {
            kinds.push(format!("{kind}={v}"));
        }
    }
    writeln!(out, "{:<40} {:<32} {}", row.route, row.url, kinds.join(" "))
}

/// Value sources from `--values` lists; catch-all values split on `/`
fn literal_sources(values: Vec<(String, Vec<String>)>) -> ValueSources {
    let mut sources = ValueSources::new();
    for (name, list) in values {
        sources.insert_fn(name, move |ctx: &SourceContext| {
            Ok(list
                .iter()
                .map(|v| {
                    if ctx.kind.is_catch_all() {
                        ParamValue::Many(
                            v.split('/')
                                .filter(|s| !s.is_empty())
                                .map(str::to_string)
                                .collect(),
                        )
                    } else {
                        ParamValue::One(v.clone())
                    }
                })
                .collect())
        });
    }
    sources
}
