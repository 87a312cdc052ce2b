use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self as std_mpsc, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use super::{
    DiagnosticKind, EnumerateError, EnumerationDiagnostic, NodeSelector, SourceContext,
    SourceFailure, StaticPath, StaticPathSet, ValueSources,
};
use crate::config::EnumeratorConfig;
use crate::router::{ParamValue, Params};
use crate::segment::{SegmentDescriptor, SegmentKind};
use crate::tree::{NodeId, RouteTree};
use crate::worker_pool::{panic_message, WorkerPool, WorkerPoolConfig};

/// How often the collector wakes to check for cancellation
const POLL_INTERVAL: Duration = Duration::from_millis(10);

type SourceOutcome = Result<anyhow::Result<Vec<ParamValue>>, String>;

/// Progress reported by a value source job
enum SourceEvent {
    Started(usize),
    Finished(usize, SourceOutcome),
}

/// One parameter level on the way to the enumerated node
struct Slot {
    node: NodeId,
    route: String,
    name: Arc<str>,
    kind: SegmentKind,
}

/// One URL level: a literal, or the value of a slot
enum Level {
    Literal(String),
    Slot(usize),
}

/// Expands parameterised routes into concrete paths.
///
/// Value sources run on a fixed worker pool owned by the enumerator; each call
/// gets the configured timeout and a cancellation flag. One enumerator can be
/// shared across threads and reused for many trees.
pub struct StaticPathEnumerator {
    pool: WorkerPool,
    timeout: Duration,
    max_paths: usize,
    cancelled: Arc<AtomicBool>,
}

impl std::fmt::Debug for StaticPathEnumerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticPathEnumerator")
            .field("pool", &self.pool)
            .field("timeout", &self.timeout)
            .field("max_paths", &self.max_paths)
            .finish_non_exhaustive()
    }
}

impl StaticPathEnumerator {
    #[must_use]
    pub fn new(config: &EnumeratorConfig) -> Self {
        Self {
            pool: WorkerPool::new("enumerator", WorkerPoolConfig::from(config)),
            timeout: config.source_timeout(),
            max_paths: config.max_paths,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Stop waiting for value sources. In-flight and later enumerations record
    /// [`SourceFailure::Cancelled`] for every source they have not heard from.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Clear a previous [`cancel`](Self::cancel)
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Enumerate every concrete path of one node.
    ///
    /// # Errors
    ///
    /// Returns [`EnumerateError`] only when `selector` names no node of `tree`.
    /// Source failures are diagnostics on the returned set.
    pub fn enumerate(
        &self,
        tree: &RouteTree,
        selector: &NodeSelector,
        sources: &ValueSources,
    ) -> Result<StaticPathSet, EnumerateError> {
        let node = resolve(tree, selector)?;
        Ok(self.enumerate_node(tree, node, sources))
    }

    /// Enumerate every node that has a page handler, in tree order
    #[must_use]
    pub fn enumerate_all(&self, tree: &RouteTree, sources: &ValueSources) -> Vec<StaticPathSet> {
        let sets: Vec<StaticPathSet> = tree
            .nodes()
            .filter(|n| n.handlers().page.is_some())
            .map(|n| self.enumerate_node(tree, n.id(), sources))
            .collect();
        info!(
            nodes = sets.len(),
            paths = sets.iter().map(StaticPathSet::len).sum::<usize>(),
            diagnostics = sets.iter().map(|s| s.diagnostics.len()).sum::<usize>(),
            "Static path enumeration complete"
        );
        sets
    }

    fn enumerate_node(&self, tree: &RouteTree, node: NodeId, sources: &ValueSources) -> StaticPathSet {
        let started = Instant::now();
        let route = tree.declared_route(node);
        let (slots, levels) = plan(tree, node);
        let mut diagnostics = Vec::new();

        let raw = self.fetch(node, &slots, sources, &mut diagnostics);
        let sets: Vec<Vec<ParamValue>> = slots
            .iter()
            .zip(raw)
            .map(|(slot, values)| {
                values
                    .into_iter()
                    .filter_map(|value| match check_value(slot.kind, &value) {
                        Ok(()) => Some(value),
                        Err(reason) => {
                            diagnostics.push(EnumerationDiagnostic {
                                node,
                                param: Some(slot.name.to_string()),
                                kind: DiagnosticKind::InvalidValue {
                                    value: value.to_string(),
                                    reason,
                                },
                            });
                            None
                        }
                    })
                    .collect()
            })
            .collect();

        let paths = self.product(node, &slots, &levels, &sets, &mut diagnostics);

        debug!(
            route = %route,
            paths = paths.len(),
            diagnostics = diagnostics.len(),
            duration_us = started.elapsed().as_micros(),
            "Enumerated static paths"
        );

        StaticPathSet {
            node,
            route,
            paths,
            diagnostics,
        }
    }

    /// Run every slot's source on the pool and wait for the replies
    fn fetch(
        &self,
        node: NodeId,
        slots: &[Slot],
        sources: &ValueSources,
        diagnostics: &mut Vec<EnumerationDiagnostic>,
    ) -> Vec<Vec<ParamValue>> {
        let mut results: Vec<Option<SourceOutcome>> = slots.iter().map(|_| None).collect();
        let mut failures: Vec<Option<SourceFailure>> = slots.iter().map(|_| None).collect();
        let call_cancelled = Arc::new(AtomicBool::new(self.is_cancelled()));
        let (tx, rx) = std_mpsc::channel::<SourceEvent>();
        let mut outstanding = 0usize;

        for (idx, slot) in slots.iter().enumerate() {
            let Some(source) = sources.lookup(&slot.route, &slot.name) else {
                failures[idx] = Some(SourceFailure::Missing);
                continue;
            };
            if call_cancelled.load(Ordering::Acquire) {
                failures[idx] = Some(SourceFailure::Cancelled);
                continue;
            }
            let ctx = SourceContext::new(
                slot.node,
                slot.route.clone(),
                Arc::clone(&slot.name),
                slot.kind,
                Arc::clone(&call_cancelled),
            );
            let reply = tx.clone();
            let job = Box::new(move || {
                if reply.send(SourceEvent::Started(idx)).is_err() {
                    return;
                }
                let outcome = catch_unwind(AssertUnwindSafe(|| source.values(&ctx)))
                    .map_err(|panic| panic_message(panic.as_ref()));
                if reply.send(SourceEvent::Finished(idx, outcome)).is_err() {
                    debug!(param = %ctx.param, "Value source finished after the enumerator stopped waiting");
                }
            });
            match self.pool.dispatch(job) {
                Ok(()) => outstanding += 1,
                Err(e) => failures[idx] = Some(SourceFailure::Error(e.to_string())),
            }
        }
        drop(tx);

        // Each source's clock starts when a worker picks it up. Jobs still
        // queued behind hung sources are bounded by one timeout per wave,
        // checked only while no source is running.
        let workers = self.pool.config().num_workers.max(1);
        let waves = u32::try_from(outstanding.div_ceil(workers)).unwrap_or(u32::MAX);
        let backstop = Instant::now() + self.timeout.saturating_mul(waves);
        let mut deadlines: Vec<Option<Instant>> = slots.iter().map(|_| None).collect();
        let mut stop: Option<SourceFailure> = None;
        while outstanding > 0 {
            if self.is_cancelled() {
                stop = Some(SourceFailure::Cancelled);
                break;
            }
            let now = Instant::now();
            if now >= backstop && deadlines.iter().all(Option::is_none) {
                stop = Some(SourceFailure::TimedOut(self.timeout));
                break;
            }
            for (idx, deadline) in deadlines.iter_mut().enumerate() {
                if deadline.is_some_and(|d| now >= d) {
                    *deadline = None;
                    failures[idx] = Some(SourceFailure::TimedOut(self.timeout));
                    outstanding -= 1;
                }
            }
            if outstanding == 0 {
                break;
            }
            let next = deadlines.iter().flatten().min().copied().unwrap_or(backstop);
            match rx.recv_timeout(next.saturating_duration_since(now).min(POLL_INTERVAL)) {
                Ok(SourceEvent::Started(idx)) => {
                    deadlines[idx] = Some(Instant::now() + self.timeout);
                }
                Ok(SourceEvent::Finished(idx, outcome)) => {
                    // A source that already timed out stays timed out
                    if deadlines[idx].take().is_some() {
                        results[idx] = Some(outcome);
                        outstanding -= 1;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    stop = Some(SourceFailure::Error("value source never replied".to_string()));
                    break;
                }
            }
        }
        // Stragglers see the flag through their context.
        call_cancelled.store(true, Ordering::Release);

        let mut sets = Vec::with_capacity(slots.len());
        for (idx, slot) in slots.iter().enumerate() {
            let failure = match results[idx].take() {
                Some(Ok(Ok(values))) => {
                    sets.push(values);
                    continue;
                }
                Some(Ok(Err(e))) => SourceFailure::Error(format!("{e:#}")),
                Some(Err(panic)) => {
                    error!(
                        node = %node,
                        param = %slot.name,
                        panic_message = %panic,
                        "Value source panicked"
                    );
                    SourceFailure::Panicked(panic)
                }
                None => match failures[idx].take() {
                    Some(failure) => failure,
                    None => stop
                        .clone()
                        .unwrap_or_else(|| SourceFailure::Error("value source never replied".to_string())),
                },
            };
            if !matches!(failure, SourceFailure::Panicked(_)) {
                warn!(
                    node = %node,
                    route = %slot.route,
                    param = %slot.name,
                    failure = %failure,
                    "Value source contributed no values"
                );
            }
            diagnostics.push(EnumerationDiagnostic {
                node,
                param: Some(slot.name.to_string()),
                kind: DiagnosticKind::Source(failure),
            });
            sets.push(Vec::new());
        }
        sets
    }

    /// Cartesian product, root-first, last slot varying fastest
    fn product(
        &self,
        node: NodeId,
        slots: &[Slot],
        levels: &[Level],
        sets: &[Vec<ParamValue>],
        diagnostics: &mut Vec<EnumerationDiagnostic>,
    ) -> Vec<StaticPath> {
        let mut paths = Vec::new();
        if sets.iter().any(Vec::is_empty) {
            return paths;
        }

        let mut seen = HashSet::new();
        let mut odometer = vec![0usize; sets.len()];
        'combinations: loop {
            let path = render(levels, sets, &odometer);
            if !seen.contains(&path) {
                if paths.len() >= self.max_paths {
                    warn!(node = %node, limit = self.max_paths, "Static path output truncated");
                    diagnostics.push(EnumerationDiagnostic {
                        node,
                        param: None,
                        kind: DiagnosticKind::Truncated {
                            limit: self.max_paths,
                        },
                    });
                    break;
                }
                let mut params = Params::new();
                for (i, slot) in slots.iter().enumerate() {
                    params.push(Arc::clone(&slot.name), sets[i][odometer[i]].clone());
                }
                seen.insert(path.clone());
                paths.push(StaticPath { path, params });
            }

            let mut k = odometer.len();
            loop {
                if k == 0 {
                    break 'combinations;
                }
                k -= 1;
                odometer[k] += 1;
                if odometer[k] < sets[k].len() {
                    break;
                }
                odometer[k] = 0;
            }
        }
        paths
    }
}

fn resolve(tree: &RouteTree, selector: &NodeSelector) -> Result<NodeId, EnumerateError> {
    match selector {
        NodeSelector::Id(id) => tree
            .get(*id)
            .map(|n| n.id())
            .ok_or(EnumerateError::UnknownNode(*id)),
        NodeSelector::Route(route) => {
            let segments: Vec<&str> = route.split('/').filter(|s| !s.is_empty()).collect();
            tree.find_declared(&segments)
                .ok_or_else(|| EnumerateError::UnknownRoute(route.clone()))
        }
    }
}

/// Parameter slots and URL levels on the path root to `node`
fn plan(tree: &RouteTree, node: NodeId) -> (Vec<Slot>, Vec<Level>) {
    let mut slots = Vec::new();
    let mut levels = Vec::new();
    for id in tree.lineage(node) {
        let Some(segment) = tree.node(id).segment() else {
            continue;
        };
        match segment {
            SegmentDescriptor::Group { .. } => {}
            SegmentDescriptor::Static { literal } => {
                levels.push(Level::Literal(urlencoding::encode(literal).into_owned()));
            }
            SegmentDescriptor::Dynamic { name }
            | SegmentDescriptor::CatchAll { name }
            | SegmentDescriptor::OptionalCatchAll { name } => {
                levels.push(Level::Slot(slots.len()));
                slots.push(Slot {
                    node: id,
                    route: tree.declared_route(id),
                    name: Arc::clone(name),
                    kind: segment.kind(),
                });
            }
        }
    }
    (slots, levels)
}

fn render(levels: &[Level], sets: &[Vec<ParamValue>], odometer: &[usize]) -> String {
    let mut path = String::new();
    for level in levels {
        match level {
            Level::Literal(literal) => {
                path.push('/');
                path.push_str(literal);
            }
            Level::Slot(i) => {
                for segment in sets[*i][odometer[*i]].segments() {
                    path.push('/');
                    path.push_str(&urlencoding::encode(segment));
                }
            }
        }
    }
    if path.is_empty() {
        path.push('/');
    }
    path
}

/// Whether `value` can fill a slot of `kind`
fn check_value(kind: SegmentKind, value: &ParamValue) -> Result<(), &'static str> {
    let segment_ok = |s: &String| !s.is_empty() && !s.contains('/');
    match (kind, value) {
        (SegmentKind::Dynamic, ParamValue::One(v)) => {
            if v.is_empty() {
                Err("empty value")
            } else if v.contains('/') {
                Err("value contains '/'")
            } else {
                Ok(())
            }
        }
        (SegmentKind::Dynamic, ParamValue::Many(_)) => Err("expected a single value"),
        (SegmentKind::CatchAll | SegmentKind::OptionalCatchAll, ParamValue::One(_)) => {
            Err("expected a sequence of segments")
        }
        (SegmentKind::CatchAll, ParamValue::Many(v)) if v.is_empty() => {
            Err("catch-all needs at least one segment")
        }
        (SegmentKind::CatchAll | SegmentKind::OptionalCatchAll, ParamValue::Many(v)) => {
            if v.iter().all(segment_ok) {
                Ok(())
            } else {
                Err("segments must be non-empty and free of '/'")
            }
        }
        (SegmentKind::Static | SegmentKind::Group, _) => Err("not a parameter"),
    }
}
