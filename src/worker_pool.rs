//! # Worker Pool Module
//!
//! A fixed set of `may` coroutines sharing one job queue. The static path
//! enumerator runs value-source callbacks here so that concurrency is bounded by
//! the worker count rather than growing with the number of parameters.
//!
//! ## Features
//!
//! - **Fixed Workers**: `num_workers` coroutines, spawned once
//! - **Shared Queue**: may's unbounded MPSC channel, workers load-balance by
//!   pulling from the same receiver
//! - **Panic Isolation**: a panicking job is logged and the worker keeps going
//! - **Metrics**: queue depth, dispatch, completion and panic counts
//!
//! Dropping the pool closes the queue; workers exit after draining it.

use may::sync::mpsc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::EnumeratorConfig;

/// Unit of work executed by a worker
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Configuration for a worker pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPoolConfig {
    /// Number of worker coroutines
    pub num_workers: usize,
    /// Stack size for worker coroutines
    pub stack_size: usize,
}

impl WorkerPoolConfig {
    #[must_use]
    pub fn new(num_workers: usize, stack_size: usize) -> Self {
        Self {
            num_workers: num_workers.max(1),
            stack_size,
        }
    }
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self::from(&EnumeratorConfig::default())
    }
}

impl From<&EnumeratorConfig> for WorkerPoolConfig {
    fn from(config: &EnumeratorConfig) -> Self {
        Self::new(config.num_workers, config.stack_size)
    }
}

/// Metrics for a worker pool
#[derive(Debug, Default)]
pub struct WorkerPoolMetrics {
    /// Jobs that panicked
    pub panicked_count: AtomicU64,
    /// Current queue depth (approximate)
    pub queue_depth: AtomicUsize,
    /// Total jobs dispatched
    pub dispatched_count: AtomicU64,
    /// Total jobs completed, panicked ones included
    pub completed_count: AtomicU64,
}

impl WorkerPoolMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_panic(&self) {
        self.panicked_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatch(&self) {
        self.dispatched_count.fetch_add(1, Ordering::Relaxed);
        self.queue_depth.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completion(&self) {
        self.completed_count.fetch_add(1, Ordering::Relaxed);
        self.queue_depth.fetch_sub(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn get_panicked_count(&self) -> u64 {
        self.panicked_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn get_queue_depth(&self) -> usize {
        self.queue_depth.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn get_dispatched_count(&self) -> u64 {
        self.dispatched_count.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn get_completed_count(&self) -> u64 {
        self.completed_count.load(Ordering::Relaxed)
    }
}

/// Returned by [`WorkerPool::dispatch`] when every worker has exited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolClosed;

impl std::fmt::Display for PoolClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("worker pool is closed")
    }
}

impl std::error::Error for PoolClosed {}

/// A fixed-size pool of worker coroutines
pub struct WorkerPool {
    config: WorkerPoolConfig,
    sender: mpsc::Sender<Job>,
    metrics: Arc<WorkerPoolMetrics>,
    name: String,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl WorkerPool {
    /// Spawn `config.num_workers` coroutines pulling from a shared queue.
    ///
    /// Workers that fail to spawn are logged; the pool runs with the rest.
    #[must_use]
    pub fn new(name: impl Into<String>, config: WorkerPoolConfig) -> Self {
        let name = name.into();
        let (tx, rx) = mpsc::channel::<Job>();
        let metrics = Arc::new(WorkerPoolMetrics::new());
        let rx = Arc::new(rx);

        info!(
            pool = %name,
            num_workers = config.num_workers,
            stack_size = config.stack_size,
            "Creating worker pool"
        );

        for worker_id in 0..config.num_workers {
            let rx = Arc::clone(&rx);
            let metrics = Arc::clone(&metrics);
            let pool_name = name.clone();

            // SAFETY: jobs do not rely on thread-local storage; a coroutine may
            // resume on a different OS thread than it started on.
            #[allow(unsafe_code)]
            let spawn_result = unsafe {
                may::coroutine::Builder::new()
                    .name(format!("{name}-{worker_id}"))
                    .stack_size(config.stack_size)
                    .spawn(move || worker_loop(&pool_name, worker_id, &rx, &metrics))
            };

            if let Err(e) = spawn_result {
                error!(
                    pool = %name,
                    worker_id,
                    error = %e,
                    "Failed to spawn worker coroutine"
                );
            }
        }

        Self {
            config,
            sender: tx,
            metrics,
            name,
        }
    }

    /// Queue a job for the next free worker
    ///
    /// # Errors
    ///
    /// Returns [`PoolClosed`] if the queue is disconnected.
    pub fn dispatch(&self, job: Job) -> Result<(), PoolClosed> {
        self.metrics.record_dispatch();
        if let Err(e) = self.sender.send(job) {
            self.metrics.record_completion();
            error!(pool = %self.name, error = %e, "Worker pool channel disconnected");
            return Err(PoolClosed);
        }
        Ok(())
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<WorkerPoolMetrics> {
        &self.metrics
    }

    #[must_use]
    pub fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }
}

fn worker_loop(
    pool: &str,
    worker_id: usize,
    rx: &mpsc::Receiver<Job>,
    metrics: &WorkerPoolMetrics,
) {
    debug!(pool = %pool, worker_id, "Worker coroutine started");

    while let Ok(job) = rx.recv() {
        if let Err(panic) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(job)) {
            metrics.record_panic();
            error!(
                pool = %pool,
                worker_id,
                panic_message = %panic_message(panic.as_ref()),
                "Job panicked"
            );
        }
        metrics.record_completion();
    }

    debug!(pool = %pool, worker_id, "Worker coroutine exiting");
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_pool_config_default() {
        let config = WorkerPoolConfig::default();
        assert_eq!(config.num_workers, 4);
        assert_eq!(config.stack_size, 0x10000);
    }

    #[test]
    fn test_worker_pool_config_needs_one_worker() {
        assert_eq!(WorkerPoolConfig::new(0, 0x4000).num_workers, 1);
    }

    #[test]
    fn test_worker_pool_metrics() {
        let metrics = WorkerPoolMetrics::new();

        assert_eq!(metrics.get_panicked_count(), 0);
        assert_eq!(metrics.get_queue_depth(), 0);

        metrics.record_dispatch();
        assert_eq!(metrics.get_dispatched_count(), 1);
        assert_eq!(metrics.get_queue_depth(), 1);

        metrics.record_completion();
        assert_eq!(metrics.get_completed_count(), 1);
        assert_eq!(metrics.get_queue_depth(), 0);

        metrics.record_panic();
        assert_eq!(metrics.get_panicked_count(), 1);
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(boxed.as_ref()), "bang");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(boxed.as_ref()), "non-string panic payload");
    }
}
