#![allow(clippy::unwrap_used, clippy::expect_used)]

use segroute::config::EnumeratorConfig;
use segroute::worker_pool::{WorkerPool, WorkerPoolConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::time::Duration;

/// Test that worker pools are created with the configured size
#[test]
fn test_worker_pool_creation() {
    let config = WorkerPoolConfig::from(&EnumeratorConfig {
        num_workers: 3,
        stack_size: 0x8000,
        ..EnumeratorConfig::default()
    });
    let pool = WorkerPool::new("test", config);
    assert_eq!(pool.config().num_workers, 3);
    assert_eq!(pool.config().stack_size, 0x8000);
    assert_eq!(pool.metrics().get_dispatched_count(), 0);
}

#[test]
fn test_all_jobs_run() {
    let pool = WorkerPool::new("all-jobs", WorkerPoolConfig::new(4, 0x10000));
    let counter = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::channel();

    for _ in 0..100 {
        let counter = Arc::clone(&counter);
        let tx = tx.clone();
        pool.dispatch(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            tx.send(()).unwrap();
        }))
        .unwrap();
    }
    for _ in 0..100 {
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }

    assert_eq!(counter.load(Ordering::SeqCst), 100);
    assert_eq!(pool.metrics().get_dispatched_count(), 100);
}

/// A panicking job is counted and the worker keeps serving
#[test]
fn test_panicking_job_does_not_kill_worker() {
    let pool = WorkerPool::new("panics", WorkerPoolConfig::new(1, 0x10000));
    pool.dispatch(Box::new(|| panic!("boom"))).unwrap();

    let (tx, rx) = mpsc::channel();
    pool.dispatch(Box::new(move || tx.send(42).unwrap())).unwrap();
    assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 42);
    assert_eq!(pool.metrics().get_panicked_count(), 1);
}
