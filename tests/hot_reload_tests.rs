#![allow(clippy::unwrap_used, clippy::expect_used)]

use segroute::config::{HotReloadConfig, RouterConfig};
use segroute::hot_reload::watch_source;
use segroute::router::{RebuildOutcome, Router};
use segroute::source::{DirectorySource, ManifestSource, RouteSource, StaticListing};
use std::sync::{Arc, Mutex};
use std::time::Duration;

mod common;
use common::polling::wait_until;
use common::temp_files::{add_file, create_app_dir, create_temp_manifest};

const MANIFEST_V1: &str = r#"
routes:
  - { path: "/foo", handler: foo_one }
"#;

const MANIFEST_V2: &str = r#"
routes:
  - { path: "/foo", handler: foo_two }
  - { path: "/bar/[id]", handler: bar }
"#;

fn fast() -> HotReloadConfig {
    HotReloadConfig { debounce_ms: 20 }
}

#[test]
fn test_watch_manifest_reload() {
    let (_dir, path) = create_temp_manifest("routes.yaml", MANIFEST_V1);
    let source: Arc<dyn RouteSource> = Arc::new(ManifestSource::new(&path));
    let router = Arc::new(Router::from_source(source.as_ref(), &RouterConfig::default()).unwrap());

    let outcomes: Arc<Mutex<Vec<RebuildOutcome>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&outcomes);
    let watcher = watch_source(Arc::clone(&source), Arc::clone(&router), &fast(), move |res| {
        if let Ok(outcome) = res {
            sink.lock().unwrap().push(*outcome);
        }
    })
    .expect("watch_source");
    assert_eq!(watcher.path(), path.as_path());

    // allow watcher thread to start
    std::thread::sleep(Duration::from_millis(100));
    std::fs::write(&path, MANIFEST_V2).unwrap();

    assert!(wait_until(Duration::from_secs(5), || router.route("/bar/7").is_match()));
    let m = router.route("/foo").into_match().unwrap();
    assert_eq!(m.handler().unwrap().handler.as_ref(), "foo_two");
    assert!(router.generation() >= 2);
    assert!(outcomes
        .lock()
        .unwrap()
        .iter()
        .any(|o| matches!(o, RebuildOutcome::Published { .. })));

    drop(watcher);
}

#[test]
fn test_watch_directory_picks_up_new_pages() {
    let app = create_app_dir(&["page.tsx"]);
    let source: Arc<dyn RouteSource> = Arc::new(DirectorySource::new(app.path()));
    let router = Arc::new(Router::from_source(source.as_ref(), &RouterConfig::default()).unwrap());
    assert!(!router.route("/blog/hello").is_match());

    let _watcher = watch_source(Arc::clone(&source), Arc::clone(&router), &fast(), |_| {}).unwrap();
    std::thread::sleep(Duration::from_millis(100));

    add_file(app.path(), "blog/[slug]/page.tsx");
    assert!(wait_until(Duration::from_secs(5), || router
        .route("/blog/hello")
        .is_match()));
}

#[test]
fn test_broken_manifest_keeps_previous_routes() {
    let (_dir, path) = create_temp_manifest("routes.yaml", MANIFEST_V1);
    let source: Arc<dyn RouteSource> = Arc::new(ManifestSource::new(&path));
    let router = Arc::new(Router::from_source(source.as_ref(), &RouterConfig::default()).unwrap());

    let failures = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&failures);
    let _watcher = watch_source(Arc::clone(&source), Arc::clone(&router), &fast(), move |res| {
        if res.is_err() {
            *sink.lock().unwrap() += 1;
        }
    })
    .unwrap();
    std::thread::sleep(Duration::from_millis(100));

    std::fs::write(
        &path,
        r#"
routes:
  - { path: "/users/[id]", handler: a }
  - { path: "/users/[userId]", handler: b }
"#,
    )
    .unwrap();

    assert!(wait_until(Duration::from_secs(5), || *failures.lock().unwrap() > 0));
    assert_eq!(router.generation(), 1);
    assert!(router.route("/foo").is_match());
}

#[test]
fn test_source_without_watch_path_is_rejected() {
    let source: Arc<dyn RouteSource> = Arc::new(StaticListing::default());
    let router = Arc::new(Router::default());
    let err = watch_source(source, router, &HotReloadConfig::default(), |_| {}).unwrap_err();
    assert!(err.to_string().contains("no path to watch"));
}
