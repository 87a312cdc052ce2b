use super::{MatchResult, ParamValue, RebuildOutcome, Router};
use crate::handler::HandlerRecord;
use crate::source::StaticListing;
use crate::tree::{RouteEntry, RouteTree};

fn router(routes: &[&str]) -> Router {
    Router::new(
        RouteTree::build(
            routes
                .iter()
                .map(|r| RouteEntry::new(r, HandlerRecord::page(*r))),
        )
        .unwrap(),
    )
}

fn matched(router: &Router, path: &str) -> Option<(String, Vec<(String, ParamValue)>)> {
    let m = router.route(path).into_match()?;
    let params = m
        .params()
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect();
    Some((m.handler()?.handler.to_string(), params))
}

fn one(name: &str, v: &str) -> (String, ParamValue) {
    (name.to_string(), ParamValue::from(v))
}

fn many(name: &str, v: &[&str]) -> (String, ParamValue) {
    (name.to_string(), ParamValue::from(v.to_vec()))
}

#[test]
fn test_static_beats_dynamic() {
    let router = router(&["/blog/[slug]", "/blog/featured"]);
    assert_eq!(
        matched(&router, "/blog/featured"),
        Some(("/blog/featured".to_string(), vec![]))
    );
    assert_eq!(
        matched(&router, "/blog/my-post"),
        Some(("/blog/[slug]".to_string(), vec![one("slug", "my-post")]))
    );
}

#[test]
fn test_catch_all_needs_at_least_one_segment() {
    let router = router(&["/docs/[...slug]"]);
    assert_eq!(
        matched(&router, "/docs/guides/installation"),
        Some((
            "/docs/[...slug]".to_string(),
            vec![many("slug", &["guides", "installation"])]
        ))
    );
    assert!(matches!(router.route("/docs"), MatchResult::NotFound));
}

#[test]
fn test_optional_catch_all_matches_zero_segments() {
    let router = router(&["/shop/[[...slug]]"]);
    assert_eq!(
        matched(&router, "/shop"),
        Some(("/shop/[[...slug]]".to_string(), vec![many("slug", &[])]))
    );
    assert_eq!(
        matched(&router, "/shop/electronics/laptops"),
        Some((
            "/shop/[[...slug]]".to_string(),
            vec![many("slug", &["electronics", "laptops"])]
        ))
    );
}

#[test]
fn test_parent_page_beats_optional_catch_all_on_exhaustion() {
    let router = router(&["/shop", "/shop/[[...slug]]"]);
    assert_eq!(
        matched(&router, "/shop"),
        Some(("/shop".to_string(), vec![]))
    );
    assert_eq!(
        matched(&router, "/shop/a"),
        Some(("/shop/[[...slug]]".to_string(), vec![many("slug", &["a"])]))
    );
}

#[test]
fn test_groups_are_transparent() {
    let router = router(&["/(marketing)/about", "/(dashboard)/settings"]);
    assert_eq!(
        matched(&router, "/about"),
        Some(("/(marketing)/about".to_string(), vec![]))
    );
    assert_eq!(
        matched(&router, "/settings"),
        Some(("/(dashboard)/settings".to_string(), vec![]))
    );
    assert!(!router.route("/marketing/about").is_match());
    assert!(!router.route("/(marketing)/about").is_match());
}

#[test]
fn test_static_in_group_beats_dynamic_at_parent() {
    let router = router(&["/[id]", "/(site)/about"]);
    assert_eq!(
        matched(&router, "/about"),
        Some(("/(site)/about".to_string(), vec![]))
    );
    assert_eq!(
        matched(&router, "/42"),
        Some(("/[id]".to_string(), vec![one("id", "42")]))
    );
}

#[test]
fn test_literal_shared_across_groups_merges_next_level() {
    let router = router(&["/(a)/x/y", "/x/[id]"]);
    assert_eq!(
        matched(&router, "/x/y"),
        Some(("/(a)/x/y".to_string(), vec![]))
    );
    assert_eq!(
        matched(&router, "/x/7"),
        Some(("/x/[id]".to_string(), vec![one("id", "7")]))
    );
}

#[test]
fn test_same_named_dynamic_across_groups_merges_next_level() {
    let router = router(&["/[id]/[tab]", "/(admin)/[id]/edit"]);
    assert_eq!(
        matched(&router, "/7/edit"),
        Some(("/(admin)/[id]/edit".to_string(), vec![one("id", "7")]))
    );
    assert_eq!(
        matched(&router, "/7/info"),
        Some((
            "/[id]/[tab]".to_string(),
            vec![one("id", "7"), one("tab", "info")]
        ))
    );
}

#[test]
fn test_backtracks_from_failed_static_branch() {
    let router = router(&["/a/b/c", "/a/[x]/d"]);
    assert_eq!(
        matched(&router, "/a/b/d"),
        Some(("/a/[x]/d".to_string(), vec![one("x", "b")]))
    );
}

#[test]
fn test_backtracks_to_catch_all() {
    let router = router(&["/files/[name]/raw", "/files/[...path]"]);
    assert_eq!(
        matched(&router, "/files/readme/raw"),
        Some(("/files/[name]/raw".to_string(), vec![one("name", "readme")]))
    );
    assert_eq!(
        matched(&router, "/files/readme"),
        Some(("/files/[...path]".to_string(), vec![many("path", &["readme"])]))
    );
}

#[test]
fn test_dynamic_without_handler_is_not_a_match() {
    let router = router(&["/users/[id]/edit"]);
    assert!(!router.route("/users/7").is_match());
    assert!(router.route("/users/7/edit").is_match());
}

#[test]
fn test_static_matching_is_case_sensitive() {
    let router = router(&["/About"]);
    assert!(router.route("/About").is_match());
    assert!(!router.route("/about").is_match());
}

#[test]
fn test_empty_segments_are_ignored_and_segments_decoded() {
    let router = router(&["/a/b", "/tags/[tag]"]);
    assert!(router.route("//a///b/").is_match());
    assert_eq!(
        matched(&router, "/tags/rust%20lang"),
        Some(("/tags/[tag]".to_string(), vec![one("tag", "rust lang")]))
    );
    // invalid UTF-8 after decoding is kept verbatim
    assert_eq!(
        matched(&router, "/tags/%FF"),
        Some(("/tags/[tag]".to_string(), vec![one("tag", "%FF")]))
    );
}

#[test]
fn test_route_segments_takes_decoded_input() {
    let router = router(&["/tags/[tag]"]);
    let m = router.route_segments(&["tags", "a/b"]).into_match().unwrap();
    assert_eq!(m.param("tag").and_then(ParamValue::as_str), Some("a/b"));
    assert!(!router.route_segments(&["tags", ""]).is_match());
}

#[test]
fn test_root_page() {
    let router = router(&["/"]);
    assert!(router.route("/").is_match());
    assert!(router.route("").is_match());
    assert!(!router.route("/x").is_match());
}

#[test]
fn test_group_labels_never_appear_in_params_or_urls() {
    let router = router(&["/(shop)/products/[id]"]);
    let m = router.route("/products/9").into_match().unwrap();
    assert_eq!(m.params().len(), 1);
    assert_eq!(m.url_pattern(), "/products/[id]");
    assert_eq!(m.declared_route(), "/(shop)/products/[id]");
}

#[test]
fn test_match_keeps_its_snapshot_across_rebuilds() {
    let router = router(&["/old"]);
    let m = router.route("/old").into_match().unwrap();
    assert_eq!(m.generation(), 1);

    let listing = StaticListing::new(vec![RouteEntry::new("/new", HandlerRecord::page("new"))]);
    let outcome = router.rebuild(&listing).unwrap();
    assert_eq!(
        outcome,
        RebuildOutcome::Published {
            generation: 2,
            routes: 1
        }
    );

    assert!(!router.route("/old").is_match());
    assert!(router.route("/new").is_match());
    // the earlier match still reads from generation 1
    assert_eq!(m.handler().map(|h| h.handler.as_ref()), Some("/old"));
    assert_eq!(m.generation(), 1);
}

#[test]
fn test_failed_rebuild_keeps_previous_tree() {
    let router = router(&["/keep"]);
    let bad = StaticListing::new(vec![
        RouteEntry::new("/users/[id]", HandlerRecord::page("a")),
        RouteEntry::new("/users/[userId]", HandlerRecord::page("b")),
    ]);
    assert!(router.rebuild(&bad).is_err());
    assert_eq!(router.generation(), 1);
    assert!(router.route("/keep").is_match());
}

#[test]
fn test_concurrent_rebuilds_are_coalesced_or_published() {
    use std::sync::Arc;

    let router = Arc::new(router(&["/"]));
    let listing = Arc::new(StaticListing::new(vec![RouteEntry::new(
        "/x",
        HandlerRecord::page("x"),
    )]));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let router = Arc::clone(&router);
            let listing = Arc::clone(&listing);
            std::thread::spawn(move || router.rebuild(listing.as_ref()).unwrap())
        })
        .collect();
    let outcomes: Vec<RebuildOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(outcomes
        .iter()
        .any(|o| matches!(o, RebuildOutcome::Published { .. })));
    assert!(router.generation() >= 2);
    assert!(router.route("/x").is_match());
}

/// Blocks its first load until released and fails it; later loads succeed
struct GatedSource {
    loads: std::sync::atomic::AtomicUsize,
    started: std::sync::mpsc::Sender<()>,
    release: std::sync::Mutex<std::sync::mpsc::Receiver<()>>,
}

impl crate::source::RouteSource for GatedSource {
    fn load(&self) -> anyhow::Result<Vec<RouteEntry>> {
        use std::sync::atomic::Ordering;
        if self.loads.fetch_add(1, Ordering::SeqCst) == 0 {
            self.started.send(()).unwrap();
            self.release.lock().unwrap().recv().unwrap();
            anyhow::bail!("routes.yaml: half-written file");
        }
        Ok(vec![RouteEntry::new("/fixed", HandlerRecord::page("fixed"))])
    }

    fn describe(&self) -> String {
        "gated".to_string()
    }
}

#[test]
fn test_coalesced_request_survives_failed_pass() {
    use std::sync::atomic::Ordering;
    use std::sync::{mpsc, Arc, Mutex};

    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    let source = Arc::new(GatedSource {
        loads: Default::default(),
        started: started_tx,
        release: Mutex::new(release_rx),
    });
    let router = Arc::new(router(&["/old"]));

    let running = {
        let router = Arc::clone(&router);
        let source = Arc::clone(&source);
        std::thread::spawn(move || router.rebuild(source.as_ref()))
    };
    started_rx.recv().unwrap();

    // the first pass still holds the rebuild lock
    assert_eq!(
        router.rebuild(source.as_ref()).unwrap(),
        RebuildOutcome::Coalesced
    );
    release_tx.send(()).unwrap();

    let outcome = running.join().unwrap().unwrap();
    assert_eq!(
        outcome,
        RebuildOutcome::Published {
            generation: 2,
            routes: 1
        }
    );
    assert_eq!(source.loads.load(Ordering::SeqCst), 2);
    assert!(router.route("/fixed").is_match());
    assert!(!router.route("/old").is_match());
}
