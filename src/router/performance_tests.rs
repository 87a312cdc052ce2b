// Performance-focused tests for router scalability
//
// Matching walks the tree level by level, so lookup cost should track path
// length rather than the number of routes.

use super::Router;
use crate::handler::HandlerRecord;
use crate::tree::{RouteEntry, RouteTree};
use std::time::Instant;

fn page(route: &str, handler: &str) -> RouteEntry {
    RouteEntry::new(route, HandlerRecord::page(handler))
}

#[test]
fn test_router_performance_with_many_routes() {
    let routes: Vec<RouteEntry> = (0..500)
        .map(|i| page(&format!("/api/v1/resource{i}/[id]"), &format!("handler_{i}")))
        .collect();
    let router = Router::new(RouteTree::build(routes).unwrap());

    let start = Instant::now();
    for _ in 0..1000 {
        assert!(router.route("/api/v1/resource250/123").is_match());
    }
    let duration = start.elapsed();

    // Generous bound for unoptimized test builds
    assert!(
        duration.as_millis() < 500,
        "Router performance degraded: {}ms for 1000 lookups with 500 routes",
        duration.as_millis()
    );
}

#[test]
fn test_router_route_count_matches_listing() {
    let routes: Vec<RouteEntry> = (0..100)
        .map(|i| page(&format!("/resource{i}"), &format!("handler_{i}")))
        .collect();
    let router = Router::new(RouteTree::build(routes).unwrap());

    assert_eq!(router.snapshot().route_count(), 100);
    for i in 0..100 {
        assert!(router.route(&format!("/resource{i}")).is_match());
    }
}

#[test]
fn test_router_worst_case_performance() {
    let routes = vec![
        page("/[a]/[b]/[c]/[d]/[e]/[f]/[g]/[h]/leaf", "deep"),
        page("/[a]/[b]/[c]/[d]/[e]/[f]/[g]/[h]/[...rest]", "deep_rest"),
    ];
    let router = Router::new(RouteTree::build(routes).unwrap());

    let start = Instant::now();
    for _ in 0..1000 {
        let m = router.route("/1/2/3/4/5/6/7/8/leaf").into_match().unwrap();
        assert_eq!(m.params().len(), 8);
        let m = router.route("/1/2/3/4/5/6/7/8/x/y").into_match().unwrap();
        assert_eq!(m.params().len(), 9);
    }
    let duration = start.elapsed();

    assert!(
        duration.as_millis() < 1000,
        "Deep dynamic matching too slow: {}ms for 2000 lookups",
        duration.as_millis()
    );
}

#[test]
fn test_router_common_prefix_efficiency() {
    let routes = vec![
        page("/api/v1/users", "list_users"),
        page("/api/v1/users/[id]", "get_user"),
        page("/api/v1/users/[id]/posts", "list_user_posts"),
        page("/api/v1/posts", "list_posts"),
        page("/api/v2/users", "list_users_v2"),
    ];
    let router = Router::new(RouteTree::build(routes).unwrap());

    // Shared prefixes collapse into one node per distinct segment
    let tree = router.snapshot();
    assert_eq!(tree.len(), 9);

    assert!(router.route("/api/v1/users").is_match());
    assert!(router.route("/api/v1/users/123").is_match());
    assert!(router.route("/api/v1/users/123/posts").is_match());
    assert!(router.route("/api/v1/posts").is_match());
    assert!(router.route("/api/v2/users").is_match());
    assert!(!router.route("/api/v2/posts").is_match());
}

#[test]
fn test_router_parameter_extraction_performance() {
    let routes = vec![page(
        "/org/[org]/team/[team]/project/[project]/file/[...path]",
        "file",
    )];
    let router = Router::new(RouteTree::build(routes).unwrap());

    let start = Instant::now();
    for _ in 0..1000 {
        let m = router
            .route("/org/acme/team/core/project/router/file/src/lib.rs")
            .into_match()
            .unwrap();
        assert_eq!(m.params().len(), 4);
    }
    let duration = start.elapsed();

    assert!(
        duration.as_millis() < 500,
        "Parameter extraction too slow: {}ms for 1000 lookups",
        duration.as_millis()
    );
}
