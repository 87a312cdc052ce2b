use criterion::{criterion_group, criterion_main, Criterion};
use segroute::router::Router;
use segroute::source::RouteManifest;
use segroute::tree::{RouteEntry, RouteTree};
use std::hint::black_box;

fn example_manifest() -> &'static str {
    r#"
routes:
  - { path: "/", handler: root }
  - { path: "/", kind: layout, handler: root_layout }
  - { path: "/zoo/animals", handler: list_animals }
  - { path: "/zoo/animals/[id]", handler: get_animal }
  - { path: "/zoo/animals/[id]/toys/[toyId]", handler: animal_toy }
  - { path: "/zoo/[category]/animals/[id]/habitats/[habitatId]/sections/[sectionId]", handler: habitat_section }
  - { path: "/zoo/health", kind: api, handler: health_check }
  - { path: "/(admin)/inventory/[warehouseId]/feeds/[feedId]/items/[itemId]/batches/[batchId]", handler: item_batch }
  - { path: "/(admin)", kind: layout, handler: admin_layout }
  - { path: "/docs/[...slug]", handler: docs }
  - { path: "/shop/[[...slug]]", handler: shop }
  - { path: "/complex/[a]/[b]/[c]/[d]/[e]/[f]/[g]/[h]/[i]", handler: complex_many_params }
"#
}

fn parse_manifest(yaml: &str) -> Vec<RouteEntry> {
    RouteManifest::from_yaml_str(yaml)
        .expect("failed to parse manifest")
        .into_entries()
}

fn bench_route_throughput(c: &mut Criterion) {
    let tree = RouteTree::build(parse_manifest(example_manifest())).expect("routes compile");
    let router = Router::new(tree);
    c.bench_function("route_match", |b| {
        let test_paths = [
            "/zoo/animals/123",
            "/zoo/animals/123/toys/456",
            "/zoo/cats/animals/123/habitats/88/sections/5",
            "/inventory/1/feeds/2/items/3/batches/4",
            "/docs/guides/getting-started/install",
            "/shop",
            "/complex/1/2/3/4/5/6/7/8/9",
            "/does/not/exist",
        ];
        b.iter(|| {
            for path in &test_paths {
                let res = router.route(path);
                black_box(&res);
            }
        })
    });
}

fn bench_layout_chain(c: &mut Criterion) {
    let tree = RouteTree::build(parse_manifest(example_manifest())).expect("routes compile");
    let router = Router::new(tree);
    let m = router
        .route("/inventory/1/feeds/2/items/3/batches/4")
        .into_match()
        .expect("route matches");
    c.bench_function("layout_chain", |b| b.iter(|| black_box(m.layout_chain())));
}

fn bench_tree_build(c: &mut Criterion) {
    let entries: Vec<RouteEntry> = (0..500)
        .map(|i| {
            RouteEntry::new(
                &format!("/api/v1/resource{i}/[id]"),
                segroute::HandlerRecord::page(format!("handler_{i}")),
            )
        })
        .collect();
    c.bench_function("tree_build_500", |b| {
        b.iter(|| black_box(RouteTree::build(entries.clone()).expect("routes compile")))
    });
}

criterion_group!(
    benches,
    bench_route_throughput,
    bench_layout_chain,
    bench_tree_build
);
criterion_main!(benches);
