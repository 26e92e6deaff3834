use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use diagram_layout::config::LayoutConfig;
use diagram_layout::ir::{Connection, Diagram, Node, Orientation};
use diagram_layout::layout::{LayoutOptions, compute_layout};
use std::hint::black_box;

/// A chain of icons plus `extra_edges` skip connections.
fn dense_diagram(nodes: usize, extra_edges: usize) -> Diagram {
    let ids: Vec<String> = (0..nodes).map(|i| format!("n{i}")).collect();
    let mut connections = Vec::new();
    for pair in ids.windows(2) {
        connections.push(Connection::new(&pair[0], &pair[1]));
    }
    let mut count = 0usize;
    'outer: for i in 0..nodes {
        for j in (i + 2)..nodes {
            if count >= extra_edges {
                break 'outer;
            }
            connections.push(Connection::new(&ids[i], &ids[j]));
            count += 1;
        }
    }
    let nodes = ids.iter().map(|id| Node::icon(id)).collect();
    Diagram::new(nodes, connections)
}

/// `groups` containers of `per_group` icons, each feeding the next group.
fn grouped_diagram(groups: usize, per_group: usize) -> Diagram {
    let mut nodes = Vec::new();
    let mut connections = Vec::new();
    for g in 0..groups {
        let children = (0..per_group)
            .map(|c| Node::icon(&format!("g{g}-n{c}")))
            .collect();
        nodes.push(Node::group(&format!("g{g}"), children));
        if g + 1 < groups {
            for c in 0..per_group {
                connections.push(Connection::new(
                    &format!("g{g}-n{c}"),
                    &format!("g{}-n{}", g + 1, (c + 1) % per_group),
                ));
            }
        }
    }
    Diagram::new(nodes, connections)
}

fn fixture(name: &str) -> &'static str {
    match name {
        "basic_chain" => include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/basic_chain.json"
        )),
        "groups" => include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/groups.json"
        )),
        "fan_out" => include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/fan_out.json"
        )),
        "explicit" => include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/explicit.json"
        )),
        _ => panic!("unknown fixture {name}"),
    }
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for name in ["basic_chain", "groups", "fan_out", "explicit"] {
        let input = fixture(name);
        group.bench_with_input(BenchmarkId::from_parameter(name), input, |b, data| {
            b.iter(|| {
                let diagram = Diagram::from_json_str(black_box(data)).expect("parse failed");
                black_box(diagram.nodes.len());
            });
        });
    }
    group.finish();
}

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let config = LayoutConfig::default();
    for name in ["basic_chain", "groups", "fan_out", "explicit"] {
        let diagram = Diagram::from_json_str(fixture(name)).expect("parse failed");
        for orientation in [Orientation::Landscape, Orientation::Portrait] {
            let options = LayoutOptions::new(orientation).with_viewport_width(1200.0);
            group.bench_with_input(
                BenchmarkId::new(format!("{orientation:?}").to_lowercase(), name),
                &diagram,
                |b, diagram| {
                    b.iter(|| {
                        let layout = compute_layout(black_box(diagram), &options, &config);
                        black_box(layout.connections.len());
                    });
                },
            );
        }
    }
    group.finish();
}

fn bench_connection_routing(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout_connection_routing");
    let config = LayoutConfig::default();
    let options = LayoutOptions::default();
    for (nodes, extra_edges) in [(20usize, 40usize), (40, 120), (60, 240)] {
        let name = format!("dense_{nodes}_{extra_edges}");
        let diagram = dense_diagram(nodes, extra_edges);
        group.bench_with_input(BenchmarkId::from_parameter(name), &diagram, |b, diagram| {
            b.iter(|| {
                let layout = compute_layout(black_box(diagram), &options, &config);
                black_box(layout.connections.len());
            });
        });
    }
    for (groups, per_group) in [(3usize, 4usize), (6, 6)] {
        let name = format!("grouped_{groups}x{per_group}");
        let diagram = grouped_diagram(groups, per_group);
        group.bench_with_input(BenchmarkId::from_parameter(name), &diagram, |b, diagram| {
            b.iter(|| {
                let layout = compute_layout(black_box(diagram), &options, &config);
                black_box(layout.connections.len());
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_parse, bench_layout, bench_connection_routing
);
criterion_main!(benches);
