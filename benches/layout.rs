//! Criterion benchmarks for graph layout.
//!
//! Run with:
//!   cargo bench
//!
//! Results are saved to target/criterion/

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use graphnav::graph::Graph;
use graphnav::layout::{circle_xy, graph_xy, tree_xy, TreeSpread};

/// Full binary tree with `depth` levels below the root.
fn binary_tree(depth: u32) -> Graph {
    let n = (1usize << (depth + 1)) - 1;
    Graph::new((0..n).map(|s| {
        let children = [2 * s + 1, 2 * s + 2];
        let succ = children.into_iter().filter(|&c| c < n).collect::<Vec<_>>();
        (s, succ)
    }))
    .expect("tree graph")
}

/// Ring where every state points at the next two.
fn ring(n: usize) -> Graph {
    Graph::new((0..n).map(|s| (s, vec![(s + 1) % n, (s + 2) % n]))).expect("ring graph")
}

fn bench_circle(c: &mut Criterion) {
    let mut group = c.benchmark_group("circle");

    for size in [8, 64, 512].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("graph_xy", size), size, |b, &size| {
            let graph = ring(size);
            let xy = circle_xy(size);
            b.iter(|| black_box(graph_xy(&graph, 800.0, 600.0, 0.9, &xy)));
        });
    }

    group.finish();
}

fn bench_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree");
    let spread = TreeSpread::default();

    for depth in [3u32, 6, 9].iter() {
        let graph = binary_tree(*depth);
        group.throughput(Throughput::Elements(graph.len() as u64));
        group.bench_with_input(BenchmarkId::new("tree_xy", depth), &graph, |b, graph| {
            b.iter(|| black_box(tree_xy(0, graph, &spread)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_circle, bench_tree);
criterion_main!(benches);
