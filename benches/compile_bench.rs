use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use piecescript::compiler::{CompileOptions, ProcedureCache, compile};
use piecescript::graph::{BlockGraph, BlockNode, FlatGraph};

fn number(id: String, n: usize) -> BlockNode {
    BlockNode::new(id, "math_number").field("NUM", n as f64)
}

/// `hats` broadcast handlers, each a chain of `steps` motion statements.
fn build_graph(hats: usize, steps: usize) -> BlockGraph {
    let blocks = (0..hats)
        .map(|h| {
            let body = (0..steps)
                .map(|s| {
                    BlockNode::new(format!("s{}-{}", h, s), "motion_changexby")
                        .input("DX", number(format!("n{}-{}", h, s), s))
                })
                .collect();
            let hat = BlockNode::new(format!("h{}", h), "event_whenbroadcastreceived")
                .field("BROADCAST_OPTION", format!("message-{}", h));
            match BlockNode::chain(body) {
                Some(first) => hat.then(first),
                None => hat,
            }
        })
        .collect();
    BlockGraph::new(blocks)
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile/graph");
    let options = CompileOptions::default();

    for &hats in &[1, 10, 100] {
        let graph = build_graph(hats, 20);
        group.throughput(Throughput::Elements((hats * 20) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(hats), &graph, |b, graph| {
            b.iter(|| black_box(compile(graph, &options)));
        });
    }

    group.finish();
}

fn bench_cache_hit(c: &mut Criterion) {
    let options = CompileOptions::default();
    let graph = build_graph(50, 20);
    let mut cache = ProcedureCache::new();
    let _ = cache.get_or_compile(&graph, &options);

    c.bench_function("compile/cache_hit", |b| {
        b.iter(|| black_box(cache.get_or_compile(&graph, &options).is_ok()));
    });
}

fn bench_flatten(c: &mut Criterion) {
    let graph = build_graph(50, 20);
    let flat = FlatGraph::from_graph(&graph);

    c.bench_function("graph/flatten", |b| {
        b.iter(|| black_box(FlatGraph::from_graph(&graph)));
    });
    c.bench_function("graph/inflate", |b| {
        b.iter(|| black_box(flat.to_graph().is_ok()));
    });
}

criterion_group!(benches, bench_compile, bench_cache_hit, bench_flatten);
criterion_main!(benches);
