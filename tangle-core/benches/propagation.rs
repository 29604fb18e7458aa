//! Performance benchmarks for change propagation
//!
//! These benchmarks measure synchronous propagation through:
//! - A long chain of synthetics
//! - A wide fan-out from one data node
//! - A deeply nested scope, where every read pays for name resolution
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tangle_core::{Definition, Graph, GraphConfig, Inputs};

fn increment(dep: String) -> Definition {
    let name = dep.clone();
    Definition::synthetic([dep], move |inputs: &Inputs| {
        inputs.value(&name).and_then(|v| v.as_i64()).unwrap_or(0) + 1
    })
}

fn chain(length: usize) -> Graph {
    let graph = Graph::with_config(GraphConfig::bare());
    let mut definitions = vec![("n0".to_string(), Definition::data(0))];
    for i in 1..=length {
        definitions.push((format!("n{i}"), increment(format!("n{}", i - 1))));
    }
    graph.define(definitions).unwrap();
    graph
}

fn fan_out(width: usize) -> Graph {
    let graph = Graph::with_config(GraphConfig::bare());
    let mut definitions = vec![("source".to_string(), Definition::data(0))];
    for i in 0..width {
        definitions.push((format!("leaf{i}"), increment("source".to_string())));
    }
    graph.define(definitions).unwrap();
    graph
}

fn nested(depth: usize) -> Graph {
    let mut inner = Definition::sub([("main", increment("root".to_string()))]);
    for level in (0..depth).rev() {
        inner = Definition::sub([("main", Definition::data(level as i64)), ("inner", inner)]);
    }

    let graph = Graph::with_config(GraphConfig::bare());
    graph
        .define([("root", Definition::data(0)), ("tree", inner)])
        .unwrap();
    graph
}

fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain");
    for length in [10, 100] {
        let graph = chain(length);
        let mut tick = 0i64;
        group.bench_with_input(BenchmarkId::from_parameter(length), &length, |b, _| {
            b.iter(|| {
                tick += 1;
                graph.set("n0", black_box(tick)).unwrap();
            });
        });
    }
    group.finish();
}

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out");
    for width in [10, 100] {
        let graph = fan_out(width);
        let mut tick = 0i64;
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, _| {
            b.iter(|| {
                tick += 1;
                graph.set("source", black_box(tick)).unwrap();
            });
        });
    }
    group.finish();
}

fn bench_nested_resolution(c: &mut Criterion) {
    let graph = nested(8);
    let mut tick = 0i64;
    c.bench_function("nested_resolution", |b| {
        b.iter(|| {
            tick += 1;
            graph.set("root", black_box(tick)).unwrap();
        });
    });
}

criterion_group!(benches, bench_chain, bench_fan_out, bench_nested_resolution);
criterion_main!(benches);
