//! Benchmarks for HyPeerWeb topology
//!
//! Measures performance of:
//! - Insertion (planning and applying one node)
//! - Point-to-point routing
//! - Full broadcast

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hypeerweb_topology::{HyPeerWeb, Node, WebId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn web_of(size: usize, rng: &mut StdRng) -> HyPeerWeb {
    let mut web = HyPeerWeb::new();
    for _ in 0..size {
        web.insert(rng).expect("insert");
    }
    web
}

/// Cost of one insertion at different populations
fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for &size in &[8usize, 100, 1000, 10_000] {
        let mut rng = StdRng::seed_from_u64(1);
        let web = web_of(size, &mut rng);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(size), &web, |b, web| {
            b.iter_batched(
                || web.clone(),
                |mut web| web.insert(&mut rng).expect("insert"),
                criterion::BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

/// Routing between random pairs
fn bench_route(c: &mut Criterion) {
    let mut group = c.benchmark_group("route");

    for &size in &[100usize, 1000, 10_000] {
        let mut rng = StdRng::seed_from_u64(2);
        let web = web_of(size, &mut rng);
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(size), &web, |b, web| {
            b.iter(|| {
                let from = WebId(rng.gen_range(0..size as u64));
                let to = WebId(rng.gen_range(0..size as u64));
                web.route(black_box(from), black_box(to)).expect("route")
            })
        });
    }
    group.finish();
}

/// Visiting every node once
fn bench_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadcast");

    for &size in &[100usize, 1000, 10_000] {
        let mut rng = StdRng::seed_from_u64(3);
        let web = web_of(size, &mut rng);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &web, |b, web| {
            b.iter(|| {
                let mut total = 0u64;
                web.broadcast(WebId(0), &mut |node: &Node| total += node.id().value())
                    .expect("broadcast");
                black_box(total)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_route, bench_broadcast);
criterion_main!(benches);
