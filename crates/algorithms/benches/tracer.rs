//! Benchmarks for graph building and shortest path queries

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use geo::Coord;
use topotrace_algorithms::engine::EngineContext;
use topotrace_algorithms::tracer::Tracer;
use topotrace_core::geometry::{Geometry, LineString};
use topotrace_core::vector::{FeatureSource, MemoryLayer};
use topotrace_core::CRS;

/// Street grid of `size` x `size` blocks, one feature per row and column
fn create_grid(size: usize) -> Arc<MemoryLayer> {
    let layer = Arc::new(MemoryLayer::new("grid", CRS::web_mercator()));
    let extent = size as f64 * 10.0;
    for i in 0..=size {
        let t = i as f64 * 10.0;
        layer.add_feature(Some(Geometry::LineString(LineString::from_xy(&[(0.0, t), (extent, t)]))));
        layer.add_feature(Some(Geometry::LineString(LineString::from_xy(&[(t, 0.0), (t, extent)]))));
    }
    layer
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracer_build");

    for size in [10, 50, 100].iter() {
        let layer = create_grid(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut tracer = Tracer::new(EngineContext::init());
                tracer.set_layers(vec![layer.clone() as Arc<dyn FeatureSource>]);
                black_box(tracer.init())
            })
        });
    }

    group.finish();
}

fn bench_shortest_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("tracer_path");

    for size in [10, 50, 100].iter() {
        let layer = create_grid(*size);
        let mut tracer = Tracer::new(EngineContext::init());
        tracer.set_layers(vec![layer as Arc<dyn FeatureSource>]);
        tracer.init();
        let extent = *size as f64 * 10.0;
        let from = Coord { x: 5.0, y: 0.0 };
        let to = Coord { x: extent, y: extent - 5.0 };

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| tracer.find_shortest_path(black_box(from), black_box(to)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build, bench_shortest_path);
criterion_main!(benches);
