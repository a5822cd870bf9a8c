//! BVH Benchmarks
//!
//! Build time per split strategy and query throughput on a dense sphere

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use mesh_bvh::prelude::*;
use mesh_bvh::mesh::shapes::{icosphere, uv_sphere};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_direction(rng: &mut StdRng) -> Vec3 {
    Vec3::new(
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
    )
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");

    for subdivisions in [3, 5] {
        let geometry = icosphere(1.0, subdivisions).expect("icosphere");
        let triangles = geometry.triangle_count();
        for strategy in [SplitStrategy::Center, SplitStrategy::Sah] {
            let options = BuildOptions {
                strategy,
                verbose: false,
                ..Default::default()
            };
            group.bench_with_input(
                BenchmarkId::new(format!("{strategy:?}"), triangles),
                &geometry,
                |b, geometry| {
                    b.iter(|| MeshBvh::build(black_box(geometry.clone()), &options).expect("build"));
                },
            );
        }
    }

    group.finish();
}

fn bench_raycast_first(c: &mut Criterion) {
    let bvh = MeshBvh::build(
        uv_sphere(1.0, 256, 128).expect("sphere"),
        &BuildOptions::with_strategy(SplitStrategy::Sah),
    )
    .expect("build");
    let mut rng = StdRng::seed_from_u64(1);
    let rays: Vec<Ray> = (0..1024)
        .map(|_| {
            let origin = random_direction(&mut rng).normalize() * 3.0;
            Ray::new(origin, random_direction(&mut rng) * 0.5 - origin)
        })
        .collect();

    c.bench_function("raycast_first 1024 rays", |b| {
        b.iter(|| {
            for ray in &rays {
                black_box(bvh.raycast_first(ray, 0.0, f32::INFINITY));
            }
        });
    });
}

fn bench_closest_point(c: &mut Criterion) {
    let bvh = MeshBvh::build_default(icosphere(1.0, 5).expect("icosphere")).expect("build");
    let mut rng = StdRng::seed_from_u64(2);
    let points: Vec<Vec3> = (0..1024).map(|_| random_direction(&mut rng) * 2.0).collect();
    let options = ClosestPointOptions::default();

    c.bench_function("closest_point_to_point 1024 points", |b| {
        b.iter(|| {
            for point in &points {
                black_box(bvh.closest_point_to_point(point, &options));
            }
        });
    });
}

criterion_group!(benches, bench_build, bench_raycast_first, bench_closest_point);
criterion_main!(benches);
