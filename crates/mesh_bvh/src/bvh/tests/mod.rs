//! Cross-module hierarchy tests
//!
//! Property tests compare the tree queries against brute force over seeded
//! random inputs; scenarios pin down concrete expected answers.

mod scenarios;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::bvh::{node, MeshBvh};
use crate::foundation::{logging, math::Vec3};
use crate::geometry::{Ray, Side, AABB};
use crate::mesh::MeshGeometry;

/// Seeded generator, also installs the test logger so build warnings show
pub(super) fn rng(seed: u64) -> StdRng {
    logging::try_init();
    StdRng::seed_from_u64(seed)
}

pub(super) fn random_vec(rng: &mut StdRng, range: f32) -> Vec3 {
    Vec3::new(
        rng.gen_range(-range..range),
        rng.gen_range(-range..range),
        rng.gen_range(-range..range),
    )
}

/// Independent small triangles scattered through a cube of half-size 10
pub(super) fn random_soup(rng: &mut StdRng, triangles: usize) -> MeshGeometry {
    let positions = (0..triangles)
        .flat_map(|_| {
            let center = random_vec(rng, 10.0);
            [
                center + random_vec(rng, 0.5),
                center + random_vec(rng, 0.5),
                center + random_vec(rng, 0.5),
            ]
        })
        .collect();
    MeshGeometry::non_indexed(positions).unwrap()
}

/// Nearest hit distance by testing every triangle
pub(super) fn brute_force_first_hit(geometry: &MeshGeometry, ray: &Ray) -> Option<f32> {
    (0..geometry.triangle_count())
        .filter_map(|i| geometry.triangle(i).intersect_ray(ray, Side::Double))
        .map(|hit| hit.distance)
        .min_by(f32::total_cmp)
}

/// Nearest surface distance by testing every triangle
pub(super) fn brute_force_closest(geometry: &MeshGeometry, point: &Vec3) -> f32 {
    (0..geometry.triangle_count())
        .map(|i| geometry.triangle(i).distance_sq_to_point(point))
        .min_by(f32::total_cmp)
        .unwrap()
        .sqrt()
}

/// Asserts every node box contains its children and every leaf box its triangles
pub(super) fn assert_bounds_contain(bvh: &MeshBvh) {
    for buffer in bvh.roots() {
        for index in (0..buffer.len()).step_by(node::NODE_WORDS) {
            let bounds = node::bounds(buffer, index);
            if node::is_leaf(buffer, index) {
                let offset = node::leaf_offset(buffer, index);
                for slot in offset..offset + node::leaf_count(buffer, index) {
                    let triangle = bvh.triangle_at_slot(slot);
                    for vertex in &triangle.vertices() {
                        assert!(bounds.contains_point(vertex), "leaf {index} misses vertex {vertex:?}");
                    }
                }
            } else {
                for child in [node::left_child(index), node::right_child(buffer, index)] {
                    assert!(
                        bounds.contains_box(&node::bounds(buffer, child)),
                        "node {index} does not contain child {child}"
                    );
                }
            }
        }
    }
}

/// Slots reached by walking the leaves, in leaf order
pub(super) fn leaf_slots(bvh: &MeshBvh) -> Vec<u32> {
    let mut slots = Vec::new();
    bvh.traverse(|visit| {
        if let Some(range) = visit.leaf {
            slots.extend(range.offset..range.end());
        }
        false
    });
    slots
}

/// Box around every vertex of the geometry, for comparing against root bounds
pub(super) fn geometry_bounds(geometry: &MeshGeometry) -> AABB {
    AABB::from_points(geometry.positions())
}
