use approx::assert_relative_eq;

use super::*;
use crate::bvh::{BuildOptions, ClosestPointOptions, SplitStrategy};
use crate::config::Config;
use crate::foundation::math::{Quat, Transform};
use crate::mesh::shapes::{box_geometry, icosphere};
use crate::mesh::TriangleRange;

fn unit_cube() -> MeshGeometry {
    box_geometry(1.0, 1.0, 1.0).unwrap()
}

#[test]
fn test_ray_down_onto_cube_top() {
    for strategy in [SplitStrategy::Center, SplitStrategy::Average, SplitStrategy::Sah] {
        let bvh = MeshBvh::build(unit_cube(), &BuildOptions::with_strategy(strategy)).unwrap();
        let ray = Ray::new(Vec3::new(0.0, 5.0, 0.0), Vec3::new(0.0, -1.0, 0.0));

        let hit = bvh.raycast_first(&ray, 0.0, f32::INFINITY).unwrap();
        assert_relative_eq!(hit.distance, 4.5);
        assert_relative_eq!(hit.point, Vec3::new(0.0, 0.5, 0.0));
        assert_relative_eq!(hit.face_normal, Vec3::new(0.0, 1.0, 0.0));
        for vertex in bvh.geometry().triangle_vertices(hit.triangle_index as usize) {
            assert_eq!(vertex.y, 0.5);
        }
    }
}

#[test]
fn test_closest_point_beside_cube() {
    let bvh = MeshBvh::build_default(unit_cube()).unwrap();
    let hit = bvh
        .closest_point_to_point(&Vec3::new(2.0, 0.0, 0.0), &ClosestPointOptions::default())
        .unwrap();
    assert_relative_eq!(hit.distance, 1.5, epsilon = 1e-6);
    assert_relative_eq!(hit.point.x, 0.5, epsilon = 1e-6);
    for vertex in bvh.geometry().triangle_vertices(hit.triangle_index as usize) {
        assert_eq!(vertex.x, 0.5);
    }
}

#[test]
fn test_icospheres_collide_by_distance() {
    let bvh = MeshBvh::build_default(icosphere(1.0, 2).unwrap()).unwrap();
    let other = MeshBvh::build_default(icosphere(1.0, 2).unwrap()).unwrap();
    let placed_at = Transform::from_position(Vec3::new(-1.0, 2.0, 0.5));
    let spin = Quat::from_axis_angle(&Vec3::y_axis(), 0.4);

    for (gap, expected) in [(1.5, true), (3.0, false)] {
        let moved = Transform::from_position_rotation(placed_at.position + Vec3::new(gap, 0.0, 0.0), spin);
        let matrix = moved.relative_to(&placed_at).unwrap();

        assert_eq!(bvh.intersects_bvh(&other, &matrix), expected, "bvh at {gap}");
        assert_eq!(bvh.intersects_geometry(other.geometry(), &matrix), expected, "geometry at {gap}");

        let hit = bvh
            .closest_point_to_geometry(other.geometry(), &matrix, &ClosestPointOptions::default())
            .unwrap();
        if expected {
            assert_eq!(hit.distance, 0.0);
        } else {
            // Inscribed radius of the subdivided icosahedron is just under 1
            assert!(hit.distance > 1.0 && hit.distance < 1.1, "distance {}", hit.distance);
        }
    }
}

#[test]
fn test_degenerate_triangle_is_never_hit() {
    let cube = unit_cube();
    let mut positions = cube.positions().to_vec();
    let mut indices = cube.index().unwrap().to_u32_vec();
    let base = positions.len() as u32;
    // One triangle collapsed to a point and one collapsed to a segment, both on the test ray
    let point = Vec3::new(0.1, 0.0, 0.0);
    positions.extend([point, point, point]);
    positions.extend([Vec3::new(0.1, 0.0, -0.2), Vec3::new(0.1, 0.0, 0.1), Vec3::new(0.1, 0.0, 0.3)]);
    indices.extend(base..base + 6);
    let geometry = MeshGeometry::new(positions, indices).unwrap();

    for strategy in [SplitStrategy::Center, SplitStrategy::Sah] {
        for indirect in [false, true] {
            let options = BuildOptions {
                strategy,
                indirect,
                max_leaf_triangles: 1,
                ..Default::default()
            };
            let bvh = MeshBvh::build(geometry.clone(), &options).unwrap();
            assert_bounds_contain(&bvh);

            let through_center = Ray::new(Vec3::new(0.1, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
            let first = bvh.raycast_first(&through_center, 0.0, f32::INFINITY).unwrap();
            assert_relative_eq!(first.distance, 4.5, epsilon = 1e-6);
            let distances: Vec<f32> = bvh
                .raycast(&through_center, 0.0, f32::INFINITY)
                .iter()
                .map(|hit| hit.distance)
                .collect();
            assert_eq!(distances.len(), 2, "hits {distances:?}");

            let hit = bvh
                .closest_point_to_point(&Vec3::new(0.0, 2.0, 0.0), &ClosestPointOptions::default())
                .unwrap();
            assert_relative_eq!(hit.distance, 1.5, epsilon = 1e-6);
            assert!(!bvh.geometry().triangle(hit.triangle_index as usize).is_degenerate());
        }
    }
}

#[test]
fn test_groups_become_separate_roots() {
    let geometry = unit_cube().with_groups(vec![TriangleRange::new(0, 6), TriangleRange::new(6, 6)]);
    let bvh = MeshBvh::build_default(geometry).unwrap();
    assert_eq!(bvh.roots().len(), 2);
    assert_bounds_contain(&bvh);

    let ray = Ray::new(Vec3::new(0.1, 5.0, 0.2), Vec3::new(0.0, -1.0, 0.0));
    let mut distances: Vec<f32> = bvh.raycast(&ray, 0.0, f32::INFINITY).iter().map(|hit| hit.distance).collect();
    distances.sort_by(f32::total_cmp);
    assert_eq!(distances.len(), 2);
    assert_relative_eq!(distances[0], 4.5, epsilon = 1e-6);
    assert_relative_eq!(distances[1], 5.5, epsilon = 1e-6);

    // Triangles stay inside their group's range after reordering
    for (root, buffer) in bvh.roots().iter().enumerate() {
        let (offset, count) = node::subtree_range(buffer, 0);
        assert_eq!((offset, count), (root as u32 * 6, 6));
    }
}

#[test]
fn test_build_options_file_round_trip() {
    let options = BuildOptions {
        strategy: SplitStrategy::Sah,
        max_leaf_triangles: 4,
        indirect: true,
        ..Default::default()
    };
    let dir = std::env::temp_dir();
    for name in ["mesh_bvh_options_test.toml", "mesh_bvh_options_test.ron"] {
        let path = dir.join(name);
        options.save_to_file(&path).unwrap();
        let loaded = BuildOptions::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, options);

        let geometry = icosphere(1.0, 1).unwrap();
        let a = MeshBvh::build(geometry.clone(), &options).unwrap();
        let b = MeshBvh::build(geometry, &loaded).unwrap();
        assert_eq!(a, b);
    }
}
