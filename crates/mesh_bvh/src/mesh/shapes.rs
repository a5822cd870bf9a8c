//! Procedural test and demo meshes
//!
//! All shapes are centered on the origin with counter-clockwise, outward
//! facing triangles.

use std::collections::HashMap;
use std::f32::consts::PI;

use crate::foundation::math::{Vec2, Vec3};
use crate::mesh::{GeometryError, MeshGeometry};

/// Axis-aligned box with 8 shared corners and 12 triangles
pub fn box_geometry(width: f32, height: f32, depth: f32) -> Result<MeshGeometry, GeometryError> {
    let half = Vec3::new(width, height, depth) * 0.5;

    // Corner bit 0/1/2 selects +x/+y/+z
    let positions = (0..8)
        .map(|i| {
            Vec3::new(
                if i & 1 == 0 { -half.x } else { half.x },
                if i & 2 == 0 { -half.y } else { half.y },
                if i & 4 == 0 { -half.z } else { half.z },
            )
        })
        .collect();

    let indices = vec![
        0, 4, 6, 0, 6, 2, // -x
        1, 3, 7, 1, 7, 5, // +x
        0, 1, 5, 0, 5, 4, // -y
        2, 6, 7, 2, 7, 3, // +y
        0, 2, 3, 0, 3, 1, // -z
        4, 5, 7, 4, 7, 6, // +z
    ];

    MeshGeometry::new(positions, indices)
}

/// Latitude/longitude sphere with normals and texture coordinates
///
/// Produces `width_segments * (2 * height_segments - 2)` triangles; the
/// single-triangle fans at the poles avoid zero-area faces.
pub fn uv_sphere(radius: f32, width_segments: u32, height_segments: u32) -> Result<MeshGeometry, GeometryError> {
    let width_segments = width_segments.max(3);
    let height_segments = height_segments.max(2);

    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut uvs = Vec::new();
    let mut grid = Vec::with_capacity(height_segments as usize + 1);

    for iy in 0..=height_segments {
        let v = iy as f32 / height_segments as f32;
        let theta = v * PI;
        let mut row = Vec::with_capacity(width_segments as usize + 1);

        for ix in 0..=width_segments {
            let u = ix as f32 / width_segments as f32;
            let phi = u * 2.0 * PI;
            let normal = Vec3::new(-phi.cos() * theta.sin(), theta.cos(), phi.sin() * theta.sin());

            row.push(positions.len() as u32);
            positions.push(normal * radius);
            normals.push(normal);
            uvs.push(Vec2::new(u, 1.0 - v));
        }
        grid.push(row);
    }

    let mut indices = Vec::new();
    for iy in 0..height_segments as usize {
        for ix in 0..width_segments as usize {
            let a = grid[iy][ix + 1];
            let b = grid[iy][ix];
            let c = grid[iy + 1][ix];
            let d = grid[iy + 1][ix + 1];

            if iy != 0 {
                indices.extend_from_slice(&[a, b, d]);
            }
            if iy != height_segments as usize - 1 {
                indices.extend_from_slice(&[b, c, d]);
            }
        }
    }

    MeshGeometry::new(positions, indices)?.with_normals(normals)?.with_uvs(uvs)
}

/// Subdivided icosahedron with `20 * 4^subdivisions` triangles
pub fn icosphere(radius: f32, subdivisions: u32) -> Result<MeshGeometry, GeometryError> {
    let t = (1.0 + 5.0_f32.sqrt()) / 2.0;
    let mut positions: Vec<Vec3> = [
        (-1.0, t, 0.0),
        (1.0, t, 0.0),
        (-1.0, -t, 0.0),
        (1.0, -t, 0.0),
        (0.0, -1.0, t),
        (0.0, 1.0, t),
        (0.0, -1.0, -t),
        (0.0, 1.0, -t),
        (t, 0.0, -1.0),
        (t, 0.0, 1.0),
        (-t, 0.0, -1.0),
        (-t, 0.0, 1.0),
    ]
    .iter()
    .map(|&(x, y, z)| Vec3::new(x, y, z).normalize())
    .collect();

    let mut faces: Vec<[u32; 3]> = vec![
        [0, 11, 5], [0, 5, 1], [0, 1, 7], [0, 7, 10], [0, 10, 11],
        [1, 5, 9], [5, 11, 4], [11, 10, 2], [10, 7, 6], [7, 1, 8],
        [3, 9, 4], [3, 4, 2], [3, 2, 6], [3, 6, 8], [3, 8, 9],
        [4, 9, 5], [2, 4, 11], [6, 2, 10], [8, 6, 7], [9, 8, 1],
    ];

    for _ in 0..subdivisions {
        let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
        let mut midpoint = |a: u32, b: u32, positions: &mut Vec<Vec3>| -> u32 {
            let key = (a.min(b), a.max(b));
            *midpoints.entry(key).or_insert_with(|| {
                let point = ((positions[a as usize] + positions[b as usize]) * 0.5).normalize();
                positions.push(point);
                positions.len() as u32 - 1
            })
        };

        let mut next = Vec::with_capacity(faces.len() * 4);
        for [a, b, c] in faces {
            let ab = midpoint(a, b, &mut positions);
            let bc = midpoint(b, c, &mut positions);
            let ca = midpoint(c, a, &mut positions);
            next.extend_from_slice(&[[a, ab, ca], [b, bc, ab], [c, ca, bc], [ab, bc, ca]]);
        }
        faces = next;
    }

    let normals = positions.clone();
    let positions = positions.into_iter().map(|p| p * radius).collect();
    let indices = faces.into_iter().flatten().collect();
    MeshGeometry::new(positions, indices)?.with_normals(normals)
}
