//! Ray queries
//!
//! Both walks use the slab test with the reciprocal direction computed once
//! per query. The first-hit walk descends front-to-back along each node's
//! split axis and skips subtrees entered beyond the best hit so far.

use crate::bvh::{node, MeshBvh};
use crate::foundation::math::{Vec2, Vec3};
use crate::geometry::{Ray, RayTriangleHit, Side, AABB};

/// Ray query settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastOptions {
    /// Hits closer than this are ignored
    pub near: f32,
    /// Hits farther than this are ignored
    pub far: f32,
    /// Which triangle faces count
    pub side: Side,
}

impl Default for RaycastOptions {
    fn default() -> Self {
        Self {
            near: 0.0,
            far: f32::INFINITY,
            side: Side::Double,
        }
    }
}

/// A ray/mesh intersection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    /// Distance from the ray origin
    pub distance: f32,
    /// Hit position in mesh space
    pub point: Vec3,
    /// Index of the triangle that was hit
    pub triangle_index: u32,
    /// Weights of the triangle's three vertices at the hit point
    pub barycentric: Vec3,
    /// Geometric normal of the triangle
    pub face_normal: Vec3,
    /// Interpolated vertex normal, if the mesh has normals
    pub normal: Option<Vec3>,
    /// Interpolated texture coordinate, if the mesh has uvs
    pub uv: Option<Vec2>,
}

struct RayQuery<'a> {
    ray: &'a Ray,
    inv_dir: Vec3,
    options: &'a RaycastOptions,
}

impl RayQuery<'_> {
    /// True if the ray passes through `aabb` somewhere in `[near, far]`
    #[inline]
    fn enters(&self, aabb: &AABB, far: f32) -> bool {
        aabb.ray_interval(&self.ray.origin, &self.inv_dir)
            .is_some_and(|(enter, exit)| exit >= self.options.near && enter <= far)
    }

    #[inline]
    fn accepts(&self, distance: f32, far: f32) -> bool {
        distance >= self.options.near && distance <= far
    }
}

impl MeshBvh {
    /// Every hit within `[near, far]`, unsorted
    pub fn raycast(&self, ray: &Ray, near: f32, far: f32) -> Vec<Hit> {
        self.raycast_with(
            ray,
            &RaycastOptions {
                near,
                far,
                ..Default::default()
            },
        )
    }

    /// Every hit allowed by `options`, unsorted
    ///
    /// Rays with a zero direction or non-finite components hit nothing.
    pub fn raycast_with(&self, ray: &Ray, options: &RaycastOptions) -> Vec<Hit> {
        let mut hits = Vec::new();
        let Some(query) = Self::ray_query(ray, options) else {
            return hits;
        };

        for buffer in &self.roots {
            if query.enters(&node::bounds(buffer, 0), options.far) {
                self.raycast_node(buffer, 0, &query, &mut hits);
            }
        }
        hits
    }

    /// Nearest hit within `[near, far]`
    pub fn raycast_first(&self, ray: &Ray, near: f32, far: f32) -> Option<Hit> {
        self.raycast_first_with(
            ray,
            &RaycastOptions {
                near,
                far,
                ..Default::default()
            },
        )
    }

    /// Nearest hit allowed by `options`
    pub fn raycast_first_with(&self, ray: &Ray, options: &RaycastOptions) -> Option<Hit> {
        let query = Self::ray_query(ray, options)?;
        let mut best = None;
        for buffer in &self.roots {
            let far = best.as_ref().map_or(options.far, |hit: &Hit| hit.distance);
            if query.enters(&node::bounds(buffer, 0), far) {
                self.raycast_first_node(buffer, 0, &query, &mut best);
            }
        }
        best
    }

    fn ray_query<'a>(ray: &'a Ray, options: &'a RaycastOptions) -> Option<RayQuery<'a>> {
        let length_sq = ray.direction.magnitude_squared();
        let finite = ray.origin.iter().all(|c| c.is_finite()) && length_sq.is_finite();
        if !finite || length_sq <= 0.0 {
            return None;
        }
        Some(RayQuery {
            ray,
            inv_dir: ray.inverse_direction(),
            options,
        })
    }

    fn raycast_node(&self, buffer: &[u32], index: usize, query: &RayQuery<'_>, hits: &mut Vec<Hit>) {
        if node::is_leaf(buffer, index) {
            let offset = node::leaf_offset(buffer, index);
            for slot in offset..offset + node::leaf_count(buffer, index) {
                if let Some(hit) = self.intersect_slot(slot, query, query.options.far) {
                    hits.push(hit);
                }
            }
            return;
        }

        for child in [node::left_child(index), node::right_child(buffer, index)] {
            if query.enters(&node::bounds(buffer, child), query.options.far) {
                self.raycast_node(buffer, child, query, hits);
            }
        }
    }

    fn raycast_first_node(&self, buffer: &[u32], index: usize, query: &RayQuery<'_>, best: &mut Option<Hit>) {
        let far = |best: &Option<Hit>| best.as_ref().map_or(query.options.far, |hit| hit.distance);

        if node::is_leaf(buffer, index) {
            let offset = node::leaf_offset(buffer, index);
            for slot in offset..offset + node::leaf_count(buffer, index) {
                if let Some(hit) = self.intersect_slot(slot, query, far(best)) {
                    if best.as_ref().map_or(true, |current| hit.distance < current.distance) {
                        *best = Some(hit);
                    }
                }
            }
            return;
        }

        let left = node::left_child(index);
        let right = node::right_child(buffer, index);
        let axis = node::split_axis(buffer, index);
        let (first, second) = if query.ray.direction[axis] >= 0.0 {
            (left, right)
        } else {
            (right, left)
        };

        for child in [first, second] {
            if query.enters(&node::bounds(buffer, child), far(best)) {
                self.raycast_first_node(buffer, child, query, best);
            }
        }
    }

    fn intersect_slot(&self, slot: u32, query: &RayQuery<'_>, far: f32) -> Option<Hit> {
        let triangle = self.triangle_at_slot(slot);
        let RayTriangleHit {
            distance,
            barycentric,
            ..
        } = triangle.intersect_ray(query.ray, query.options.side)?;
        if !query.accepts(distance, far) {
            return None;
        }

        let triangle_index = self.resolve_triangle_index(slot);
        Some(Hit {
            distance,
            point: query.ray.point_at(distance),
            triangle_index,
            barycentric,
            face_normal: triangle.normal(),
            normal: self.geometry.interpolate_normal(triangle_index as usize, &barycentric),
            uv: self.geometry.interpolate_uv(triangle_index as usize, &barycentric),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bvh::BuildOptions;
    use crate::mesh::shapes::{box_geometry, uv_sphere};
    use approx::assert_relative_eq;

    #[test]
    fn test_first_hit_on_sphere_has_attributes() {
        let bvh = MeshBvh::build_default(uv_sphere(1.0, 32, 16).unwrap()).unwrap();
        // Slightly off-axis so the ray does not pass exactly through a vertex
        let ray = Ray::new(Vec3::new(0.05, 0.03, 5.0), Vec3::new(0.0, 0.0, -1.0));
        let hit = bvh.raycast_first(&ray, 0.0, f32::INFINITY).unwrap();

        assert_relative_eq!(hit.distance, 4.0, epsilon = 1e-2);
        assert!(hit.face_normal.z > 0.9);
        let normal = hit.normal.unwrap();
        assert!(normal.z > 0.9);
        assert!(hit.uv.is_some());
        assert_relative_eq!(hit.barycentric.sum(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_all_hits_through_box() {
        let bvh = MeshBvh::build_default(box_geometry(1.0, 1.0, 1.0).unwrap()).unwrap();
        let ray = Ray::new(Vec3::new(0.1, 5.0, 0.2), Vec3::new(0.0, -1.0, 0.0));
        let mut distances: Vec<f32> = bvh.raycast(&ray, 0.0, f32::INFINITY).iter().map(|h| h.distance).collect();
        distances.sort_by(f32::total_cmp);
        assert_eq!(distances.len(), 2);
        assert_relative_eq!(distances[0], 4.5, epsilon = 1e-5);
        assert_relative_eq!(distances[1], 5.5, epsilon = 1e-5);

        // Far clip drops the exit hit, near clip drops the entry hit
        assert_eq!(bvh.raycast(&ray, 0.0, 5.0).len(), 1);
        let from_inside = bvh.raycast_first(&ray, 5.0, f32::INFINITY).unwrap();
        assert_relative_eq!(from_inside.distance, 5.5, epsilon = 1e-5);
    }

    #[test]
    fn test_side_culling() {
        let bvh = MeshBvh::build_default(box_geometry(1.0, 1.0, 1.0).unwrap()).unwrap();
        let ray = Ray::new(Vec3::new(0.1, 5.0, 0.2), Vec3::new(0.0, -1.0, 0.0));

        let front = RaycastOptions {
            side: Side::Front,
            ..Default::default()
        };
        let back = RaycastOptions {
            side: Side::Back,
            ..Default::default()
        };
        assert_relative_eq!(bvh.raycast_first_with(&ray, &front).unwrap().distance, 4.5, epsilon = 1e-5);
        assert_relative_eq!(bvh.raycast_first_with(&ray, &back).unwrap().distance, 5.5, epsilon = 1e-5);
    }

    #[test]
    fn test_degenerate_rays_hit_nothing() {
        let bvh = MeshBvh::build(box_geometry(1.0, 1.0, 1.0).unwrap(), &BuildOptions::default()).unwrap();
        let zero = Ray {
            origin: Vec3::new(0.0, 5.0, 0.0),
            direction: Vec3::zeros(),
        };
        let nan = Ray {
            origin: Vec3::new(f32::NAN, 0.0, 0.0),
            direction: Vec3::new(0.0, -1.0, 0.0),
        };
        assert!(bvh.raycast_first(&zero, 0.0, f32::INFINITY).is_none());
        assert!(bvh.raycast(&zero, 0.0, f32::INFINITY).is_empty());
        assert!(bvh.raycast_first(&nan, 0.0, f32::INFINITY).is_none());
    }
}
