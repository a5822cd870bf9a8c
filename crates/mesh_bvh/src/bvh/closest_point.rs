//! Nearest-point queries
//!
//! Both queries are best-first branch and bound over the shapecast engine:
//! children are scored by squared box distance, nodes farther than the
//! current best are pruned, and the walk stops once a result is within
//! `min_distance`.

use log::warn;

use crate::bvh::shapecast::{NodeIntersection, ShapecastCallbacks};
use crate::bvh::MeshBvh;
use crate::foundation::math::{transform_point, Mat4, Vec3};
use crate::geometry::{ExtendedTriangle, AABB};
use crate::mesh::MeshGeometry;

/// Search limits for closest-point queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestPointOptions {
    /// Results farther than this are not reported
    pub max_distance: f32,
    /// A result at or below this distance ends the search
    pub min_distance: f32,
}

impl Default for ClosestPointOptions {
    fn default() -> Self {
        Self {
            max_distance: f32::INFINITY,
            min_distance: 0.0,
        }
    }
}

/// Closest point on the mesh to a query point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointHit {
    /// The closest surface point
    pub point: Vec3,
    /// Distance from the query point
    pub distance: f32,
    /// Triangle containing `point`
    pub triangle_index: u32,
}

/// Closest pair of points between this mesh and another
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryHit {
    /// Distance between the two points (zero when the meshes touch)
    pub distance: f32,
    /// Point on this mesh, in this mesh's space
    pub point_a: Vec3,
    /// Point on the other mesh, in the other mesh's own space
    pub point_b: Vec3,
    /// Triangle of this mesh
    pub triangle_a: u32,
    /// Triangle of the other mesh
    pub triangle_b: u32,
}

struct PointSearch {
    target: Vec3,
    limit_sq: f32,
    min_sq: f32,
    best: Option<(f32, Vec3, u32)>,
}

impl PointSearch {
    fn bound_sq(&self) -> f32 {
        self.best.map_or(self.limit_sq, |(distance_sq, _, _)| distance_sq)
    }
}

impl ShapecastCallbacks for PointSearch {
    fn bounds_traverse_order(&mut self, bounds: &AABB) -> Option<f32> {
        Some(bounds.distance_sq_to_point(&self.target))
    }

    fn intersects_bounds(&mut self, bounds: &AABB, _: bool, score: Option<f32>, _: u32) -> NodeIntersection {
        let distance_sq = score.unwrap_or_else(|| bounds.distance_sq_to_point(&self.target));
        if distance_sq <= self.bound_sq() {
            NodeIntersection::Intersected
        } else {
            NodeIntersection::NotIntersected
        }
    }

    fn intersects_triangle(&mut self, triangle: &ExtendedTriangle, index: u32, _: bool, _: u32) -> bool {
        let point = triangle.closest_point_to_point(&self.target);
        let distance_sq = (point - self.target).magnitude_squared();
        let better = match self.best {
            Some((best_sq, _, _)) => distance_sq < best_sq,
            None => distance_sq <= self.limit_sq,
        };
        if better {
            self.best = Some((distance_sq, point, index));
        }
        better && distance_sq <= self.min_sq
    }
}

struct GeometrySearch {
    others: Vec<(ExtendedTriangle, AABB)>,
    bounds: AABB,
    limit_sq: f32,
    min_distance: f32,
    best: Option<(f32, Vec3, Vec3, u32, u32)>,
}

impl GeometrySearch {
    fn bound_sq(&self) -> f32 {
        self.best
            .map_or(self.limit_sq, |(distance, ..)| distance * distance)
    }
}

impl ShapecastCallbacks for GeometrySearch {
    fn bounds_traverse_order(&mut self, bounds: &AABB) -> Option<f32> {
        Some(bounds.distance_sq_to_box(&self.bounds))
    }

    fn intersects_bounds(&mut self, bounds: &AABB, _: bool, score: Option<f32>, _: u32) -> NodeIntersection {
        let distance_sq = score.unwrap_or_else(|| bounds.distance_sq_to_box(&self.bounds));
        if distance_sq <= self.bound_sq() {
            NodeIntersection::Intersected
        } else {
            NodeIntersection::NotIntersected
        }
    }

    fn intersects_triangle(&mut self, triangle: &ExtendedTriangle, index: u32, _: bool, _: u32) -> bool {
        let triangle_bounds = triangle.bounding_box();
        for (other_index, (other, other_bounds)) in self.others.iter().enumerate() {
            if triangle_bounds.distance_sq_to_box(other_bounds) > self.bound_sq() {
                continue;
            }

            let (distance, point_a, point_b) = triangle.closest_points_to_triangle(other);
            let better = match self.best {
                Some((best, ..)) => distance < best,
                None => distance * distance <= self.limit_sq,
            };
            if better {
                self.best = Some((distance, point_a, point_b, index, other_index as u32));
                if distance <= self.min_distance {
                    return true;
                }
            }
        }
        false
    }
}

impl MeshBvh {
    /// Closest point on the mesh surface to `point`
    ///
    /// Returns `None` when nothing lies within `max_distance`.
    pub fn closest_point_to_point(&self, point: &Vec3, options: &ClosestPointOptions) -> Option<PointHit> {
        let mut search = PointSearch {
            target: *point,
            limit_sq: options.max_distance * options.max_distance,
            min_sq: options.min_distance * options.min_distance,
            best: None,
        };
        self.shapecast(&mut search);
        search.best.map(|(distance_sq, point, triangle_index)| PointHit {
            point,
            distance: distance_sq.sqrt(),
            triangle_index,
        })
    }

    /// Closest pair of points between this mesh and `geometry`, placed by `geometry_to_bvh`
    ///
    /// `point_b` is mapped back into `geometry`'s own space. If the matrix is
    /// singular it is left in this mesh's space.
    pub fn closest_point_to_geometry(
        &self,
        geometry: &MeshGeometry,
        geometry_to_bvh: &Mat4,
        options: &ClosestPointOptions,
    ) -> Option<GeometryHit> {
        let others: Vec<(ExtendedTriangle, AABB)> = geometry
            .transformed_triangles(geometry_to_bvh)
            .into_iter()
            .map(|triangle| {
                let bounds = triangle.bounding_box();
                (triangle, bounds)
            })
            .collect();
        let bounds = others
            .iter()
            .fold(AABB::empty(), |acc, (_, b)| acc.union(b));

        let mut search = GeometrySearch {
            others,
            bounds,
            limit_sq: options.max_distance * options.max_distance,
            min_distance: options.min_distance,
            best: None,
        };
        self.shapecast(&mut search);

        let (distance, point_a, point_b, triangle_a, triangle_b) = search.best?;
        let point_b = match geometry_to_bvh.try_inverse() {
            Some(bvh_to_geometry) => transform_point(&bvh_to_geometry, &point_b),
            None => {
                warn!("Singular geometry transform; closest point left in hierarchy space");
                point_b
            }
        };

        Some(GeometryHit {
            distance,
            point_a,
            point_b,
            triangle_a,
            triangle_b,
        })
    }
}
