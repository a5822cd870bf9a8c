//! Triangles with cached data for repeated intersection tests
//!
//! [`ExtendedTriangle`] precomputes the face normal, edges and the triangle's
//! own projections onto its separating axes, so testing one triangle against
//! many others only projects the other side.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{
    constants::{CONTACT_EPSILON, EPSILON},
    transform_point, Mat4, Vec3,
};
use crate::geometry::aabb::AABB;
use crate::geometry::primitives::{BoundingSphere, Ray};
use crate::geometry::segment::Segment;

/// Relative tolerance for treating a cross product as zero
const PARALLEL_TOLERANCE: f32 = 1e-12;

/// Which faces a ray may hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Side {
    /// Only faces wound counter-clockwise as seen from the ray origin
    Front,
    /// Only faces wound clockwise as seen from the ray origin
    Back,
    /// Both windings
    #[default]
    Double,
}

/// Ray/triangle intersection parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayTriangleHit {
    /// Distance along the ray
    pub distance: f32,
    /// Weights of vertices a, b and c at the hit point
    pub barycentric: Vec3,
    /// True when the ray struck the back face
    pub back_face: bool,
}

/// A triangle plus cached normal, edges and separating-axis projections
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtendedTriangle {
    a: Vec3,
    b: Vec3,
    c: Vec3,
    /// Unit normal, zero for degenerate triangles
    normal: Vec3,
    /// `b - a`, `c - b`, `a - c`
    edges: [Vec3; 3],
    /// Face normal followed by the three in-plane edge normals
    sat_axes: [Vec3; 4],
    sat_bounds: [(f32, f32); 4],
    degenerate: bool,
}

impl ExtendedTriangle {
    /// Creates a triangle and computes its cached data
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        let edges = [b - a, c - b, a - c];
        let cross = edges[0].cross(&(c - a));
        let max_edge_sq = edges
            .iter()
            .map(Vec3::magnitude_squared)
            .fold(0.0_f32, f32::max);
        let degenerate = cross.magnitude_squared() <= PARALLEL_TOLERANCE * max_edge_sq * max_edge_sq;

        let normal = if degenerate { Vec3::zeros() } else { cross.normalize() };
        let sat_axes = [
            normal,
            normal.cross(&edges[0]),
            normal.cross(&edges[1]),
            normal.cross(&edges[2]),
        ];
        let sat_bounds = sat_axes.map(|axis| project(&[a, b, c], &axis));

        Self {
            a,
            b,
            c,
            normal,
            edges,
            sat_axes,
            sat_bounds,
            degenerate,
        }
    }

    /// Creates a triangle from a vertex array
    pub fn from_vertices(vertices: [Vec3; 3]) -> Self {
        Self::new(vertices[0], vertices[1], vertices[2])
    }

    /// The triangle's vertices in winding order
    pub fn vertices(&self) -> [Vec3; 3] {
        [self.a, self.b, self.c]
    }

    /// Unit face normal (right-hand rule), zero when degenerate
    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// Edge vectors `b - a`, `c - b`, `a - c`
    pub fn edges(&self) -> &[Vec3; 3] {
        &self.edges
    }

    /// The three edges as segments
    pub fn segments(&self) -> [Segment; 3] {
        [
            Segment::new(self.a, self.b),
            Segment::new(self.b, self.c),
            Segment::new(self.c, self.a),
        ]
    }

    /// True for zero-area triangles (collinear or coincident vertices)
    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    /// Calculates the centroid (center point) of the triangle
    pub fn centroid(&self) -> Vec3 {
        (self.a + self.b + self.c) / 3.0
    }

    /// Axis-aligned bounds of the three vertices
    pub fn bounding_box(&self) -> AABB {
        AABB::from_points([self.a, self.b, self.c].iter())
    }

    /// The same triangle with its vertices moved by an affine transform
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        Self::new(
            transform_point(matrix, &self.a),
            transform_point(matrix, &self.b),
            transform_point(matrix, &self.c),
        )
    }

    /// Möller-Trumbore ray-triangle intersection algorithm
    ///
    /// Returns the hit for non-negative distances that pass the `side` test.
    /// Degenerate triangles never report a hit.
    /// See: "Fast, Minimum Storage Ray/Triangle Intersection" by Möller & Trumbore
    pub fn intersect_ray(&self, ray: &Ray, side: Side) -> Option<RayTriangleHit> {
        if self.degenerate {
            return None;
        }

        let edge1 = self.b - self.a;
        let edge2 = self.c - self.a;
        let h = ray.direction.cross(&edge2);
        let det = edge1.dot(&h);

        // Positive determinant means the ray faces the counter-clockwise side
        let culled = match side {
            Side::Front => det < EPSILON,
            Side::Back => det > -EPSILON,
            Side::Double => det.abs() < EPSILON,
        };
        if culled {
            return None;
        }

        let f = 1.0 / det;
        let s = ray.origin - self.a;
        let u = f * s.dot(&h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = f * ray.direction.dot(&q);
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = f * edge2.dot(&q);
        if t >= 0.0 {
            Some(RayTriangleHit {
                distance: t,
                barycentric: Vec3::new(1.0 - u - v, u, v),
                back_face: det < 0.0,
            })
        } else {
            None
        }
    }

    /// Get the closest point on the triangle to a given point
    pub fn closest_point_to_point(&self, point: &Vec3) -> Vec3 {
        if self.degenerate {
            return self.closest_point_on_edges(point);
        }

        let edge1 = self.b - self.a;
        let edge2 = self.c - self.a;

        // Vertex region outside a
        let ap = point - self.a;
        let d1 = edge1.dot(&ap);
        let d2 = edge2.dot(&ap);
        if d1 <= 0.0 && d2 <= 0.0 {
            return self.a;
        }

        // Vertex region outside b
        let bp = point - self.b;
        let d3 = edge1.dot(&bp);
        let d4 = edge2.dot(&bp);
        if d3 >= 0.0 && d4 <= d3 {
            return self.b;
        }

        // Vertex region outside c
        let cp = point - self.c;
        let d5 = edge1.dot(&cp);
        let d6 = edge2.dot(&cp);
        if d6 >= 0.0 && d5 <= d6 {
            return self.c;
        }

        // Edge regions
        let vc = d1 * d4 - d3 * d2;
        if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
            let v = d1 / (d1 - d3);
            return self.a + edge1 * v;
        }

        let vb = d5 * d2 - d1 * d6;
        if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
            let w = d2 / (d2 - d6);
            return self.a + edge2 * w;
        }

        let va = d3 * d6 - d5 * d4;
        if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
            let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
            return self.b + (self.c - self.b) * w;
        }

        // Face region
        let sum = va + vb + vc;
        if sum.abs() <= EPSILON {
            return self.closest_point_on_edges(point);
        }
        let denom = 1.0 / sum;
        self.a + edge1 * (vb * denom) + edge2 * (vc * denom)
    }

    fn closest_point_on_edges(&self, point: &Vec3) -> Vec3 {
        let mut best = self.a;
        let mut best_sq = f32::INFINITY;
        for segment in self.segments() {
            let candidate = segment.closest_point_to_point(point);
            let distance_sq = (candidate - point).magnitude_squared();
            if distance_sq < best_sq {
                best_sq = distance_sq;
                best = candidate;
            }
        }
        best
    }

    /// Squared distance from a point to the triangle
    pub fn distance_sq_to_point(&self, point: &Vec3) -> f32 {
        (self.closest_point_to_point(point) - point).magnitude_squared()
    }

    /// Check if the triangle touches a sphere
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        self.distance_sq_to_point(&sphere.center) <= sphere.radius * sphere.radius
    }

    /// Point where a segment crosses the triangle's interior, if any
    ///
    /// Segments lying in the triangle's plane report no crossing; the
    /// edge/edge tests in [`ExtendedTriangle::closest_points_to_triangle`]
    /// cover that case.
    pub fn intersect_segment(&self, segment: &Segment) -> Option<Vec3> {
        if self.degenerate {
            return None;
        }

        let offset = self.normal.dot(&self.a);
        let da = self.normal.dot(&segment.start) - offset;
        let db = self.normal.dot(&segment.end) - offset;
        if (da > 0.0 && db > 0.0) || (da < 0.0 && db < 0.0) || da == db {
            return None;
        }

        let point = segment.at(da / (da - db));
        let inside = self.normal.dot(&self.edges[0].cross(&(point - self.a))) >= 0.0
            && self.normal.dot(&self.edges[1].cross(&(point - self.b))) >= 0.0
            && self.normal.dot(&self.edges[2].cross(&(point - self.c))) >= 0.0;
        inside.then_some(point)
    }

    /// Separating-axis test against another triangle
    ///
    /// Tests both face normals, the in-plane edge normals of both triangles
    /// (which separate coplanar pairs) and the nine edge/edge cross products.
    /// Touching counts as intersecting. Degenerate triangles fall back to a
    /// distance test.
    pub fn intersects_triangle(&self, other: &Self) -> bool {
        if self.degenerate || other.degenerate {
            let (distance, _, _) = self.closest_points_to_triangle(other);
            return distance <= CONTACT_EPSILON;
        }

        let other_vertices = other.vertices();
        for (axis, bounds) in self.sat_axes.iter().zip(&self.sat_bounds) {
            if separated(*bounds, project(&other_vertices, axis)) {
                return false;
            }
        }

        let vertices = self.vertices();
        for (axis, bounds) in other.sat_axes.iter().zip(&other.sat_bounds) {
            if separated(project(&vertices, axis), *bounds) {
                return false;
            }
        }

        for edge in &self.edges {
            for other_edge in &other.edges {
                let axis = edge.cross(other_edge);
                let scale = edge.magnitude_squared() * other_edge.magnitude_squared();
                if axis.magnitude_squared() <= PARALLEL_TOLERANCE * scale {
                    continue;
                }
                if separated(project(&vertices, &axis), project(&other_vertices, &axis)) {
                    return false;
                }
            }
        }

        true
    }

    /// Closest points between two triangles as `(distance, on_self, on_other)`
    ///
    /// Reports zero distance when an edge of either triangle pierces the other.
    pub fn closest_points_to_triangle(&self, other: &Self) -> (f32, Vec3, Vec3) {
        for segment in other.segments() {
            if let Some(point) = self.intersect_segment(&segment) {
                return (0.0, point, point);
            }
        }
        for segment in self.segments() {
            if let Some(point) = other.intersect_segment(&segment) {
                return (0.0, point, point);
            }
        }

        let mut best_sq = f32::INFINITY;
        let mut best = (self.a, other.a);
        let mut consider = |on_self: Vec3, on_other: Vec3| {
            let distance_sq = (on_self - on_other).magnitude_squared();
            if distance_sq < best_sq {
                best_sq = distance_sq;
                best = (on_self, on_other);
            }
        };

        for segment in self.segments() {
            for other_segment in other.segments() {
                let (p, q) = segment.closest_points(&other_segment);
                consider(p, q);
            }
        }
        for vertex in other.vertices() {
            consider(self.closest_point_to_point(&vertex), vertex);
        }
        for vertex in self.vertices() {
            consider(vertex, other.closest_point_to_point(&vertex));
        }

        (best_sq.sqrt(), best.0, best.1)
    }

    /// Distance between two triangles
    pub fn distance_to_triangle(&self, other: &Self) -> f32 {
        self.closest_points_to_triangle(other).0
    }
}

/// Project points onto an axis and return (min, max)
#[inline]
pub(crate) fn project(points: &[Vec3], axis: &Vec3) -> (f32, f32) {
    points.iter().fold((f32::INFINITY, f32::NEG_INFINITY), |(min, max), point| {
        let d = axis.dot(point);
        (min.min(d), max.max(d))
    })
}

#[inline]
pub(crate) fn separated(a: (f32, f32), b: (f32, f32)) -> bool {
    a.1 < b.0 || b.1 < a.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn floor_triangle() -> ExtendedTriangle {
        // Counter-clockwise seen from +y
        ExtendedTriangle::new(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 0.0),
        )
    }

    #[test]
    fn test_normal_and_degeneracy() {
        let tri = floor_triangle();
        assert!(!tri.is_degenerate());
        assert_relative_eq!(tri.normal(), Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-6);

        let collinear = ExtendedTriangle::new(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(2.0, 2.0, 2.0),
        );
        assert!(collinear.is_degenerate());
        assert_eq!(collinear.normal(), Vec3::zeros());

        let point = ExtendedTriangle::new(Vec3::zeros(), Vec3::zeros(), Vec3::zeros());
        assert!(point.is_degenerate());
    }

    #[test]
    fn test_ray_sides() {
        let tri = floor_triangle();
        let down = Ray::new(Vec3::new(0.25, 1.0, 0.25), Vec3::new(0.0, -1.0, 0.0));
        let up = Ray::new(Vec3::new(0.25, -1.0, 0.25), Vec3::new(0.0, 1.0, 0.0));

        let hit = tri.intersect_ray(&down, Side::Front).unwrap();
        assert_relative_eq!(hit.distance, 1.0, epsilon = 1e-6);
        assert!(!hit.back_face);
        assert_relative_eq!(hit.barycentric.sum(), 1.0, epsilon = 1e-6);

        assert!(tri.intersect_ray(&up, Side::Front).is_none());
        assert!(tri.intersect_ray(&up, Side::Back).unwrap().back_face);
        assert!(tri.intersect_ray(&down, Side::Back).is_none());
        assert!(tri.intersect_ray(&up, Side::Double).is_some());

        let miss = Ray::new(Vec3::new(2.0, 1.0, 2.0), Vec3::new(0.0, -1.0, 0.0));
        assert!(tri.intersect_ray(&miss, Side::Double).is_none());
    }

    #[test]
    fn test_closest_point_regions() {
        let tri = floor_triangle();
        // Face
        assert_relative_eq!(
            tri.closest_point_to_point(&Vec3::new(0.2, 3.0, 0.2)),
            Vec3::new(0.2, 0.0, 0.2),
            epsilon = 1e-6
        );
        // Vertex
        assert_relative_eq!(
            tri.closest_point_to_point(&Vec3::new(-1.0, 0.0, -1.0)),
            Vec3::zeros(),
            epsilon = 1e-6
        );
        // Hypotenuse
        assert_relative_eq!(
            tri.closest_point_to_point(&Vec3::new(1.0, 0.0, 1.0)),
            Vec3::new(0.5, 0.0, 0.5),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_degenerate_closest_point_uses_edges() {
        let tri = ExtendedTriangle::new(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
        );
        assert_relative_eq!(
            tri.closest_point_to_point(&Vec3::new(1.5, 1.0, 0.0)),
            Vec3::new(1.5, 0.0, 0.0),
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_crossing_triangles_intersect() {
        let tri = floor_triangle();
        let wall = ExtendedTriangle::new(
            Vec3::new(0.25, -1.0, 0.25),
            Vec3::new(0.25, 1.0, 0.25),
            Vec3::new(0.25, 0.0, -1.0),
        );
        assert!(tri.intersects_triangle(&wall));
        assert!(wall.intersects_triangle(&tri));
        assert_eq!(tri.distance_to_triangle(&wall), 0.0);
    }

    #[test]
    fn test_parallel_triangles_are_separated() {
        let tri = floor_triangle();
        let lifted = tri.transformed(&Mat4::new_translation(&Vec3::new(0.0, 1.0, 0.0)));
        assert!(!tri.intersects_triangle(&lifted));
        assert_relative_eq!(tri.distance_to_triangle(&lifted), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_coplanar_triangles() {
        let tri = floor_triangle();
        let overlapping = tri.transformed(&Mat4::new_translation(&Vec3::new(0.2, 0.0, 0.2)));
        let disjoint = tri.transformed(&Mat4::new_translation(&Vec3::new(2.0, 0.0, 2.0)));
        assert!(tri.intersects_triangle(&overlapping));
        assert!(!tri.intersects_triangle(&disjoint));
    }

    #[test]
    fn test_degenerate_triangle_contact() {
        let tri = floor_triangle();
        let on_surface = ExtendedTriangle::new(
            Vec3::new(0.2, 0.0, 0.2),
            Vec3::new(0.2, 0.0, 0.2),
            Vec3::new(0.2, 0.0, 0.2),
        );
        let above = ExtendedTriangle::new(
            Vec3::new(0.2, 0.5, 0.2),
            Vec3::new(0.2, 0.5, 0.2),
            Vec3::new(0.2, 0.5, 0.2),
        );
        assert!(tri.intersects_triangle(&on_surface));
        assert!(!tri.intersects_triangle(&above));
        assert_relative_eq!(tri.distance_to_triangle(&above), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_segment_crossing() {
        let tri = floor_triangle();
        let through = Segment::new(Vec3::new(0.2, -1.0, 0.2), Vec3::new(0.2, 1.0, 0.2));
        let beside = Segment::new(Vec3::new(2.0, -1.0, 2.0), Vec3::new(2.0, 1.0, 2.0));
        assert_relative_eq!(tri.intersect_segment(&through).unwrap(), Vec3::new(0.2, 0.0, 0.2), epsilon = 1e-6);
        assert!(tri.intersect_segment(&beside).is_none());
    }
}
