//! Oriented bounding boxes
//!
//! An [`OrientedBox`] is a local-space box placed by an affine matrix. It is
//! used to test another mesh's bounds, or a query box, against the
//! axis-aligned nodes of a hierarchy without rotating the hierarchy.

use crate::foundation::math::{transform_point, Mat4, Vec3};
use crate::geometry::aabb::AABB;
use crate::geometry::triangle::{project, separated, ExtendedTriangle};

/// Relative tolerance for treating a cross product as zero
const PARALLEL_TOLERANCE: f32 = 1e-12;

/// A box with its own orientation, stored as transformed corners plus cached
/// separating axes
#[derive(Debug, Clone, PartialEq)]
pub struct OrientedBox {
    /// Local-space extent of the box
    pub local: AABB,
    /// Local-to-target transform
    pub matrix: Mat4,
    inverse: Option<Mat4>,
    points: [Vec3; 8],
    /// Images of the local x, y and z directions
    edges: [Vec3; 3],
    /// Face normals of the transformed box
    normals: [Vec3; 3],
    normal_bounds: [(f32, f32); 3],
}

impl OrientedBox {
    /// Place `local` with `matrix`
    pub fn new(local: AABB, matrix: Mat4) -> Self {
        let points = local.corners().map(|corner| transform_point(&matrix, &corner));

        // Corner bit 0/1/2 selects max on x/y/z, so these differences span the box
        let edges = [points[1] - points[0], points[2] - points[0], points[4] - points[0]];
        let normals = [
            edges[1].cross(&edges[2]),
            edges[2].cross(&edges[0]),
            edges[0].cross(&edges[1]),
        ];
        let normal_bounds = normals.map(|axis| project(&points, &axis));

        Self {
            local,
            matrix,
            inverse: matrix.try_inverse(),
            points,
            edges,
            normals,
            normal_bounds,
        }
    }

    /// Axis-aligned bounds of the transformed box
    pub fn bounding_box(&self) -> AABB {
        AABB::from_points(self.points.iter())
    }

    /// Check if a point lies inside the box
    ///
    /// Boxes flattened by a singular matrix contain nothing.
    pub fn contains_point(&self, point: &Vec3) -> bool {
        self.inverse
            .is_some_and(|inverse| self.local.contains_point(&transform_point(&inverse, point)))
    }

    /// Check if every corner of `aabb` lies inside the box
    pub fn contains_aabb(&self, aabb: &AABB) -> bool {
        aabb.corners().iter().all(|corner| self.contains_point(corner))
    }

    /// Separating-axis test against an axis-aligned box
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        // World axes: compare the transformed corners with the box slabs
        let own = self.bounding_box();
        if !own.intersects(aabb) {
            return false;
        }

        let corners = aabb.corners();
        for (axis, bounds) in self.normals.iter().zip(&self.normal_bounds) {
            if separated(*bounds, project(&corners, axis)) {
                return false;
            }
        }

        for edge in &self.edges {
            for world_axis in [Vec3::x(), Vec3::y(), Vec3::z()] {
                let axis = edge.cross(&world_axis);
                if axis.magnitude_squared() <= PARALLEL_TOLERANCE * edge.magnitude_squared() {
                    continue;
                }
                if separated(project(&self.points, &axis), project(&corners, &axis)) {
                    return false;
                }
            }
        }

        true
    }

    /// Separating-axis test against a triangle
    pub fn intersects_triangle(&self, triangle: &ExtendedTriangle) -> bool {
        let vertices = triangle.vertices();
        if !self.bounding_box().intersects(&triangle.bounding_box()) {
            return false;
        }

        for (axis, bounds) in self.normals.iter().zip(&self.normal_bounds) {
            if separated(*bounds, project(&vertices, axis)) {
                return false;
            }
        }

        let normal = triangle.normal();
        if !triangle.is_degenerate()
            && separated(project(&self.points, &normal), project(&vertices, &normal))
        {
            return false;
        }

        for edge in &self.edges {
            for triangle_edge in triangle.edges() {
                let axis = edge.cross(triangle_edge);
                let scale = edge.magnitude_squared() * triangle_edge.magnitude_squared();
                if axis.magnitude_squared() <= PARALLEL_TOLERANCE * scale {
                    continue;
                }
                if separated(project(&self.points, &axis), project(&vertices, &axis)) {
                    return false;
                }
            }
        }

        true
    }
}
