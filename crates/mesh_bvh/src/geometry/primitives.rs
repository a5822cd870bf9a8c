//! Primitive query shapes
//!
//! Rays and spheres handed to the hierarchy queries, with the box tests the
//! traversal needs to prune nodes.

use crate::foundation::math::{transform_point, transform_vector, Mat4, Vec3};
use crate::geometry::aabb::AABB;

/// A ray for ray casting and picking
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// The origin point of the ray
    pub origin: Vec3,
    /// The direction of the ray (normalized on construction)
    pub direction: Vec3,
}

impl Ray {
    /// Creates a new ray with the given origin and direction
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize(),
        }
    }

    /// Get a point along the ray at distance t
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Component-wise reciprocal of the direction, infinite on zero components
    pub fn inverse_direction(&self) -> Vec3 {
        self.direction.map(f32::recip)
    }

    /// Move the ray into another space
    ///
    /// The direction is renormalized, so distances reported against the
    /// transformed ray are measured in the target space.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        Self::new(
            transform_point(matrix, &self.origin),
            transform_vector(matrix, &self.direction),
        )
    }
}

/// A bounding sphere for proximity queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// The center position of the sphere
    pub center: Vec3,
    /// The radius of the sphere
    pub radius: f32,
}

impl BoundingSphere {
    /// Creates a new bounding sphere with the given center and radius
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Check if a point lies inside or on the sphere
    pub fn contains_point(&self, point: &Vec3) -> bool {
        (point - self.center).magnitude_squared() <= self.radius * self.radius
    }

    /// Check if the sphere touches a box
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        aabb.distance_sq_to_point(&self.center) <= self.radius * self.radius
    }

    /// Check if every corner of the box lies inside the sphere
    pub fn contains_aabb(&self, aabb: &AABB) -> bool {
        aabb.corners().iter().all(|corner| self.contains_point(corner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ray_normalizes_direction() {
        let ray = Ray::new(Vec3::zeros(), Vec3::new(0.0, 3.0, 4.0));
        assert_relative_eq!(ray.direction.magnitude(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(ray.point_at(5.0), Vec3::new(0.0, 3.0, 4.0), epsilon = 1e-5);
    }

    #[test]
    fn test_sphere_box_relations() {
        let sphere = BoundingSphere::new(Vec3::zeros(), 1.0);
        let inside = AABB::from_center_extents(Vec3::zeros(), Vec3::repeat(0.5));
        let straddling = AABB::from_center_extents(Vec3::new(1.2, 0.0, 0.0), Vec3::repeat(0.5));
        let outside = AABB::from_center_extents(Vec3::new(3.0, 0.0, 0.0), Vec3::repeat(0.5));

        assert!(sphere.contains_aabb(&inside));
        assert!(sphere.intersects_aabb(&straddling));
        assert!(!sphere.contains_aabb(&straddling));
        assert!(!sphere.intersects_aabb(&outside));
    }
}
