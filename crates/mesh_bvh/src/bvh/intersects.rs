//! Boolean overlap queries: boxes, spheres and other meshes

use crate::bvh::bvhcast::BvhcastCallbacks;
use crate::bvh::shapecast::{NodeIntersection, RangeAction, ShapecastCallbacks};
use crate::bvh::MeshBvh;
use crate::foundation::math::Mat4;
use crate::geometry::{BoundingSphere, ExtendedTriangle, OrientedBox, AABB};
use crate::mesh::MeshGeometry;

struct BoxQuery {
    obb: OrientedBox,
}

impl ShapecastCallbacks for BoxQuery {
    fn intersects_bounds(&mut self, bounds: &AABB, _: bool, _: Option<f32>, _: u32) -> NodeIntersection {
        if !self.obb.intersects_aabb(bounds) {
            NodeIntersection::NotIntersected
        } else if self.obb.contains_aabb(bounds) {
            NodeIntersection::Contained
        } else {
            NodeIntersection::Intersected
        }
    }

    fn intersects_range(&mut self, _: u32, count: u32, contained: bool, _: u32) -> RangeAction {
        // Every triangle inside a contained box is inside the query
        if contained && count > 0 {
            RangeAction::Stop
        } else {
            RangeAction::VisitTriangles
        }
    }

    fn intersects_triangle(&mut self, triangle: &ExtendedTriangle, _: u32, _: bool, _: u32) -> bool {
        self.obb.intersects_triangle(triangle)
    }
}

struct SphereQuery {
    sphere: BoundingSphere,
}

impl ShapecastCallbacks for SphereQuery {
    fn intersects_bounds(&mut self, bounds: &AABB, _: bool, _: Option<f32>, _: u32) -> NodeIntersection {
        if !self.sphere.intersects_aabb(bounds) {
            NodeIntersection::NotIntersected
        } else if self.sphere.contains_aabb(bounds) {
            NodeIntersection::Contained
        } else {
            NodeIntersection::Intersected
        }
    }

    fn intersects_range(&mut self, _: u32, count: u32, contained: bool, _: u32) -> RangeAction {
        if contained && count > 0 {
            RangeAction::Stop
        } else {
            RangeAction::VisitTriangles
        }
    }

    fn intersects_triangle(&mut self, triangle: &ExtendedTriangle, _: u32, _: bool, _: u32) -> bool {
        triangle.intersects_sphere(&self.sphere)
    }
}

/// Another mesh's triangles, already moved into this hierarchy's space
struct GeometryQuery {
    obb: OrientedBox,
    bounds: AABB,
    triangles: Vec<(ExtendedTriangle, AABB)>,
}

impl ShapecastCallbacks for GeometryQuery {
    fn intersects_bounds(&mut self, bounds: &AABB, _: bool, _: Option<f32>, _: u32) -> NodeIntersection {
        if self.bounds.intersects(bounds) && self.obb.intersects_aabb(bounds) {
            NodeIntersection::Intersected
        } else {
            NodeIntersection::NotIntersected
        }
    }

    fn intersects_triangle(&mut self, triangle: &ExtendedTriangle, _: u32, _: bool, _: u32) -> bool {
        let triangle_bounds = triangle.bounding_box();
        if !self.bounds.intersects(&triangle_bounds) {
            return false;
        }
        self.triangles
            .iter()
            .any(|(other, other_bounds)| other_bounds.intersects(&triangle_bounds) && triangle.intersects_triangle(other))
    }
}

struct TriangleOverlap;

impl BvhcastCallbacks for TriangleOverlap {
    fn intersects_triangles(
        &mut self,
        triangle_a: &ExtendedTriangle,
        triangle_b: &ExtendedTriangle,
        _: u32,
        _: u32,
        _: u32,
        _: u32,
    ) -> bool {
        triangle_a.intersects_triangle(triangle_b)
    }
}

impl MeshBvh {
    /// Does a box, placed in this mesh's space by `box_to_bvh`, touch the mesh?
    pub fn intersects_box(&self, aabb: &AABB, box_to_bvh: &Mat4) -> bool {
        let mut query = BoxQuery {
            obb: OrientedBox::new(*aabb, *box_to_bvh),
        };
        self.shapecast(&mut query)
    }

    /// Does the sphere touch the mesh surface?
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        let mut query = SphereQuery { sphere: *sphere };
        self.shapecast(&mut query)
    }

    /// Does any triangle of `geometry`, placed by `geometry_to_bvh`, touch this mesh?
    ///
    /// Checks every triangle pair under overlapping leaves; prefer
    /// [`MeshBvh::intersects_bvh`] when the other mesh has a hierarchy.
    pub fn intersects_geometry(&self, geometry: &MeshGeometry, geometry_to_bvh: &Mat4) -> bool {
        let triangles: Vec<(ExtendedTriangle, AABB)> = geometry
            .transformed_triangles(geometry_to_bvh)
            .into_iter()
            .map(|triangle| {
                let bounds = triangle.bounding_box();
                (triangle, bounds)
            })
            .collect();
        let bounds = triangles
            .iter()
            .fold(AABB::empty(), |acc, (_, b)| acc.union(b));

        let mut query = GeometryQuery {
            obb: OrientedBox::new(geometry.bounding_box(), *geometry_to_bvh),
            bounds,
            triangles,
        };
        self.shapecast(&mut query)
    }

    /// Does `other`, placed by `other_to_bvh`, touch this mesh?
    pub fn intersects_bvh(&self, other: &Self, other_to_bvh: &Mat4) -> bool {
        self.bvhcast(other, other_to_bvh, &mut TriangleOverlap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::mesh::shapes::{box_geometry, icosphere};

    fn cube() -> MeshBvh {
        MeshBvh::build_default(box_geometry(1.0, 1.0, 1.0).unwrap()).unwrap()
    }

    #[test]
    fn test_box_queries() {
        let bvh = cube();
        let small = AABB::from_center_extents(Vec3::zeros(), Vec3::repeat(0.1));

        // Fully inside the hollow cube: touches no triangle
        assert!(!bvh.intersects_box(&small, &Mat4::identity()));

        // Straddling the +x face
        let on_face = Mat4::new_translation(&Vec3::new(0.5, 0.0, 0.0));
        assert!(bvh.intersects_box(&small, &on_face));

        // Rotated box off the +x+y edge: its axis-aligned bounds overlap the cube, the box does not
        let rotated = Mat4::new_translation(&Vec3::new(0.75, 0.75, 0.0))
            * Mat4::from_axis_angle(&Vec3::z_axis(), std::f32::consts::FRAC_PI_4);
        let thin = AABB::from_center_extents(Vec3::zeros(), Vec3::new(0.3, 0.1, 0.3));
        assert!(thin.transformed(&rotated).intersects(&bvh.bounding_box()));
        assert!(!bvh.intersects_box(&thin, &rotated));

        // Enclosing box: whole tree contained
        let big = AABB::from_center_extents(Vec3::zeros(), Vec3::repeat(2.0));
        assert!(bvh.intersects_box(&big, &Mat4::identity()));
    }

    #[test]
    fn test_sphere_queries() {
        let bvh = cube();
        assert!(!bvh.intersects_sphere(&BoundingSphere::new(Vec3::zeros(), 0.3)));
        assert!(bvh.intersects_sphere(&BoundingSphere::new(Vec3::zeros(), 0.6)));
        assert!(bvh.intersects_sphere(&BoundingSphere::new(Vec3::zeros(), 5.0)));
        assert!(bvh.intersects_sphere(&BoundingSphere::new(Vec3::new(1.0, 0.0, 0.0), 0.51)));
        assert!(!bvh.intersects_sphere(&BoundingSphere::new(Vec3::new(1.0, 0.0, 0.0), 0.49)));
    }

    #[test]
    fn test_geometry_and_bvh_queries_agree() {
        let bvh = MeshBvh::build_default(icosphere(1.0, 1).unwrap()).unwrap();
        let other_geometry = icosphere(1.0, 1).unwrap();
        let other = MeshBvh::build_default(other_geometry.clone()).unwrap();

        for (distance, expected) in [(1.5, true), (1.95, true), (2.5, false), (3.0, false)] {
            let matrix = Mat4::new_translation(&Vec3::new(distance, 0.0, 0.0));
            assert_eq!(bvh.intersects_geometry(&other_geometry, &matrix), expected, "geometry at {distance}");
            assert_eq!(bvh.intersects_bvh(&other, &matrix), expected, "bvh at {distance}");
        }
    }
}
