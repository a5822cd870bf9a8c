//! # Mesh BVH
//!
//! A bounding volume hierarchy over indexed triangle meshes for fast spatial
//! queries in mesh-local space.
//!
//! ## Features
//!
//! - **Build**: center, average or SAH splits, one root per triangle group,
//!   optional indirect mode that leaves the index buffer untouched
//! - **Raycast**: all hits or nearest hit, with interpolated normals and uvs
//! - **Shapecast**: callback-driven traversal that every other query builds on
//! - **Overlap**: oriented boxes, spheres, other meshes and other hierarchies
//! - **Closest point**: to a point or to another mesh
//! - **Refit**: repair boxes after vertices move, optionally only where dirty
//! - **Serialize**: flat node buffers that round-trip exactly
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mesh_bvh::prelude::*;
//!
//! fn main() -> Result<(), BvhError> {
//!     let geometry = mesh_bvh::mesh::shapes::icosphere(1.0, 2)?;
//!     let bvh = MeshBvh::build(geometry, &BuildOptions::with_strategy(SplitStrategy::Sah))?;
//!
//!     let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::new(0.0, 0.0, -1.0));
//!     if let Some(hit) = bvh.raycast_first(&ray, 0.0, f32::INFINITY) {
//!         println!("hit triangle {} at {}", hit.triangle_index, hit.distance);
//!     }
//!     Ok(())
//! }
//! ```

pub mod foundation;
pub mod config;
pub mod geometry;
pub mod mesh;
pub mod bvh;

pub use bvh::{BvhError, MeshBvh};

/// Common imports for library users
pub mod prelude {
    pub use crate::{
        bvh::{
            BuildOptions, BvhError, BvhStats, BvhcastCallbacks, ClosestPointOptions, DeserializeOptions,
            GeometryHit, Hit, MeshBvh, NodeIntersection, NodeVisit, PointHit, RangeAction, RaycastOptions,
            SahParameters, SerializedBvh, ShapecastCallbacks, SplitStrategy,
        },
        config::{Config, ConfigError, ConfigFormat},
        foundation::math::{Mat4, Transform, Vec2, Vec3},
        geometry::{BoundingSphere, ExtendedTriangle, OrientedBox, Ray, Side, AABB},
        mesh::{GeometryError, IndexBuffer, MeshGeometry, TriangleRange},
    };
}
