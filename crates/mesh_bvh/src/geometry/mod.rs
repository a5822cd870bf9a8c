//! Geometric primitives and the pairwise tests the hierarchy is built on

pub mod aabb;
pub mod oriented_box;
pub mod primitives;
pub mod segment;
pub mod triangle;

pub use aabb::AABB;
pub use oriented_box::OrientedBox;
pub use primitives::{BoundingSphere, Ray};
pub use segment::Segment;
pub use triangle::{ExtendedTriangle, RayTriangleHit, Side};
