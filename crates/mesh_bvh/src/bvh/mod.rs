//! Bounding volume hierarchy over a triangle mesh
//!
//! [`MeshBvh`] owns its [`MeshGeometry`] and one flat node buffer per root
//! range (see [`node`] for the encoding). Queries run in the mesh's local
//! space; mesh-vs-mesh queries take a matrix mapping the other mesh into it.
//!
//! Triangle *slots* are positions in the hierarchy's leaf order. Outside
//! indirect mode the build reorders the index buffer so slot `i` is triangle
//! `i`. In indirect mode the geometry is left untouched and slot `i` maps to
//! triangle `indirect_buffer[i]`. Queries always report triangle indices of
//! the geometry as stored.

pub mod build;
pub mod bvhcast;
pub mod closest_point;
pub mod intersects;
pub mod node;
pub mod raycast;
pub mod refit;
pub mod serialize;
pub mod shapecast;
pub mod split;

#[cfg(test)]
mod tests;

pub use build::BuildOptions;
pub use bvhcast::BvhcastCallbacks;
pub use closest_point::{ClosestPointOptions, GeometryHit, PointHit};
pub use raycast::{Hit, RaycastOptions};
pub use serialize::{DeserializeOptions, SerializedBvh};
pub use shapecast::{NodeIntersection, RangeAction, ShapecastCallbacks};
pub use split::{SahParameters, SplitStrategy};

use crate::foundation::math::Vec3;
use crate::geometry::{ExtendedTriangle, AABB};
use crate::mesh::{GeometryError, MeshGeometry, TriangleRange};

/// Hierarchy errors
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BvhError {
    /// The geometry failed validation
    #[error("Invalid geometry: {0}")]
    Geometry(#[from] GeometryError),

    /// Serialized node data is inconsistent with itself or the geometry
    #[error("Invalid serialized data: {0}")]
    InvalidSerializedData(String),

    /// No triangles fall inside the requested ranges
    #[error("No triangles to build a hierarchy over")]
    EmptyHierarchy,
}

/// A node as seen by [`MeshBvh::traverse`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeVisit {
    /// Root the node belongs to
    pub root: usize,
    /// Word offset of the node within its root buffer
    pub node: usize,
    /// Depth below the root (root = 0)
    pub depth: u32,
    /// Node bounds
    pub bounds: AABB,
    /// Slot range for leaves, `None` for internal nodes
    pub leaf: Option<TriangleRange>,
}

/// Shape summary of a built hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BvhStats {
    /// Number of roots
    pub roots: usize,
    /// Number of nodes across all roots
    pub nodes: usize,
    /// Number of leaves
    pub leaves: usize,
    /// Deepest node depth
    pub max_depth: u32,
    /// Largest leaf triangle count
    pub max_leaf_triangles: u32,
    /// Triangles referenced by leaves
    pub triangles: usize,
}

/// Triangle mesh plus its bounding volume hierarchy
#[derive(Debug, Clone, PartialEq)]
pub struct MeshBvh {
    geometry: MeshGeometry,
    roots: Vec<Vec<u32>>,
    indirect_buffer: Option<Vec<u32>>,
}

impl MeshBvh {
    /// The indexed geometry (index buffer reordered outside indirect mode)
    pub fn geometry(&self) -> &MeshGeometry {
        &self.geometry
    }

    /// Mutable vertex positions; call [`MeshBvh::refit`] after changing them
    pub fn positions_mut(&mut self) -> &mut [Vec3] {
        self.geometry.positions_mut()
    }

    /// Give up the hierarchy and return the geometry
    pub fn into_geometry(self) -> MeshGeometry {
        self.geometry
    }

    /// Flat node buffers, one per root range
    pub fn roots(&self) -> &[Vec<u32>] {
        &self.roots
    }

    /// True if built in indirect mode
    pub fn is_indirect(&self) -> bool {
        self.indirect_buffer.is_some()
    }

    /// Slot-to-triangle table in indirect mode
    pub fn indirect_buffer(&self) -> Option<&[u32]> {
        self.indirect_buffer.as_deref()
    }

    /// Triangle index stored at a slot
    #[inline]
    pub fn resolve_triangle_index(&self, slot: u32) -> u32 {
        resolve(self.indirect_buffer.as_deref(), slot)
    }

    /// The triangle at a slot
    #[inline]
    pub fn triangle_at_slot(&self, slot: u32) -> ExtendedTriangle {
        self.geometry.triangle(self.resolve_triangle_index(slot) as usize)
    }

    /// Union of all root bounds
    pub fn bounding_box(&self) -> AABB {
        self.roots
            .iter()
            .fold(AABB::empty(), |acc, root| acc.union(&node::bounds(root, 0)))
    }

    /// Depth-first walk over every node
    ///
    /// Returning `true` from `visit` skips the node's children.
    pub fn traverse<F: FnMut(&NodeVisit) -> bool>(&self, mut visit: F) {
        for (root, buffer) in self.roots.iter().enumerate() {
            let mut stack = vec![(0_usize, 0_u32)];
            while let Some((index, depth)) = stack.pop() {
                let leaf = node::is_leaf(buffer, index).then(|| {
                    TriangleRange::new(node::leaf_offset(buffer, index), node::leaf_count(buffer, index))
                });
                let info = NodeVisit {
                    root,
                    node: index,
                    depth,
                    bounds: node::bounds(buffer, index),
                    leaf,
                };
                let skip = visit(&info);
                if leaf.is_none() && !skip {
                    stack.push((node::right_child(buffer, index), depth + 1));
                    stack.push((node::left_child(index), depth + 1));
                }
            }
        }
    }

    /// Node, leaf and depth counts
    pub fn stats(&self) -> BvhStats {
        let mut stats = BvhStats {
            roots: self.roots.len(),
            ..Default::default()
        };
        self.traverse(|visit| {
            stats.nodes += 1;
            stats.max_depth = stats.max_depth.max(visit.depth);
            if let Some(range) = visit.leaf {
                stats.leaves += 1;
                stats.triangles += range.count as usize;
                stats.max_leaf_triangles = stats.max_leaf_triangles.max(range.count);
            }
            false
        });
        stats
    }
}

#[inline]
pub(crate) fn resolve(indirect: Option<&[u32]>, slot: u32) -> u32 {
    match indirect {
        Some(table) => table[slot as usize],
        None => slot,
    }
}
