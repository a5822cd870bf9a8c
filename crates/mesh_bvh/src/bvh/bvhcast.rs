//! Tree-vs-tree traversal
//!
//! Walks two hierarchies at once. Node boxes of the other tree are carried
//! into this tree's space as oriented boxes, so neither tree is rebuilt.
//! When both sides reach leaves the callbacks receive the leaf ranges and
//! then every triangle pair, with the other tree's triangles transformed.

use crate::bvh::shapecast::RangeAction;
use crate::bvh::{node, MeshBvh};
use crate::foundation::math::Mat4;
use crate::geometry::{ExtendedTriangle, OrientedBox};

/// Callbacks driving [`MeshBvh::bvhcast`]
pub trait BvhcastCallbacks {
    /// Called for each pair of overlapping leaves, with slot ranges of both trees
    fn intersects_ranges(
        &mut self,
        _offset_a: u32,
        _count_a: u32,
        _offset_b: u32,
        _count_b: u32,
        _depth_a: u32,
        _depth_b: u32,
    ) -> RangeAction {
        RangeAction::VisitTriangles
    }

    /// Called per triangle pair; `triangle_b` is already in this tree's space.
    /// Return `true` to stop.
    fn intersects_triangles(
        &mut self,
        _triangle_a: &ExtendedTriangle,
        _triangle_b: &ExtendedTriangle,
        _index_a: u32,
        _index_b: u32,
        _depth_a: u32,
        _depth_b: u32,
    ) -> bool {
        false
    }
}

struct DualCast<'a> {
    bvh_a: &'a MeshBvh,
    bvh_b: &'a MeshBvh,
    buffer_a: &'a [u32],
    buffer_b: &'a [u32],
    matrix: &'a Mat4,
}

impl DualCast<'_> {
    fn overlaps(&self, node_a: usize, node_b: usize) -> bool {
        OrientedBox::new(node::bounds(self.buffer_b, node_b), *self.matrix)
            .intersects_aabb(&node::bounds(self.buffer_a, node_a))
    }

    fn descend<C: BvhcastCallbacks + ?Sized>(
        &self,
        node_a: usize,
        depth_a: u32,
        node_b: usize,
        depth_b: u32,
        callbacks: &mut C,
    ) -> bool {
        let leaf_a = node::is_leaf(self.buffer_a, node_a);
        let leaf_b = node::is_leaf(self.buffer_b, node_b);
        if leaf_a && leaf_b {
            return self.leaf_pair(node_a, depth_a, node_b, depth_b, callbacks);
        }

        // Split the larger internal node; leaves are never split
        let split_a = if leaf_a {
            false
        } else if leaf_b {
            true
        } else {
            let area_a = node::bounds(self.buffer_a, node_a).surface_area();
            let area_b = node::bounds(self.buffer_b, node_b)
                .transformed(self.matrix)
                .surface_area();
            area_a >= area_b
        };

        if split_a {
            for child in [node::left_child(node_a), node::right_child(self.buffer_a, node_a)] {
                if self.overlaps(child, node_b) && self.descend(child, depth_a + 1, node_b, depth_b, callbacks) {
                    return true;
                }
            }
        } else {
            for child in [node::left_child(node_b), node::right_child(self.buffer_b, node_b)] {
                if self.overlaps(node_a, child) && self.descend(node_a, depth_a, child, depth_b + 1, callbacks) {
                    return true;
                }
            }
        }
        false
    }

    fn leaf_pair<C: BvhcastCallbacks + ?Sized>(
        &self,
        node_a: usize,
        depth_a: u32,
        node_b: usize,
        depth_b: u32,
        callbacks: &mut C,
    ) -> bool {
        let offset_a = node::leaf_offset(self.buffer_a, node_a);
        let count_a = node::leaf_count(self.buffer_a, node_a);
        let offset_b = node::leaf_offset(self.buffer_b, node_b);
        let count_b = node::leaf_count(self.buffer_b, node_b);

        match callbacks.intersects_ranges(offset_a, count_a, offset_b, count_b, depth_a, depth_b) {
            RangeAction::Stop => true,
            RangeAction::Continue => false,
            RangeAction::VisitTriangles => {
                let others: Vec<(ExtendedTriangle, u32)> = (offset_b..offset_b + count_b)
                    .map(|slot| {
                        let triangle = self.bvh_b.triangle_at_slot(slot).transformed(self.matrix);
                        (triangle, self.bvh_b.resolve_triangle_index(slot))
                    })
                    .collect();

                for slot in offset_a..offset_a + count_a {
                    let triangle_a = self.bvh_a.triangle_at_slot(slot);
                    let index_a = self.bvh_a.resolve_triangle_index(slot);
                    for (triangle_b, index_b) in &others {
                        if callbacks.intersects_triangles(&triangle_a, triangle_b, index_a, *index_b, depth_a, depth_b) {
                            return true;
                        }
                    }
                }
                false
            }
        }
    }
}

impl MeshBvh {
    /// Walk this tree against `other`, placed in this tree's space by `other_to_bvh`
    ///
    /// Returns `true` if a callback stopped the walk.
    pub fn bvhcast<C: BvhcastCallbacks + ?Sized>(&self, other: &Self, other_to_bvh: &Mat4, callbacks: &mut C) -> bool {
        for buffer_a in &self.roots {
            for buffer_b in &other.roots {
                let cast = DualCast {
                    bvh_a: self,
                    bvh_b: other,
                    buffer_a,
                    buffer_b,
                    matrix: other_to_bvh,
                };
                if cast.overlaps(0, 0) && cast.descend(0, 0, 0, 0, callbacks) {
                    return true;
                }
            }
        }
        false
    }
}
