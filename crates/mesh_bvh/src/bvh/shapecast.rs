//! Generic callback-driven traversal
//!
//! A shapecast walks the hierarchy asking the caller whether each node's box
//! matters, then hands over whole leaf ranges or individual triangles. Any
//! callback can end the walk early; [`MeshBvh::shapecast`] returns `true` in
//! that case. The specialized queries (boxes, spheres, closest points) are
//! all built on this.

use crate::bvh::{node, MeshBvh};
use crate::geometry::{ExtendedTriangle, AABB};

/// Answer to "does the query touch this box?"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeIntersection {
    /// Skip the node and everything below it
    NotIntersected,
    /// Descend into the node
    Intersected,
    /// The whole subtree is inside the query; descendant boxes are not tested
    Contained,
}

/// What to do with a leaf range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeAction {
    /// Call the per-triangle callback for every triangle in the range
    VisitTriangles,
    /// The range is handled; keep traversing
    Continue,
    /// End the traversal
    Stop,
}

/// Callbacks driving [`MeshBvh::shapecast`]
pub trait ShapecastCallbacks {
    /// Priority score for a box; when both children have one, the lower score is visited first
    fn bounds_traverse_order(&mut self, _bounds: &AABB) -> Option<f32> {
        None
    }

    /// Classify a node's box against the query
    fn intersects_bounds(&mut self, bounds: &AABB, is_leaf: bool, score: Option<f32>, depth: u32) -> NodeIntersection;

    /// Called with each leaf range, or with the full range of a contained subtree
    ///
    /// `offset` and `count` are slots; map them with
    /// [`MeshBvh::resolve_triangle_index`] in indirect mode.
    fn intersects_range(&mut self, _offset: u32, _count: u32, _contained: bool, _depth: u32) -> RangeAction {
        RangeAction::VisitTriangles
    }

    /// Called per triangle when the range callback asks for it; return `true` to stop
    fn intersects_triangle(
        &mut self,
        _triangle: &ExtendedTriangle,
        _triangle_index: u32,
        _contained: bool,
        _depth: u32,
    ) -> bool {
        false
    }
}

impl MeshBvh {
    /// Walk the hierarchy under caller control; returns `true` if a callback stopped it
    pub fn shapecast<C: ShapecastCallbacks + ?Sized>(&self, callbacks: &mut C) -> bool {
        for buffer in &self.roots {
            let bounds = node::bounds(buffer, 0);
            let is_leaf = node::is_leaf(buffer, 0);
            let score = callbacks.bounds_traverse_order(&bounds);
            let stopped = match callbacks.intersects_bounds(&bounds, is_leaf, score, 0) {
                NodeIntersection::NotIntersected => false,
                NodeIntersection::Intersected => self.shapecast_node(buffer, 0, 0, callbacks),
                NodeIntersection::Contained => self.shapecast_contained(buffer, 0, 0, callbacks),
            };
            if stopped {
                return true;
            }
        }
        false
    }

    fn shapecast_node<C: ShapecastCallbacks + ?Sized>(
        &self,
        buffer: &[u32],
        index: usize,
        depth: u32,
        callbacks: &mut C,
    ) -> bool {
        if node::is_leaf(buffer, index) {
            let offset = node::leaf_offset(buffer, index);
            let count = node::leaf_count(buffer, index);
            return self.shapecast_range(offset, count, false, depth, callbacks);
        }

        let mut first = node::left_child(index);
        let mut second = node::right_child(buffer, index);
        let mut first_score = callbacks.bounds_traverse_order(&node::bounds(buffer, first));
        let mut second_score = callbacks.bounds_traverse_order(&node::bounds(buffer, second));
        if let (Some(a), Some(b)) = (first_score, second_score) {
            if b < a {
                std::mem::swap(&mut first, &mut second);
                std::mem::swap(&mut first_score, &mut second_score);
            }
        }

        for (child, score) in [(first, first_score), (second, second_score)] {
            // The second box test runs after the first subtree, against the caller's updated state
            let bounds = node::bounds(buffer, child);
            let is_leaf = node::is_leaf(buffer, child);
            let stopped = match callbacks.intersects_bounds(&bounds, is_leaf, score, depth + 1) {
                NodeIntersection::NotIntersected => false,
                NodeIntersection::Intersected => self.shapecast_node(buffer, child, depth + 1, callbacks),
                NodeIntersection::Contained => self.shapecast_contained(buffer, child, depth + 1, callbacks),
            };
            if stopped {
                return true;
            }
        }
        false
    }

    fn shapecast_contained<C: ShapecastCallbacks + ?Sized>(
        &self,
        buffer: &[u32],
        index: usize,
        depth: u32,
        callbacks: &mut C,
    ) -> bool {
        let (offset, count) = node::subtree_range(buffer, index);
        self.shapecast_range(offset, count, true, depth, callbacks)
    }

    fn shapecast_range<C: ShapecastCallbacks + ?Sized>(
        &self,
        offset: u32,
        count: u32,
        contained: bool,
        depth: u32,
        callbacks: &mut C,
    ) -> bool {
        match callbacks.intersects_range(offset, count, contained, depth) {
            RangeAction::Stop => true,
            RangeAction::Continue => false,
            RangeAction::VisitTriangles => (offset..offset + count).any(|slot| {
                let triangle = self.triangle_at_slot(slot);
                callbacks.intersects_triangle(&triangle, self.resolve_triangle_index(slot), contained, depth)
            }),
        }
    }
}
