//! Bottom-up box repair after vertex motion
//!
//! Topology stays fixed: only node boxes change. A parent box is rebuilt
//! only when one of its children actually changed, so a refit after a small
//! local edit touches a single path per dirty leaf.

use std::collections::HashSet;

use log::debug;

use crate::bvh::{node, resolve, MeshBvh};
use crate::geometry::AABB;
use crate::mesh::MeshGeometry;

struct Refit<'a> {
    geometry: &'a MeshGeometry,
    indirect: Option<&'a [u32]>,
    dirty: Option<&'a HashSet<u32>>,
    updated: usize,
}

impl Refit<'_> {
    /// Returns `true` if the node's box changed
    fn node(&mut self, buffer: &mut [u32], index: usize) -> bool {
        let bounds = if node::is_leaf(buffer, index) {
            let offset = node::leaf_offset(buffer, index);
            let slots = offset..offset + node::leaf_count(buffer, index);
            if let Some(dirty) = self.dirty {
                if !slots.clone().any(|slot| dirty.contains(&resolve(self.indirect, slot))) {
                    return false;
                }
            }
            slots.fold(AABB::empty(), |mut acc, slot| {
                let triangle = resolve(self.indirect, slot) as usize;
                for vertex in &self.geometry.triangle_vertices(triangle) {
                    acc.expand_by_point(vertex);
                }
                acc
            })
        } else {
            let left = node::left_child(index);
            let right = node::right_child(buffer, index);
            let left_changed = self.node(buffer, left);
            let right_changed = self.node(buffer, right);
            if !left_changed && !right_changed {
                return false;
            }
            node::bounds(buffer, left).union(&node::bounds(buffer, right))
        };

        if bounds == node::bounds(buffer, index) {
            return false;
        }
        node::set_bounds(buffer, index, &bounds);
        self.updated += 1;
        true
    }
}

impl MeshBvh {
    /// Recompute node boxes from the current vertex positions
    ///
    /// With `dirty_triangles`, only leaves holding one of those triangles are
    /// recomputed; the set holds triangle indices as queries report them.
    /// Moving a vertex shared with a triangle outside the set leaves that
    /// triangle's leaf stale.
    pub fn refit(&mut self, dirty_triangles: Option<&HashSet<u32>>) {
        let Self {
            geometry,
            roots,
            indirect_buffer,
        } = self;

        let mut refit = Refit {
            geometry,
            indirect: indirect_buffer.as_deref(),
            dirty: dirty_triangles,
            updated: 0,
        };
        for buffer in roots.iter_mut() {
            refit.node(buffer, 0);
        }

        debug!(
            "Refit BVH: {} nodes updated ({})",
            refit.updated,
            dirty_triangles.map_or_else(|| "full".to_string(), |dirty| format!("{} dirty triangles", dirty.len()))
        );
    }
}
