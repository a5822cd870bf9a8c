//! Hierarchy construction
//!
//! Each root range is built top-down by recursive in-place partitioning of
//! the triangle slots: either the index buffer's triangle triples or, in
//! indirect mode, a separate slot-to-triangle table. Nodes are emitted
//! depth-first straight into the flat root buffer.

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::bvh::node::{self, NODE_WORDS};
use crate::bvh::split::{self, choose_split, SahParameters, Split, SplitStrategy, TriangleBounds};
use crate::bvh::{BvhError, MeshBvh};
use crate::config::Config;
use crate::foundation::math::Vec3;
use crate::geometry::AABB;
use crate::mesh::{IndexBuffer, MeshGeometry, TriangleRange};

/// Hierarchy build settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Split plane selection
    pub strategy: SplitStrategy,
    /// Depth at which nodes become leaves regardless of size
    pub max_depth: u32,
    /// Ranges at or below this many triangles become leaves
    pub max_leaf_triangles: u32,
    /// Reorder a slot table instead of the geometry's index buffer
    pub indirect: bool,
    /// Log build problems (depth cap reached, range fixes) as warnings
    pub verbose: bool,
    /// Explicit root ranges; defaults to the geometry's groups, then the whole mesh
    pub ranges: Option<Vec<TriangleRange>>,
    /// Surface area heuristic tuning
    pub sah: SahParameters,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            strategy: SplitStrategy::Center,
            max_depth: 40,
            max_leaf_triangles: 10,
            indirect: false,
            verbose: true,
            ranges: None,
            sah: SahParameters::default(),
        }
    }
}

impl Config for BuildOptions {}

impl BuildOptions {
    /// Options with the given split strategy
    pub fn with_strategy(strategy: SplitStrategy) -> Self {
        Self {
            strategy,
            ..Default::default()
        }
    }
}

/// Where partition swaps are applied
enum Slots<'a> {
    Index(&'a mut IndexBuffer),
    Indirect(&'a mut [u32]),
}

struct Builder<'a> {
    options: &'a BuildOptions,
    bounds: Vec<TriangleBounds>,
    slots: Slots<'a>,
    depth_capped: bool,
}

impl MeshBvh {
    /// Build a hierarchy over `geometry`, taking ownership of it
    ///
    /// Outside indirect mode a non-indexed mesh is given a sequential index
    /// first, and the index buffer is reordered in place.
    pub fn build(mut geometry: MeshGeometry, options: &BuildOptions) -> Result<Self, BvhError> {
        geometry.validate()?;

        if !options.indirect && geometry.ensure_index() {
            debug!("Created sequential index for {} vertices", geometry.vertex_count());
        }

        let triangle_count = geometry.triangle_count();
        let ranges = root_ranges(triangle_count, geometry.groups(), options);
        if ranges.is_empty() {
            return Err(BvhError::EmptyHierarchy);
        }

        let bounds = triangle_bounds(&geometry);
        let mut indirect_buffer = options
            .indirect
            .then(|| (0..triangle_count as u32).collect::<Vec<u32>>());

        let slots = match indirect_buffer.as_deref_mut() {
            Some(table) => Slots::Indirect(table),
            None => Slots::Index(geometry.index_mut().ok_or(BvhError::EmptyHierarchy)?),
        };

        let mut builder = Builder {
            options,
            bounds,
            slots,
            depth_capped: false,
        };

        let roots: Vec<Vec<u32>> = ranges
            .iter()
            .map(|range| {
                let mut buffer = Vec::new();
                builder.build_node(&mut buffer, range.offset as usize, range.count as usize, 0);
                trace!(
                    "Root over triangles {}..{}: {} nodes",
                    range.offset,
                    range.offset + range.count,
                    buffer.len() / NODE_WORDS
                );
                buffer
            })
            .collect();

        if builder.depth_capped && options.verbose {
            warn!(
                "BVH reached max depth {} with ranges above {} triangles; leaves were forced",
                options.max_depth, options.max_leaf_triangles
            );
        }

        let bvh = Self {
            geometry,
            roots,
            indirect_buffer,
        };

        let stats = bvh.stats();
        debug!(
            "Built BVH ({:?}): {} triangles, {} roots, {} nodes, {} leaves, depth {}",
            options.strategy, stats.triangles, stats.roots, stats.nodes, stats.leaves, stats.max_depth
        );

        Ok(bvh)
    }

    /// Build with [`BuildOptions::default`]
    pub fn build_default(geometry: MeshGeometry) -> Result<Self, BvhError> {
        Self::build(geometry, &BuildOptions::default())
    }
}

impl Builder<'_> {
    fn build_node(&mut self, buffer: &mut Vec<u32>, offset: usize, count: usize, depth: u32) {
        let node = buffer.len();
        buffer.resize(node + NODE_WORDS, 0);

        let (aabb, centroids) = self.range_bounds(offset, count);

        let small = count <= self.options.max_leaf_triangles as usize;
        let too_deep = depth >= self.options.max_depth;
        if too_deep && !small {
            self.depth_capped = true;
        }

        let split = if small || too_deep {
            None
        } else {
            choose_split(
                self.options.strategy,
                &aabb,
                &centroids,
                &self.bounds[offset..offset + count],
                &self.options.sah,
            )
        };

        let Some(split) = split else {
            node::write_leaf(buffer, node, &aabb, offset as u32, count as u32);
            return;
        };

        let mid = self.partition(offset, count, split);
        if mid == offset || mid == offset + count {
            node::write_leaf(buffer, node, &aabb, offset as u32, count as u32);
            return;
        }

        self.build_node(buffer, offset, mid - offset, depth + 1);
        let right = buffer.len();
        self.build_node(buffer, mid, offset + count - mid, depth + 1);
        node::write_internal(buffer, node, &aabb, right, split.axis);
    }

    /// Bounds of the triangles and of their centroids
    fn range_bounds(&self, offset: usize, count: usize) -> (AABB, AABB) {
        let mut aabb = AABB::empty();
        let mut centroids = AABB::empty();
        for b in &self.bounds[offset..offset + count] {
            aabb.expand_by_box(&split::to_aabb(b));
            centroids.expand_by_point(&Vec3::new(
                split::centroid(b, 0),
                split::centroid(b, 1),
                split::centroid(b, 2),
            ));
        }
        (aabb, centroids)
    }

    /// Two-pointer partition; returns the first slot on the right side
    fn partition(&mut self, offset: usize, count: usize, split: Split) -> usize {
        let mut left = offset;
        let mut right = offset + count;
        loop {
            while left < right && split::centroid(&self.bounds[left], split.axis) < split.position {
                left += 1;
            }
            while left < right && split::centroid(&self.bounds[right - 1], split.axis) >= split.position {
                right -= 1;
            }
            if left >= right {
                return left;
            }
            self.swap(left, right - 1);
            left += 1;
            right -= 1;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.bounds.swap(a, b);
        match &mut self.slots {
            Slots::Index(index) => index.swap_triangles(a, b),
            Slots::Indirect(table) => table.swap(a, b),
        }
    }
}

/// Per-triangle bounds in slot order
fn triangle_bounds(geometry: &MeshGeometry) -> Vec<TriangleBounds> {
    (0..geometry.triangle_count())
        .map(|triangle| {
            let [a, b, c] = geometry.triangle_vertices(triangle);
            let mut bounds = [0.0; 6];
            for axis in 0..3 {
                bounds[2 * axis] = a[axis].min(b[axis]).min(c[axis]);
                bounds[2 * axis + 1] = a[axis].max(b[axis]).max(c[axis]);
            }
            bounds
        })
        .collect()
}

/// Resolve the requested root ranges into disjoint, in-bounds intervals
///
/// Explicit ranges win over geometry groups, which win over the whole mesh.
/// Overlapping ranges are cut at every boundary so each covered interval
/// becomes its own root; triangles outside every range are left out.
pub(crate) fn root_ranges(triangle_count: usize, groups: &[TriangleRange], options: &BuildOptions) -> Vec<TriangleRange> {
    let total = triangle_count as u32;
    let requested: Vec<TriangleRange> = match &options.ranges {
        Some(ranges) => ranges.clone(),
        None if !groups.is_empty() => groups.to_vec(),
        None => vec![TriangleRange::new(0, total)],
    };

    let mut clamped = Vec::with_capacity(requested.len());
    for range in requested {
        if range.count == 0 {
            continue;
        }
        if range.offset >= total {
            if options.verbose {
                warn!("Range {range:?} starts past the last triangle ({total}); skipped");
            }
            continue;
        }
        let end = range.end().min(total);
        if range.end() > total && options.verbose {
            warn!("Range {range:?} extends past the last triangle ({total}); clamped");
        }
        clamped.push(TriangleRange::new(range.offset, end - range.offset));
    }

    let mut cuts: Vec<u32> = clamped.iter().flat_map(|r| [r.offset, r.end()]).collect();
    cuts.sort_unstable();
    cuts.dedup();

    let mut roots = Vec::new();
    let mut overlapping = false;
    for window in cuts.windows(2) {
        let (start, end) = (window[0], window[1]);
        let covering = clamped
            .iter()
            .filter(|r| r.offset <= start && r.end() >= end)
            .count();
        if covering > 0 {
            roots.push(TriangleRange::new(start, end - start));
        }
        if covering > 1 {
            overlapping = true;
        }
    }

    if options.verbose {
        if overlapping {
            warn!("Overlapping triangle ranges were split into disjoint roots");
        }
        let covered: u32 = roots.iter().map(|r| r.count).sum();
        if covered < total {
            warn!("{} of {} triangles are not covered by any range", total - covered, total);
        }
    }

    roots
}
