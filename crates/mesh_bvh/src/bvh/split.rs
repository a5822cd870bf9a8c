//! Split plane selection
//!
//! Triangle bounds are kept per slot as `[min_x, max_x, min_y, max_y, min_z, max_z]`
//! so the centroid along an axis is the midpoint of one pair.

use serde::{Deserialize, Serialize};

use crate::foundation::math::{longest_axis, Vec3};
use crate::geometry::AABB;

/// How internal nodes choose their split plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SplitStrategy {
    /// Longest axis of the node box, at its midpoint
    #[default]
    Center,
    /// Longest axis of the centroid box, at the mean centroid
    Average,
    /// Lowest surface area heuristic cost
    Sah,
}

/// Surface area heuristic tuning
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SahParameters {
    /// Centroid bins per axis; ranges this small or smaller try every distinct centroid
    pub bin_count: u32,
    /// Cost of visiting an internal node
    pub traversal_cost: f32,
    /// Cost of one triangle test
    pub triangle_intersect_cost: f32,
}

impl Default for SahParameters {
    fn default() -> Self {
        Self {
            bin_count: 32,
            traversal_cost: 1.0,
            triangle_intersect_cost: 1.25,
        }
    }
}

/// Per-slot triangle bounds
pub(crate) type TriangleBounds = [f32; 6];

/// Chosen split: triangles with centroid below `position` go left
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Split {
    pub axis: usize,
    pub position: f32,
}

#[inline]
pub(crate) fn centroid(bounds: &TriangleBounds, axis: usize) -> f32 {
    (bounds[2 * axis] + bounds[2 * axis + 1]) * 0.5
}

#[inline]
pub(crate) fn to_aabb(bounds: &TriangleBounds) -> AABB {
    AABB::new(
        Vec3::new(bounds[0], bounds[2], bounds[4]),
        Vec3::new(bounds[1], bounds[3], bounds[5]),
    )
}

/// Pick a split for the triangles in `bounds`, or `None` to make a leaf
pub(crate) fn choose_split(
    strategy: SplitStrategy,
    node: &AABB,
    centroids: &AABB,
    bounds: &[TriangleBounds],
    sah: &SahParameters,
) -> Option<Split> {
    match strategy {
        SplitStrategy::Center => {
            let size = node.size();
            let axis = longest_axis(&size);
            (size[axis] > 0.0).then(|| Split {
                axis,
                position: node.center()[axis],
            })
        }
        SplitStrategy::Average => {
            let size = centroids.size();
            let axis = longest_axis(&size);
            if size[axis] <= 0.0 || bounds.is_empty() {
                return None;
            }
            let sum: f32 = bounds.iter().map(|b| centroid(b, axis)).sum();
            Some(Split {
                axis,
                position: sum / bounds.len() as f32,
            })
        }
        SplitStrategy::Sah => sah_split(node, centroids, bounds, sah),
    }
}

fn sah_split(node: &AABB, centroids: &AABB, bounds: &[TriangleBounds], params: &SahParameters) -> Option<Split> {
    let parent_area = node.surface_area();
    if parent_area <= 0.0 {
        return None;
    }

    let count = bounds.len();
    let bin_count = params.bin_count.max(2) as usize;
    let cost = |left_area: f32, left_count: usize, right_area: f32, right_count: usize| {
        params.traversal_cost
            + params.triangle_intersect_cost
                * (left_area * left_count as f32 + right_area * right_count as f32)
                / parent_area
    };

    let mut best: Option<(f32, Split)> = None;
    let mut consider = |candidate_cost: f32, split: Split| {
        if best.map_or(true, |(best_cost, _)| candidate_cost < best_cost) {
            best = Some((candidate_cost, split));
        }
    };

    for axis in 0..3 {
        let low = centroids.min[axis];
        let high = centroids.max[axis];
        if high <= low {
            continue;
        }

        if count <= bin_count {
            // Few triangles: every distinct centroid is a candidate plane
            let mut candidates: Vec<f32> = bounds.iter().map(|b| centroid(b, axis)).collect();
            candidates.sort_by(f32::total_cmp);
            candidates.dedup();

            for &position in candidates.iter().skip(1) {
                let mut left = AABB::empty();
                let mut right = AABB::empty();
                let (mut left_count, mut right_count) = (0, 0);
                for b in bounds {
                    if centroid(b, axis) < position {
                        left.expand_by_box(&to_aabb(b));
                        left_count += 1;
                    } else {
                        right.expand_by_box(&to_aabb(b));
                        right_count += 1;
                    }
                }
                if left_count == 0 || right_count == 0 {
                    continue;
                }
                consider(
                    cost(left.surface_area(), left_count, right.surface_area(), right_count),
                    Split { axis, position },
                );
            }
        } else {
            let width = (high - low) / bin_count as f32;
            let mut bins = vec![(AABB::empty(), 0_usize); bin_count];
            for b in bounds {
                let bin = (((centroid(b, axis) - low) / width) as usize).min(bin_count - 1);
                bins[bin].0.expand_by_box(&to_aabb(b));
                bins[bin].1 += 1;
            }

            // Suffix sweep for the right side of each boundary
            let mut right_area = vec![0.0; bin_count];
            let mut right_count = vec![0; bin_count];
            let mut accumulated = AABB::empty();
            let mut accumulated_count = 0;
            for i in (1..bin_count).rev() {
                accumulated.expand_by_box(&bins[i].0);
                accumulated_count += bins[i].1;
                right_area[i] = accumulated.surface_area();
                right_count[i] = accumulated_count;
            }

            let mut left = AABB::empty();
            let mut left_count = 0;
            for i in 1..bin_count {
                left.expand_by_box(&bins[i - 1].0);
                left_count += bins[i - 1].1;
                if left_count == 0 || right_count[i] == 0 {
                    continue;
                }
                consider(
                    cost(left.surface_area(), left_count, right_area[i], right_count[i]),
                    Split {
                        axis,
                        position: low + width * i as f32,
                    },
                );
            }
        }
    }

    let leaf_cost = params.triangle_intersect_cost * count as f32;
    best.filter(|(best_cost, _)| *best_cost < leaf_cost)
        .map(|(_, split)| split)
}
