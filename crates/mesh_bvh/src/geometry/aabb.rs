//! Axis-aligned bounding box

use serde::{Deserialize, Serialize};

use crate::foundation::math::{transform_point, Mat4, Vec3};

/// Axis-Aligned Bounding Box for spatial queries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Default for AABB {
    fn default() -> Self {
        Self::empty()
    }
}

impl AABB {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// An inverted box that any point or box expands into
    pub fn empty() -> Self {
        Self {
            min: Vec3::repeat(f32::INFINITY),
            max: Vec3::repeat(f32::NEG_INFINITY),
        }
    }

    /// Create an AABB centered at a point with given extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Smallest box containing every point
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Self {
        let mut aabb = Self::empty();
        for point in points {
            aabb.expand_by_point(point);
        }
        aabb
    }

    /// True when min exceeds max on any axis
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Full edge lengths of the box
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Surface area, zero for empty boxes
    pub fn surface_area(&self) -> f32 {
        if self.is_empty() {
            return 0.0;
        }
        let d = self.size();
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// Grow the box to include a point
    pub fn expand_by_point(&mut self, point: &Vec3) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    /// Grow the box to include another box
    pub fn expand_by_box(&mut self, other: &Self) {
        self.min = self.min.inf(&other.min);
        self.max = self.max.sup(&other.max);
    }

    /// Union of two boxes
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: &Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Check if this AABB fully contains another AABB
    pub fn contains_box(&self, other: &Self) -> bool {
        self.contains_point(&other.min) && self.contains_point(&other.max)
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// The eight corners, bit 0/1/2 of the index selecting max on x/y/z
    pub fn corners(&self) -> [Vec3; 8] {
        let mut corners = [Vec3::zeros(); 8];
        for (i, corner) in corners.iter_mut().enumerate() {
            *corner = Vec3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
        }
        corners
    }

    /// Axis-aligned box around this box after an affine transform
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let corners = self.corners();
        let moved = corners.map(|corner| transform_point(matrix, &corner));
        Self::from_points(moved.iter())
    }

    /// Squared distance from a point to the box (zero inside)
    pub fn distance_sq_to_point(&self, point: &Vec3) -> f32 {
        let dx = (self.min.x - point.x).max(0.0).max(point.x - self.max.x);
        let dy = (self.min.y - point.y).max(0.0).max(point.y - self.max.y);
        let dz = (self.min.z - point.z).max(0.0).max(point.z - self.max.z);
        dx * dx + dy * dy + dz * dz
    }

    /// Squared distance between two boxes (zero when they overlap)
    pub fn distance_sq_to_box(&self, other: &Self) -> f32 {
        let dx = (self.min.x - other.max.x).max(0.0).max(other.min.x - self.max.x);
        let dy = (self.min.y - other.max.y).max(0.0).max(other.min.y - self.max.y);
        let dz = (self.min.z - other.max.z).max(0.0).max(other.min.z - self.max.z);
        dx * dx + dy * dy + dz * dz
    }

    /// Slab test with a precomputed reciprocal direction
    ///
    /// Returns the parametric `(t_enter, t_exit)` interval of the ray inside
    /// the box, or `None` when the ray line misses it. The interval may start
    /// behind the origin; callers clip it against their own near/far range.
    /// Rays parallel to a slab and lying on one of its planes count as inside.
    #[inline]
    pub fn ray_interval(&self, origin: &Vec3, inv_dir: &Vec3) -> Option<(f32, f32)> {
        let (x0, x1) = slab(self.min.x, self.max.x, origin.x, inv_dir.x)?;
        let (y0, y1) = slab(self.min.y, self.max.y, origin.y, inv_dir.y)?;
        let (z0, z1) = slab(self.min.z, self.max.z, origin.z, inv_dir.z)?;

        let tmin = x0.max(y0).max(z0);
        let tmax = x1.min(y1).min(z1);
        (tmax >= tmin).then_some((tmin, tmax))
    }

    /// Flatten into the `[min_x, min_y, min_z, max_x, max_y, max_z]` node layout
    pub fn to_array(&self) -> [f32; 6] {
        [self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z]
    }

    /// Inverse of [`AABB::to_array`]
    pub fn from_array(values: &[f32; 6]) -> Self {
        Self {
            min: Vec3::new(values[0], values[1], values[2]),
            max: Vec3::new(values[3], values[4], values[5]),
        }
    }
}

/// Entry and exit parameters for one axis
///
/// A zero direction component gives an infinite reciprocal, and
/// `0 * inf` would be NaN for an origin on the plane, so that axis is
/// decided by the origin alone.
#[inline]
fn slab(min: f32, max: f32, origin: f32, inv_dir: f32) -> Option<(f32, f32)> {
    if inv_dir.is_infinite() {
        return (min..=max)
            .contains(&origin)
            .then_some((f32::NEG_INFINITY, f32::INFINITY));
    }
    let t1 = (min - origin) * inv_dir;
    let t2 = (max - origin) * inv_dir;
    Some((t1.min(t2), t1.max(t2)))
}
