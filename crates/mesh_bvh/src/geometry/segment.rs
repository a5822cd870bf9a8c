//! Line segments and segment closest-point queries

use crate::foundation::math::{constants::EPSILON, Vec3};

/// A finite line segment between two points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// First endpoint
    pub start: Vec3,
    /// Second endpoint
    pub end: Vec3,
}

impl Segment {
    /// Creates a segment between two points
    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self { start, end }
    }

    /// Vector from start to end
    pub fn delta(&self) -> Vec3 {
        self.end - self.start
    }

    /// Point at parameter `t` (0 = start, 1 = end)
    pub fn at(&self, t: f32) -> Vec3 {
        self.start + self.delta() * t
    }

    /// Closest point on the segment to `point`
    pub fn closest_point_to_point(&self, point: &Vec3) -> Vec3 {
        let delta = self.delta();
        let length_sq = delta.magnitude_squared();
        if length_sq <= EPSILON {
            return self.start;
        }
        let t = ((point - self.start).dot(&delta) / length_sq).clamp(0.0, 1.0);
        self.at(t)
    }

    /// Closest pair of points between two segments, `(on_self, on_other)`
    ///
    /// Zero-length segments collapse to their start point. Parallel segments
    /// return one of the equally close pairs.
    pub fn closest_points(&self, other: &Self) -> (Vec3, Vec3) {
        let d1 = self.delta();
        let d2 = other.delta();
        let r = self.start - other.start;
        let a = d1.magnitude_squared();
        let e = d2.magnitude_squared();
        let f = d2.dot(&r);

        let (s, t) = if a <= EPSILON && e <= EPSILON {
            (0.0, 0.0)
        } else if a <= EPSILON {
            (0.0, (f / e).clamp(0.0, 1.0))
        } else {
            let c = d1.dot(&r);
            if e <= EPSILON {
                ((-c / a).clamp(0.0, 1.0), 0.0)
            } else {
                let b = d1.dot(&d2);
                let denom = a * e - b * b;

                // Parallel segments have no unique answer; start from s = 0
                let s = if denom > f32::EPSILON * a * e {
                    ((b * f - c * e) / denom).clamp(0.0, 1.0)
                } else {
                    0.0
                };

                let t = (b * s + f) / e;
                if t < 0.0 {
                    ((-c / a).clamp(0.0, 1.0), 0.0)
                } else if t > 1.0 {
                    (((b - c) / a).clamp(0.0, 1.0), 1.0)
                } else {
                    (s, t)
                }
            }
        };

        (self.at(s), other.at(t))
    }
}
