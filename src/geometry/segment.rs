//! Directed line segments and the segment-to-segment distance used by
//! trajectory clustering.
//!
//! The trajectory distance follows the partition-and-group formulation
//! (Lee, Han, Whang 2007): the longer segment is the reference, and the
//! distance is a weighted sum of
//! - perpendicular: `(l1² + l2²) / (l1 + l2)` of the endpoint offsets,
//! - parallel: the smaller overhang of the projected endpoints,
//! - angular: `|Lj| · sin θ`, or `|Lj|` once the segments point apart
//!   and direction matters.

use super::{Coordinates, GEOMETRY_EPSILON};

/// A directed segment from `a` to `b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment<P> {
    pub a: P,
    pub b: P,
}

/// Foot of the perpendicular from a point onto a segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerpendicularFoot<P> {
    /// Interpolation parameter along the segment, clamped to `[0, 1]`
    pub fraction: f64,
    /// Distance from the point to the foot
    pub distance: f64,
    pub foot: P,
}

/// The three components of the trajectory distance.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DistanceComponents {
    pub perpendicular: f64,
    pub parallel: f64,
    pub angular: f64,
}

impl DistanceComponents {
    pub fn weighted(&self, perpendicular: f64, parallel: f64, angular: f64) -> f64 {
        perpendicular * self.perpendicular + parallel * self.parallel + angular * self.angular
    }
}

impl<P: Coordinates> Segment<P> {
    pub fn new(a: P, b: P) -> Self {
        Self { a, b }
    }

    pub fn length(&self) -> f64 {
        self.a.distance(self.b)
    }

    pub fn direction(&self) -> P {
        self.b - self.a
    }

    /// Unclamped projection parameter of `p` on the supporting line.
    /// A degenerate segment projects everything onto `a` (parameter 0).
    pub fn projection_parameter(&self, p: P) -> f64 {
        let d = self.direction();
        let len_sq = d.length_squared();
        if len_sq <= GEOMETRY_EPSILON {
            return 0.0;
        }
        (p - self.a).dot(d) / len_sq
    }

    pub fn point_at(&self, t: f64) -> P {
        self.a.lerp(self.b, t)
    }

    /// Closest point of the segment to `p`.
    pub fn perpendicular_foot(&self, p: P) -> PerpendicularFoot<P> {
        let fraction = self.projection_parameter(p).clamp(0.0, 1.0);
        let foot = self.point_at(fraction);
        PerpendicularFoot {
            fraction,
            distance: foot.distance(p),
            foot,
        }
    }

    /// Distance components of `other` measured against `self` as the reference.
    pub fn components_against(&self, other: &Self, direction: bool) -> DistanceComponents {
        let ps = self.point_at(self.projection_parameter(other.a));
        let pe = self.point_at(self.projection_parameter(other.b));

        let l1 = ps.distance(other.a);
        let l2 = pe.distance(other.b);
        let perpendicular = if l1 + l2 > GEOMETRY_EPSILON {
            (l1 * l1 + l2 * l2) / (l1 + l2)
        } else {
            0.0
        };

        let par1 = ps.distance(self.a).min(ps.distance(self.b));
        let par2 = pe.distance(self.a).min(pe.distance(self.b));
        let parallel = par1.min(par2);

        let other_len = other.length();
        let angular = match (self.direction().try_normalize(), other.direction().try_normalize()) {
            (Some(u), Some(v)) => {
                let cos = u.dot(v).clamp(-1.0, 1.0);
                let sin = (1.0 - cos * cos).max(0.0).sqrt();
                if direction && cos <= 0.0 {
                    other_len
                } else {
                    other_len * sin
                }
            }
            _ => 0.0,
        };

        DistanceComponents {
            perpendicular,
            parallel,
            angular,
        }
    }

    /// Components with the longer of the two segments as the reference.
    pub fn trajectory_components(&self, other: &Self, direction: bool) -> DistanceComponents {
        if self.length() >= other.length() {
            self.components_against(other, direction)
        } else {
            other.components_against(self, direction)
        }
    }

    /// Component-wise bounding box `(min, max)`.
    pub fn bounds(&self) -> (P, P) {
        (self.a.min(self.b), self.a.max(self.b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::DVec2;

    fn seg(ax: f64, ay: f64, bx: f64, by: f64) -> Segment<DVec2> {
        Segment::new(DVec2::new(ax, ay), DVec2::new(bx, by))
    }

    #[test]
    fn test_perpendicular_foot() {
        let s = seg(0.0, 0.0, 10.0, 0.0);
        let foot = s.perpendicular_foot(DVec2::new(1.0, 1.0));
        assert!((foot.fraction - 0.1).abs() < 1e-12);
        assert!((foot.distance - 1.0).abs() < 1e-12);

        let beyond = s.perpendicular_foot(DVec2::new(12.0, 0.0));
        assert_eq!(beyond.fraction, 1.0);
        assert!((beyond.distance - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_segment_falls_back_to_endpoint() {
        let s = seg(1.0, 1.0, 1.0, 1.0);
        let foot = s.perpendicular_foot(DVec2::new(4.0, 5.0));
        assert_eq!(foot.fraction, 0.0);
        assert!((foot.distance - 5.0).abs() < 1e-12);
        assert!(foot.distance.is_finite());
    }

    #[test]
    fn test_parallel_offset_components() {
        let long = seg(0.0, 0.0, 10.0, 0.0);
        let short = seg(2.0, 3.0, 6.0, 3.0);
        let c = long.trajectory_components(&short, true);
        assert!((c.perpendicular - 3.0).abs() < 1e-12);
        assert!((c.parallel - 2.0).abs() < 1e-12);
        assert!(c.angular.abs() < 1e-12);
        // Symmetric because the longer segment is always the reference
        assert_eq!(c, short.trajectory_components(&long, true));
    }

    #[test]
    fn test_angular_component_respects_direction() {
        let long = seg(0.0, 0.0, 10.0, 0.0);
        let reversed = seg(6.0, 0.0, 2.0, 0.0);
        assert!((long.components_against(&reversed, true).angular - 4.0).abs() < 1e-12);
        assert!(long.components_against(&reversed, false).angular.abs() < 1e-12);

        let diagonal = seg(0.0, 0.0, 3.0, 4.0);
        let c = long.components_against(&diagonal, false);
        assert!((c.angular - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_identical_segments_have_zero_distance() {
        let s = seg(0.0, 0.0, 1.0, 1.0);
        let c = s.trajectory_components(&s, true);
        assert_eq!(c.weighted(1.0, 1.0, 1.0), 0.0);
    }
}
