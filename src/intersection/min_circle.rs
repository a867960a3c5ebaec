//! Minimal enclosing spherical cap of a track.
//!
//! Incremental Welzl: a point outside the current cap must lie on the
//! boundary of the minimal cap of the points seen so far, so the cap is
//! rebuilt with that point as support (then two, then three support points).
//! Expected linear time for unordered input, worst case cubic.

use std::f64::consts::FRAC_PI_2;

use crate::geometry::{angle_between, great_circle_midpoint, DVec3};
use crate::GpsPoint;

use super::TrackRelation;

/// Angular slack for membership tests.
const CAP_EPSILON: f64 = 1e-12;

/// A spherical cap: all unit vectors within `radius` radians of `center`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalCap {
    pub center: DVec3,
    pub radius: f64,
}

impl SphericalCap {
    fn point(p: DVec3) -> Self {
        Self {
            center: p,
            radius: 0.0,
        }
    }

    /// Smallest cap with `a` and `b` on its boundary; `None` when antipodal.
    fn through_two(a: DVec3, b: DVec3) -> Option<Self> {
        let center = great_circle_midpoint(a, b)?;
        Some(Self {
            center,
            radius: angle_between(center, a),
        })
    }

    /// Cap whose boundary passes through three points.
    fn through_three(a: DVec3, b: DVec3, c: DVec3) -> Option<Self> {
        let normal = (b - a).cross(c - a).try_normalize()?;
        let center = if normal.dot(a) < 0.0 { -normal } else { normal };
        Some(Self {
            center,
            radius: angle_between(center, a),
        })
    }

    pub fn contains(&self, p: DVec3) -> bool {
        angle_between(self.center, p) <= self.radius + CAP_EPSILON
    }

    pub fn center_point(&self) -> GpsPoint {
        GpsPoint::from_direction(self.center)
    }

    /// Cap radius in meters on the reference sphere.
    pub fn radius_meters(&self) -> f64 {
        self.radius * crate::EARTH_RADIUS
    }
}

/// Smallest cap with `a`, `b` and `c` inside and `a`, `b` on the boundary
/// when one exists, otherwise the smallest pair cap covering all three.
fn support_three(a: DVec3, b: DVec3, c: DVec3) -> Option<SphericalCap> {
    if let Some(cap) = SphericalCap::through_three(a, b, c) {
        if cap.radius <= FRAC_PI_2 {
            return Some(cap);
        }
    }
    // Nearly on one great circle: the widest pair spans the others
    [(a, b), (a, c), (b, c)]
        .into_iter()
        .filter_map(|(p, q)| SphericalCap::through_two(p, q))
        .filter(|cap| cap.contains(a) && cap.contains(b) && cap.contains(c))
        .min_by(|x, y| x.radius.total_cmp(&y.radius))
}

/// Minimal enclosing cap of unit vectors.
///
/// `None` for empty input, and when the points do not fit in an open
/// hemisphere (no cap of radius below π/2 contains them).
pub fn minimal_cap(points: &[DVec3]) -> Option<SphericalCap> {
    let (first, rest) = points.split_first()?;
    let mut cap = SphericalCap::point(*first);

    for (i, &p) in rest.iter().enumerate() {
        if cap.contains(p) {
            continue;
        }
        cap = SphericalCap::point(p);
        let seen = &points[..=i];

        for (j, &q) in seen.iter().enumerate() {
            if cap.contains(q) {
                continue;
            }
            cap = SphericalCap::through_two(p, q)?;

            for &r in &seen[..j] {
                if !cap.contains(r) {
                    cap = support_three(p, q, r)?;
                }
            }
        }
    }

    (cap.radius + CAP_EPSILON < FRAC_PI_2).then_some(cap)
}

/// Minimal cap of a GPS track.
pub fn track_cap(points: &[GpsPoint]) -> Option<SphericalCap> {
    let units: Vec<DVec3> = points.iter().map(|p| p.unit_vector()).collect();
    minimal_cap(&units)
}

/// Classify by comparing the two tracks' minimal caps (tolerance in meters).
pub(crate) fn classify(a: &[GpsPoint], b: &[GpsPoint], tolerance: f64) -> TrackRelation {
    let (Some(cap_a), Some(cap_b)) = (track_cap(a), track_cap(b)) else {
        return TrackRelation::Undefined;
    };

    let separation = angle_between(cap_a.center, cap_b.center) * crate::EARTH_RADIUS;
    let (r1, r2) = (cap_a.radius_meters(), cap_b.radius_meters());

    if separation <= tolerance && (r1 - r2).abs() <= tolerance {
        TrackRelation::Same
    } else if r1 + separation <= r2 {
        TrackRelation::Inside
    } else if r2 + separation <= r1 {
        TrackRelation::Outside
    } else if separation <= r1 + r2 {
        TrackRelation::Overlapping
    } else {
        TrackRelation::NotIntersecting
    }
}
