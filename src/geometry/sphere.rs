//! Spherical helpers: great-circle angles, midpoints and the tangent-plane
//! frame used to flatten GPS tracks.

use glam::{DVec2, DVec3};

use crate::geo_utils::compute_center;
use crate::GpsPoint;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS: f64 = 6_371_000.0;

/// Points closer than this to the frame horizon (cosine of the angle to the
/// frame center) cannot be projected.
const HORIZON_EPSILON: f64 = 1e-9;

/// Angle in radians between two vectors (robust near 0 and π).
pub fn angle_between(a: DVec3, b: DVec3) -> f64 {
    a.cross(b).length().atan2(a.dot(b))
}

/// Unit vector halfway along the great circle between two unit vectors.
/// `None` for (near) antipodal inputs where the midpoint is undefined.
pub fn great_circle_midpoint(a: DVec3, b: DVec3) -> Option<DVec3> {
    let sum = a + b;
    if sum.length() < 1e-9 {
        return None;
    }
    sum.try_normalize()
}

/// Gnomonic tangent-plane frame centered on a point of the sphere.
///
/// Coordinates are meters east (`x`) and north (`y`) on the plane touching the
/// sphere at the center. Great circles map to straight lines, so local
/// planar geometry (perpendicular feet, rectangles) stays meaningful.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalFrame {
    center: DVec3,
    east: DVec3,
    north: DVec3,
}

impl LocalFrame {
    /// Frame touching the sphere at `center` (any non-zero vector).
    pub fn new(center: DVec3) -> Option<Self> {
        let center = center.try_normalize()?;
        let east = DVec3::Z
            .cross(center)
            .try_normalize()
            // At the poles "east" is arbitrary
            .unwrap_or(DVec3::Y);
        let north = center.cross(east);
        Some(Self {
            center,
            east,
            north,
        })
    }

    /// Frame centered on the spherical centroid of the points.
    pub fn centered_on(points: &[GpsPoint]) -> Option<Self> {
        let center = compute_center(points)?;
        Self::new(center.unit_vector())
    }

    pub fn center(&self) -> GpsPoint {
        GpsPoint::from_direction(self.center)
    }

    /// Project onto the tangent plane; `None` at or beyond the horizon.
    pub fn flatten(&self, point: &GpsPoint) -> Option<DVec2> {
        let u = point.unit_vector();
        let z = u.dot(self.center);
        if z <= HORIZON_EPSILON {
            return None;
        }
        Some(DVec2::new(u.dot(self.east), u.dot(self.north)) / z * EARTH_RADIUS)
    }

    /// Inverse of [`flatten`](Self::flatten) (elevation is lost).
    pub fn unflatten(&self, v: DVec2) -> GpsPoint {
        let v = v / EARTH_RADIUS;
        GpsPoint::from_direction(self.center + self.east * v.x + self.north * v.y)
    }
}
