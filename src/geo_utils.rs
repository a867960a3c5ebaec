//! # Geographic Utilities
//!
//! Great-circle distances and simple aggregates over GPS tracks.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two GPS points |
//! | [`great_circle_distance`] | Same, from the angle between unit vectors |
//! | [`polyline_length`] | Total length of a GPS track in meters |
//! | [`compute_center`] | Spherical centroid of a GPS track |
//!
//! All functions expect WGS84 latitude/longitude in degrees and treat the Earth
//! as a sphere of radius [`EARTH_RADIUS`].

use geo::{Distance, Haversine, Point};

use crate::geometry::{angle_between, mean, EARTH_RADIUS, GEOMETRY_EPSILON};
use crate::GpsPoint;

/// Calculate the great-circle distance between two GPS points using the Haversine formula.
///
/// # Example
///
/// ```rust
/// use track_matcher::{GpsPoint, geo_utils};
///
/// let london = GpsPoint::new(51.5074, -0.1278);
/// let paris = GpsPoint::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0); // ~344 km
/// ```
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Great-circle distance in meters computed from the angle between the points'
/// unit vectors. Numerically stable for both tiny and near-antipodal separations.
#[inline]
pub fn great_circle_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    angle_between(p1.unit_vector(), p2.unit_vector()) * EARTH_RADIUS
}

/// Calculate the total length of a polyline (GPS track) in meters.
///
/// Empty or single-point tracks return 0.0.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Spherical centroid: the normalized mean of the points' unit vectors.
///
/// Unlike averaging degrees this is correct across the antimeridian.
/// Returns `None` for empty input or when the points cancel out.
pub fn compute_center(points: &[GpsPoint]) -> Option<GpsPoint> {
    let units: Vec<_> = points.iter().map(|p| p.unit_vector()).collect();
    let direction = mean(&units)?;
    (direction.length() > GEOMETRY_EPSILON).then(|| GpsPoint::from_direction(direction))
}
