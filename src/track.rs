//! Tracks: ordered point sequences with cumulative distances.
//!
//! `distance[i]` is the arc length from the first point to point `i` and
//! `displacement[i]` the length of the step `i-1 -> i` (0 for the first
//! point). Both are computed once at construction; a track is immutable
//! afterwards.

use crate::error::{Result, TrackError};
use crate::geometry::{Coordinates, DVec2, LocalFrame, Segment};
use crate::GpsPoint;

/// An ordered, index-stable sequence of points.
#[derive(Debug, Clone, PartialEq)]
pub struct Track<P = DVec2> {
    points: Vec<P>,
    distance: Vec<f64>,
    displacement: Vec<f64>,
}

impl<P: Coordinates> Track<P> {
    /// Build a track, precomputing `distance` and `displacement`.
    pub fn new(points: Vec<P>) -> Self {
        let mut distance = Vec::with_capacity(points.len());
        let mut displacement = Vec::with_capacity(points.len());
        let mut total = 0.0;

        for (i, p) in points.iter().enumerate() {
            let step = if i == 0 { 0.0 } else { points[i - 1].distance(*p) };
            total += step;
            displacement.push(step);
            distance.push(total);
        }

        Self {
            points,
            distance,
            displacement,
        }
    }

    /// Like [`new`](Self::new) but rejects non-finite coordinates.
    pub fn try_new(track_id: &str, points: Vec<P>) -> Result<Self> {
        if let Some(i) = points.iter().position(|p| !p.is_finite()) {
            return Err(TrackError::InvalidCoordinates {
                track_id: track_id.to_string(),
                message: format!("point {} is not finite", i),
            });
        }
        Ok(Self::new(points))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[P] {
        &self.points
    }

    pub fn point(&self, index: usize) -> Option<&P> {
        self.points.get(index)
    }

    /// Cumulative arc length at each point.
    pub fn distance(&self) -> &[f64] {
        &self.distance
    }

    /// Length of the step arriving at each point.
    pub fn displacement(&self) -> &[f64] {
        &self.displacement
    }

    /// Total length of the track.
    pub fn length(&self) -> f64 {
        self.distance.last().copied().unwrap_or(0.0)
    }

    /// Segment `[index, index + 1]`, if both points exist.
    pub fn segment(&self, index: usize) -> Option<Segment<P>> {
        let a = self.points.get(index)?;
        let b = self.points.get(index + 1)?;
        Some(Segment::new(*a, *b))
    }

    /// Component-wise bounding box `(min, max)`.
    pub fn bounds(&self) -> Option<(P, P)> {
        let first = *self.points.first()?;
        Some(
            self.points
                .iter()
                .fold((first, first), |(lo, hi), p| (lo.min(*p), hi.max(*p))),
        )
    }
}

impl<P> AsRef<[P]> for Track<P> {
    fn as_ref(&self) -> &[P] {
        &self.points
    }
}

impl Track<DVec2> {
    /// Flatten GPS points into `frame` (meters). `None` if any point lies
    /// beyond the frame's horizon.
    pub fn from_gps(points: &[GpsPoint], frame: &LocalFrame) -> Option<Self> {
        let flat: Option<Vec<DVec2>> = points.iter().map(|p| frame.flatten(p)).collect();
        flat.map(Self::new)
    }

    /// Flatten GPS points into a frame centered on their own centroid.
    pub fn flatten(points: &[GpsPoint]) -> Option<(LocalFrame, Self)> {
        let frame = LocalFrame::centered_on(points)?;
        let track = Self::from_gps(points, &frame)?;
        Some((frame, track))
    }
}

/// Flatten several GPS tracks into one shared frame centered on all of their
/// points, so planar results are comparable across tracks.
pub fn flatten_tracks<T: AsRef<[GpsPoint]>>(tracks: &[T]) -> Option<(LocalFrame, Vec<Track>)> {
    let all: Vec<GpsPoint> = tracks
        .iter()
        .flat_map(|t| t.as_ref().iter().copied())
        .collect();
    let frame = LocalFrame::centered_on(&all)?;
    let flat: Option<Vec<Track>> = tracks
        .iter()
        .map(|t| Track::from_gps(t.as_ref(), &frame))
        .collect();
    flat.map(|tracks| (frame, tracks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::haversine_distance;

    #[test]
    fn test_distance_and_displacement() {
        let track = Track::new(vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(3.0, 4.0),
            DVec2::new(3.0, 4.0),
            DVec2::new(6.0, 8.0),
        ]);
        assert_eq!(track.displacement(), &[0.0, 5.0, 0.0, 5.0]);
        assert_eq!(track.distance(), &[0.0, 5.0, 5.0, 10.0]);
        assert_eq!(track.length(), 10.0);
        // Non-decreasing
        assert!(track.distance().windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_empty_track() {
        let track: Track = Track::new(vec![]);
        assert!(track.is_empty());
        assert_eq!(track.length(), 0.0);
        assert!(track.bounds().is_none());
        assert!(track.segment(0).is_none());
    }

    #[test]
    fn test_try_new_rejects_nan() {
        let result = Track::try_new("bad", vec![DVec2::ZERO, DVec2::new(f64::NAN, 1.0)]);
        assert!(matches!(result, Err(TrackError::InvalidCoordinates { .. })));
    }

    #[test]
    fn test_bounds() {
        let track = Track::new(vec![DVec2::new(1.0, -2.0), DVec2::new(-3.0, 5.0)]);
        let (lo, hi) = track.bounds().unwrap();
        assert_eq!(lo, DVec2::new(-3.0, -2.0));
        assert_eq!(hi, DVec2::new(1.0, 5.0));
    }

    #[test]
    fn test_flatten_preserves_lengths() {
        let gps = vec![
            GpsPoint::new(51.5074, -0.1278),
            GpsPoint::new(51.5080, -0.1290),
            GpsPoint::new(51.5090, -0.1300),
        ];
        let (_, track) = Track::flatten(&gps).unwrap();
        let expected = haversine_distance(&gps[0], &gps[1]);
        assert!((track.displacement()[1] - expected).abs() < 0.5);
    }

    #[test]
    fn test_flatten_tracks_shared_frame() {
        let a = vec![GpsPoint::new(0.0, 0.0), GpsPoint::new(0.0, 0.001)];
        let b = vec![GpsPoint::new(0.001, 0.0), GpsPoint::new(0.001, 0.001)];
        let (_, tracks) = flatten_tracks(&[a, b]).unwrap();
        assert_eq!(tracks.len(), 2);
        // Track b sits ~111m north of track a
        let dy = tracks[1].points()[0].y - tracks[0].points()[0].y;
        assert!((dy - 111.2).abs() < 1.0);
    }
}
