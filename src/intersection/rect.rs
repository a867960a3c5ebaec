//! Bounding-rectangle classification in tangent-plane frames.

use geo::{Intersects, Rect};
use glam::DVec3;

use crate::geo_utils::great_circle_distance;
use crate::geometry::LocalFrame;
use crate::track::Track;
use crate::GpsPoint;

use super::TrackRelation;

/// Bounding rectangle of a track flattened into `frame`.
fn bounding_rect(points: &[GpsPoint], frame: &LocalFrame) -> Option<Rect<f64>> {
    let track = Track::from_gps(points, frame)?;
    let (lo, hi) = track.bounds()?;
    Some(Rect::new(lo.to_array(), hi.to_array()))
}

fn unit_sum(points: &[GpsPoint]) -> DVec3 {
    points.iter().map(GpsPoint::unit_vector).sum()
}

fn diagonal(rect: &Rect<f64>) -> f64 {
    rect.width().hypot(rect.height())
}

/// `inner` lies within `outer`, allowing `tolerance` on every edge.
fn within(inner: &Rect<f64>, outer: &Rect<f64>, tolerance: f64) -> bool {
    inner.min().x >= outer.min().x - tolerance
        && inner.min().y >= outer.min().y - tolerance
        && inner.max().x <= outer.max().x + tolerance
        && inner.max().y <= outer.max().y + tolerance
}

/// Classify by bounding rectangles (tolerance in meters).
///
/// Each track is first boxed in its own frame for a cheap rejection on
/// centroid separation. Survivors are compared in one frame centered on the
/// centroid of both tracks together, which does not depend on argument order.
pub(crate) fn classify(a: &[GpsPoint], b: &[GpsPoint], tolerance: f64) -> TrackRelation {
    let (Some(frame_a), Some(frame_b)) = (LocalFrame::centered_on(a), LocalFrame::centered_on(b))
    else {
        return TrackRelation::Undefined;
    };
    let (Some(own_a), Some(own_b)) = (bounding_rect(a, &frame_a), bounding_rect(b, &frame_b)) else {
        return TrackRelation::Undefined;
    };

    let separation = great_circle_distance(&frame_a.center(), &frame_b.center());
    if separation > diagonal(&own_a) + diagonal(&own_b) + tolerance {
        return TrackRelation::NotIntersecting;
    }

    let Some(joint) = LocalFrame::new(unit_sum(a) + unit_sum(b)) else {
        return TrackRelation::Undefined;
    };
    let (Some(rect_a), Some(rect_b)) = (bounding_rect(a, &joint), bounding_rect(b, &joint)) else {
        return TrackRelation::Undefined;
    };

    let a_in_b = within(&rect_a, &rect_b, tolerance);
    let b_in_a = within(&rect_b, &rect_a, tolerance);

    match (a_in_b, b_in_a) {
        (true, true) => TrackRelation::Same,
        (true, false) => TrackRelation::Inside,
        (false, true) => TrackRelation::Outside,
        (false, false) if rect_a.intersects(&rect_b) => TrackRelation::Overlapping,
        (false, false) => TrackRelation::NotIntersecting,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(lat: f64, lng: f64, half: f64) -> Vec<GpsPoint> {
        vec![
            GpsPoint::new(lat - half, lng - half),
            GpsPoint::new(lat - half, lng + half),
            GpsPoint::new(lat + half, lng + half),
            GpsPoint::new(lat + half, lng - half),
        ]
    }

    #[test]
    fn test_same_track() {
        let a = square(45.0, 7.0, 0.01);
        assert_eq!(classify(&a, &a, 1.0), TrackRelation::Same);
    }

    #[test]
    fn test_nested_squares() {
        let outer = square(45.0, 7.0, 0.01);
        let inner = square(45.0, 7.0, 0.002);
        assert_eq!(classify(&inner, &outer, 1.0), TrackRelation::Inside);
        assert_eq!(classify(&outer, &inner, 1.0), TrackRelation::Outside);
    }

    #[test]
    fn test_overlapping_and_apart() {
        let a = square(45.0, 7.0, 0.01);
        let b = square(45.0, 7.015, 0.01);
        let c = square(46.0, 7.0, 0.01);
        assert_eq!(classify(&a, &b, 1.0), TrackRelation::Overlapping);
        assert_eq!(classify(&b, &a, 1.0), TrackRelation::Overlapping);
        assert_eq!(classify(&a, &c, 1.0), TrackRelation::NotIntersecting);
    }

    #[test]
    fn test_adjacent_but_disjoint_boxes() {
        // Passes the centroid test but the boxes do not meet
        let a = square(45.0, 7.0, 0.01);
        let b = square(45.0, 7.03, 0.01);
        assert_eq!(classify(&a, &b, 1.0), TrackRelation::NotIntersecting);
    }

    #[test]
    fn test_empty_is_undefined() {
        let a = square(45.0, 7.0, 0.01);
        assert_eq!(classify(&a, &[], 1.0), TrackRelation::Undefined);
    }

    #[test]
    fn test_argument_order_only_swaps_containment() {
        // Boxes that nearly coincide along one edge, where separate frames
        // would disagree about containment
        let a = vec![
            GpsPoint::new(50.0, 10.0),
            GpsPoint::new(50.02, 10.05),
            GpsPoint::new(49.99, 10.03),
        ];
        let b = vec![GpsPoint::new(50.0, 10.0), GpsPoint::new(50.02, 10.051)];
        let forward = classify(&a, &b, 1.0);
        let backward = classify(&b, &a, 1.0);
        assert_eq!(forward, backward.swapped());
        assert_ne!(forward, TrackRelation::Undefined);
    }
}
