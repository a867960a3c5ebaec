//! Trajectory partitioning by minimum description length (MDL).
//!
//! A track is reduced to its "significant points": the greedy scan keeps
//! extending a candidate segment while describing the span by that single
//! segment (model cost + deviation cost) is no more expensive than describing
//! it step by step. Costs are measured in bits, `ceil(log2(max(x, 1)))`.

use crate::geometry::{Coordinates, Segment};

/// Bits needed to encode a length (lengths below 1 are free).
#[inline]
fn encoding_bits(value: f64) -> f64 {
    value.max(1.0).log2().ceil()
}

/// Cost of describing `points[start..=end]` by the single segment `[start, end]`:
/// the segment's own length plus the perpendicular and angular deviation of
/// every original step from it.
fn partition_cost<P: Coordinates>(points: &[P], start: usize, end: usize) -> f64 {
    let candidate = Segment::new(points[start], points[end]);
    let model = encoding_bits(candidate.length());

    let deviation: f64 = (start..end)
        .map(|k| {
            let step = Segment::new(points[k], points[k + 1]);
            let c = candidate.components_against(&step, true);
            encoding_bits(c.perpendicular) + encoding_bits(c.angular)
        })
        .sum();

    model + deviation
}

/// Model cost of a single original step.
#[inline]
fn step_cost<P: Coordinates>(points: &[P], k: usize) -> f64 {
    encoding_bits(points[k].distance(points[k + 1]))
}

/// Indices of the significant points of a polyline.
///
/// Always starts with 0 and ends with the last index. A larger
/// `cost_advantage` suppresses cuts and yields fewer, longer segments.
///
/// # Example
/// ```
/// use track_matcher::{significant_points, DVec2};
///
/// let straight: Vec<DVec2> = (0..20).map(|i| DVec2::new(i as f64 * 10.0, 0.0)).collect();
/// assert_eq!(significant_points(&straight, 0.0), vec![0, 19]);
/// ```
pub fn significant_points<P: Coordinates>(points: &[P], cost_advantage: f64) -> Vec<usize> {
    let n = points.len();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![0];
    }

    let mut result = vec![0];
    let mut start = 0;
    let mut length = 1;
    let mut step_total = step_cost(points, 0);

    while start + length < n {
        let current = start + length;
        let cost_partition = partition_cost(points, start, current);

        if step_total + cost_advantage < cost_partition && current - 1 > start {
            result.push(current - 1);
            start = current - 1;
            length = 1;
            step_total = step_cost(points, start);
        } else {
            length += 1;
            if start + length < n {
                step_total += step_cost(points, start + length - 1);
            }
        }
    }

    if result.last() != Some(&(n - 1)) {
        result.push(n - 1);
    }
    result
}

/// Consecutive significant-point pairs whose segment is at least `min_length`
/// long. Shorter gaps are skipped, not merged into a neighbour.
pub fn polyline_to_segments<P: Coordinates>(
    points: &[P],
    significant: &[usize],
    min_length: f64,
) -> Vec<(usize, usize)> {
    let floor = min_length.max(f64::EPSILON);
    significant
        .windows(2)
        .filter(|w| points[w[0]].distance(points[w[1]]) >= floor)
        .map(|w| (w[0], w[1]))
        .collect()
}
