//! Representative trajectory of a segment cluster.
//!
//! The cluster is rotated so that its average direction becomes the x axis,
//! and a sweep line moves along that axis over the sorted segment endpoints. Where
//! enough segments are active and the sweep has advanced far enough since the
//! previous vertex, a vertex is emitted at the mean of the active segments'
//! positions at the sweep coordinate.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::geometry::{mean, Coordinates, GEOMETRY_EPSILON};

use super::TrajectorySegment;

/// Path summarizing one cluster of trajectory segments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepresentativeTrajectory<P> {
    /// Vertices in sweep order
    pub points: Vec<P>,
    /// Owner track -> sorted original point indices spanned by the segments
    /// that contributed to a vertex
    pub segment_indices: BTreeMap<usize, Vec<usize>>,
    /// Indices (into the clustered segment list) of the cluster members
    pub members: Vec<usize>,
}

impl<P> RepresentativeTrajectory<P> {
    /// Owner tracks that contributed to the path, ascending.
    pub fn track_ids(&self) -> Vec<usize> {
        self.segment_indices.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// One endpoint of a rotated member segment.
struct SweepEvent {
    x: f64,
    member: usize,
}

/// Position of the rotated segment `(a, b)` at sweep coordinate `x`.
fn position_at<P: Coordinates>(a: P, b: P, x: f64) -> P {
    let dx = b.x() - a.x();
    if dx.abs() <= GEOMETRY_EPSILON {
        return a.lerp(b, 0.5);
    }
    let t = ((x - a.x()) / dx).clamp(0.0, 1.0);
    a.lerp(b, t)
}

/// Sweep the cluster `members` of `segments` into a representative path.
///
/// A vertex needs at least `min_density` active segments, and consecutive
/// vertices are at least `min_length / sqrt(2)` apart along the sweep axis.
/// Returns `None` when fewer than two vertices result.
pub(crate) fn sweep_representative<P: Coordinates>(
    segments: &[TrajectorySegment<P>],
    members: &[usize],
    min_density: usize,
    min_length: f64,
) -> Option<RepresentativeTrajectory<P>> {
    if members.is_empty() {
        return None;
    }

    let directions: Vec<P> = members
        .iter()
        .map(|&m| segments[m].segment.direction())
        .collect();
    let average = mean(&directions)?;
    // Opposite members can cancel out; fall back to the first usable direction
    let rotation = P::rotation_onto_x(average)
        .filter(|_| average.length() > GEOMETRY_EPSILON)
        .or_else(|| directions.iter().find_map(|d| P::rotation_onto_x(*d)))?;

    let rotated: Vec<(P, P)> = members
        .iter()
        .map(|&m| {
            let s = &segments[m].segment;
            (P::rotate_onto_x(&rotation, s.a), P::rotate_onto_x(&rotation, s.b))
        })
        .collect();

    let mut events: Vec<SweepEvent> = rotated
        .iter()
        .enumerate()
        .flat_map(|(member, (a, b))| {
            [
                SweepEvent { x: a.x(), member },
                SweepEvent { x: b.x(), member },
            ]
        })
        .collect();
    events.sort_by(|p, q| {
        p.x.partial_cmp(&q.x)
            .unwrap_or(Ordering::Equal)
            .then(p.member.cmp(&q.member))
    });

    let min_step = min_length / std::f64::consts::SQRT_2;
    let mut entered = vec![false; members.len()];
    let mut active: BTreeSet<usize> = BTreeSet::new();
    let mut last_x: Option<f64> = None;
    let mut points = Vec::new();
    let mut spanned: BTreeMap<usize, BTreeSet<usize>> = BTreeMap::new();

    for event in &events {
        let entering = !entered[event.member];
        if entering {
            entered[event.member] = true;
            active.insert(event.member);
        }

        let far_enough = last_x.map_or(true, |last| event.x - last >= min_step);
        if active.len() >= min_density && far_enough {
            let positions: Vec<P> = active
                .iter()
                .map(|&k| position_at(rotated[k].0, rotated[k].1, event.x))
                .collect();
            if let Some(centre) = mean(&positions) {
                points.push(P::rotate_from_x(&rotation, centre));
                last_x = Some(event.x);

                for &k in &active {
                    let seg = &segments[members[k]];
                    spanned
                        .entry(seg.owner)
                        .or_default()
                        .extend(seg.index_a..=seg.index_b);
                }
            }
        }

        if !entering {
            active.remove(&event.member);
        }
    }

    if points.len() < 2 {
        return None;
    }

    Some(RepresentativeTrajectory {
        points,
        segment_indices: spanned
            .into_iter()
            .map(|(owner, indices)| (owner, indices.into_iter().collect()))
            .collect(),
        members: members.to_vec(),
    })
}
