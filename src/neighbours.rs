//! # Reference Track Matching
//!
//! Aligns a "current" track against a fixed reference track, point by point.
//!
//! ## Algorithm
//!
//! For every current point:
//!
//! 1. **Candidates**: reference points near the current point from the
//!    reference [`GridLookup`], with the radius widened for sparse points.
//! 2. **Refinement**: each candidate `ir` is replaced by the perpendicular
//!    foot on the closer of the reference segments `[ir-1, ir]` and
//!    `[ir, ir+1]`. A foot at the very end of a segment belongs to the next
//!    one. One correspondence per reference index survives.
//! 3. **Cutoff**: correspondences farther than the match radius are dropped.
//! 4. **Continuity**: the remaining reference indices are split into runs
//!    that are contiguous along the reference; the run closest to the run
//!    chosen for the previous point wins. This keeps an out-and-back or
//!    parallel leg of the reference from stealing matches.
//!
//! Current points left without correspondences are omitted.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{ensure_positive, Result, TrackError};
use crate::geometry::{DVec2, LocalFrame};
use crate::grid::GridLookup;
use crate::track::Track;
use crate::GpsPoint;

/// Configuration for reference matching. Units are meters for GPS input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Largest perpendicular distance of a kept correspondence
    pub radius: f64,
    /// Cell size of the reference grid
    pub cell_size: f64,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            radius: 25.0,
            cell_size: 20.0,
        }
    }
}

impl MatcherConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("radius", self.radius)?;
        ensure_positive("cell_size", self.cell_size)
    }
}

/// One current point matched onto the reference track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correspondence {
    /// Start of the reference segment holding the foot
    pub reference_index: usize,
    pub current_index: usize,
    /// Perpendicular distance from the current point to the reference
    pub distance: f64,
    /// Position of the foot along `[reference_index, reference_index + 1]`
    pub fraction: f64,
    /// Along-track distance of the foot from the reference start
    pub reference_distance: f64,
}

/// A reference track indexed for repeated matching.
#[derive(Debug, Clone)]
pub struct NeighbourMatcher {
    reference: Track,
    grid: GridLookup,
    config: MatcherConfig,
    frame: Option<LocalFrame>,
}

impl NeighbourMatcher {
    /// Index a planar reference track.
    pub fn new(reference: Track, config: MatcherConfig) -> Result<Self> {
        config.validate()?;
        let grid = GridLookup::new(&reference, config.cell_size)?;
        Ok(Self {
            reference,
            grid,
            config,
            frame: None,
        })
    }

    /// Index a GPS reference track, flattened around its own centroid.
    pub fn from_gps(reference: &[GpsPoint], config: MatcherConfig) -> Result<Self> {
        if let Some(i) = reference.iter().position(|p| !p.is_valid()) {
            return Err(TrackError::InvalidCoordinates {
                track_id: "reference".to_string(),
                message: format!("point {} is out of range", i),
            });
        }
        let Some((frame, track)) = Track::flatten(reference) else {
            return Self::new(Track::new(Vec::new()), config);
        };
        let mut matcher = Self::new(track, config)?;
        matcher.frame = Some(frame);
        Ok(matcher)
    }

    pub fn reference(&self) -> &Track {
        &self.reference
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Match a planar track expressed in the reference's coordinates.
    pub fn match_track(&self, current: &Track) -> Vec<Vec<Correspondence>> {
        let radius = self.config.radius;
        let mut previous_mean: Option<f64> = None;
        let mut result = Vec::new();

        for (current_index, candidates) in self.grid.find_track(current, radius) {
            let point = current.points()[current_index];

            let mut by_reference: BTreeMap<usize, Correspondence> = BTreeMap::new();
            for candidate in &candidates {
                let c = self.refine(point, current_index, candidate.index);
                if c.distance > radius {
                    continue;
                }
                by_reference
                    .entry(c.reference_index)
                    .and_modify(|kept| {
                        if c.distance < kept.distance {
                            *kept = c;
                        }
                    })
                    .or_insert(c);
            }
            if by_reference.is_empty() {
                continue;
            }

            // BTreeMap iteration is already sorted by reference index
            let sorted: Vec<Correspondence> = by_reference.into_values().collect();
            let (mut chosen, mean) = select_run(&sorted, radius, previous_mean);
            previous_mean = Some(mean);

            chosen.sort_by(|a, b| {
                a.distance
                    .total_cmp(&b.distance)
                    .then(a.reference_index.cmp(&b.reference_index))
            });
            result.push(chosen);
        }

        debug!(
            "[Matcher] {} of {} current points matched",
            result.len(),
            current.len()
        );
        result
    }

    /// Match a GPS track. It is flattened into the reference's frame.
    pub fn match_gps(&self, current: &[GpsPoint]) -> Result<Vec<Vec<Correspondence>>> {
        if let Some(i) = current.iter().position(|p| !p.is_valid()) {
            return Err(TrackError::InvalidCoordinates {
                track_id: "current".to_string(),
                message: format!("point {} is out of range", i),
            });
        }
        let Some(frame) = &self.frame else {
            return Ok(Vec::new());
        };
        let track = Track::from_gps(current, frame).ok_or_else(|| TrackError::InvalidCoordinates {
            track_id: "current".to_string(),
            message: "track extends beyond the reference hemisphere".to_string(),
        })?;
        Ok(self.match_track(&track))
    }

    /// Perpendicular foot of `point` on the reference segments around `ir`.
    fn refine(&self, point: DVec2, current_index: usize, ir: usize) -> Correspondence {
        let starts = [ir.checked_sub(1), Some(ir)];
        let best = starts
            .into_iter()
            .flatten()
            .filter_map(|start| Some((start, self.reference.segment(start)?)))
            .map(|(start, segment)| (start, segment.perpendicular_foot(point)))
            .min_by(|a, b| a.1.distance.total_cmp(&b.1.distance));

        let distances = self.reference.distance();
        let displacement = self.reference.displacement();

        let Some((mut start, foot)) = best else {
            // Single-point reference
            return Correspondence {
                reference_index: ir,
                current_index,
                distance: self.reference.points()[ir].distance(point),
                fraction: 0.0,
                reference_distance: distances[ir],
            };
        };

        let mut fraction = foot.fraction;
        if fraction >= 1.0 {
            start += 1;
            fraction = 0.0;
        }
        let step = displacement.get(start + 1).copied().unwrap_or(0.0);

        Correspondence {
            reference_index: start,
            current_index,
            distance: foot.distance,
            fraction,
            reference_distance: distances[start] + fraction * step,
        }
    }
}

/// Split correspondences (sorted by reference index) into runs with
/// along-track gaps below `radius` and pick one.
///
/// With a previous run mean the closest run wins; otherwise the run holding
/// the closest correspondence. Returns the run and its mean reference index.
fn select_run(
    sorted: &[Correspondence],
    radius: f64,
    previous_mean: Option<f64>,
) -> (Vec<Correspondence>, f64) {
    let mut runs: Vec<&[Correspondence]> = Vec::new();
    let mut run_start = 0;
    for i in 1..sorted.len() {
        let gap = sorted[i].reference_distance - sorted[i - 1].reference_distance;
        if gap >= radius {
            runs.push(&sorted[run_start..i]);
            run_start = i;
        }
    }
    runs.push(&sorted[run_start..]);

    let chosen = match previous_mean {
        Some(previous) => runs
            .iter()
            .min_by(|a, b| {
                (run_mean(a) - previous)
                    .abs()
                    .total_cmp(&(run_mean(b) - previous).abs())
            })
            .copied(),
        None => runs
            .iter()
            .min_by(|a, b| closest_distance(a).total_cmp(&closest_distance(b)))
            .copied(),
    }
    .unwrap_or(sorted);

    (chosen.to_vec(), run_mean(chosen))
}

fn run_mean(run: &[Correspondence]) -> f64 {
    run.iter().map(|c| c.reference_index as f64).sum::<f64>() / run.len().max(1) as f64
}

fn closest_distance(run: &[Correspondence]) -> f64 {
    run.iter().map(|c| c.distance).fold(f64::INFINITY, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(radius: f64) -> MatcherConfig {
        MatcherConfig {
            radius,
            cell_size: 1.0,
        }
    }

    #[test]
    fn test_single_segment_fractions() {
        let reference = Track::new(vec![DVec2::new(0.0, 0.0), DVec2::new(10.0, 0.0)]);
        let current = Track::new(vec![DVec2::new(1.0, 1.0), DVec2::new(9.0, 1.0)]);
        let matcher = NeighbourMatcher::new(reference, config(2.0)).unwrap();

        let result = matcher.match_track(&current);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].len(), 1);
        assert_eq!(result[1].len(), 1);

        let first = result[0][0];
        assert_eq!(first.reference_index, 0);
        assert_eq!(first.current_index, 0);
        assert!((first.fraction - 0.1).abs() < 1e-12);
        assert!((first.distance - 1.0).abs() < 1e-12);
        assert!((first.reference_distance - 1.0).abs() < 1e-12);

        let second = result[1][0];
        assert_eq!(second.reference_index, 0);
        assert!((second.fraction - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_end_of_segment_rolls_forward() {
        let reference = Track::new(vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(10.0, 0.0),
            DVec2::new(10.0, 10.0),
        ]);
        let current = Track::new(vec![DVec2::new(11.0, -1.0)]);
        let matcher = NeighbourMatcher::new(reference, config(3.0)).unwrap();
        let result = matcher.match_track(&current);

        assert_eq!(result.len(), 1);
        let refs: Vec<usize> = result[0].iter().map(|c| c.reference_index).collect();
        // The corner is owned by segment 1, never by the end of segment 0
        assert!(refs.contains(&1));
        assert!(result[0].iter().all(|c| c.fraction < 1.0));
        assert!(result[0].iter().all(|c| c.reference_index != 0 || c.fraction < 1.0));
    }

    #[test]
    fn test_far_points_omitted() {
        let reference = Track::new((0..=10).map(|i| DVec2::new(i as f64, 0.0)).collect());
        let current = Track::new(vec![
            DVec2::new(2.0, 0.5),
            DVec2::new(5.0, 50.0),
            DVec2::new(8.0, 0.5),
        ]);
        let matcher = NeighbourMatcher::new(reference, config(1.0)).unwrap();
        let result = matcher.match_track(&current);

        let current_indices: Vec<usize> = result.iter().map(|l| l[0].current_index).collect();
        assert_eq!(current_indices, vec![0, 2]);
        for list in &result {
            assert!(list.windows(2).all(|w| w[0].distance <= w[1].distance));
            assert!(list.iter().all(|c| c.distance <= 1.0));
        }
    }

    #[test]
    fn test_out_and_back_keeps_continuity() {
        // Reference goes east along y=0 then returns west along y=4
        let mut points: Vec<DVec2> = (0..=20).map(|i| DVec2::new(i as f64 * 5.0, 0.0)).collect();
        points.extend((0..=20).rev().map(|i| DVec2::new(i as f64 * 5.0, 4.0)));
        let reference = Track::new(points);

        // Current rides the outbound leg, slightly closer to it
        let current = Track::new((1..20).map(|i| DVec2::new(i as f64 * 5.0 + 1.0, 1.5)).collect());
        let matcher = NeighbourMatcher::new(reference, MatcherConfig { radius: 3.0, cell_size: 2.0 })
            .unwrap();
        let result = matcher.match_track(&current);

        assert_eq!(result.len(), current.len());
        for list in &result {
            // Outbound leg only (indices 0..=20)
            assert!(list.iter().all(|c| c.reference_index < 20));
        }
    }

    #[test]
    fn test_gps_matching() {
        let reference: Vec<GpsPoint> = (0..20)
            .map(|i| GpsPoint::new(45.0, 7.0 + i as f64 * 0.0005))
            .collect();
        let current: Vec<GpsPoint> = (0..10)
            .map(|i| GpsPoint::new(45.00005, 7.0002 + i as f64 * 0.001))
            .collect();
        let matcher = NeighbourMatcher::from_gps(&reference, MatcherConfig::default()).unwrap();
        let result = matcher.match_gps(&current).unwrap();

        assert_eq!(result.len(), current.len());
        for list in &result {
            // ~5.6m north of the reference line
            assert!((list[0].distance - 5.56).abs() < 0.2);
        }
        let mut previous = 0;
        for list in &result {
            assert!(list[0].current_index >= previous);
            previous = list[0].current_index;
        }
    }

    #[test]
    fn test_empty_and_invalid() {
        let matcher = NeighbourMatcher::from_gps(&[], MatcherConfig::default()).unwrap();
        assert!(matcher.match_gps(&[GpsPoint::new(0.0, 0.0)]).unwrap().is_empty());

        assert!(NeighbourMatcher::new(Track::new(vec![]), config(0.0)).is_err());
        assert!(NeighbourMatcher::from_gps(&[GpsPoint::new(100.0, 0.0)], MatcherConfig::default()).is_err());
    }
}
