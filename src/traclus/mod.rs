//! # TraClus: partition-and-group trajectory clustering
//!
//! Finds sub-paths shared by many tracks (Lee, Han, Whang 2007).
//!
//! ## Algorithm
//!
//! 1. **Partition** every track into segments between its MDL significant
//!    points ([`significant_points`]), dropping segments shorter than
//!    `min_segment_length`.
//! 2. **Group** all segments with DBSCAN under the weighted
//!    perpendicular/parallel/angular segment distance.
//! 3. **Filter** clusters whose segments come from fewer than
//!    `min_trajectory_count` distinct tracks.
//! 4. **Represent** each surviving cluster by a sweep-line average path.
//!
//! Planar/Cartesian input goes through [`cluster_trajectories`]; GPS tracks
//! go through [`cluster_gps_tracks`], which flattens them into one shared
//! tangent-plane frame (meters) first.

mod partition;
mod representative;

pub use partition::{polyline_to_segments, significant_points};
pub use representative::RepresentativeTrajectory;

use std::collections::{BTreeMap, BTreeSet};

use log::info;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::dbscan::{dbscan, DbscanConfig, Metric};
use crate::error::{ensure_positive, Result, TrackError};
use crate::geometry::{Coordinates, Segment};
use crate::index::Bounded;
use crate::track::flatten_tracks;
use crate::GpsPoint;

/// Weights of the three segment distance components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistanceWeights {
    pub perpendicular: f64,
    pub parallel: f64,
    pub angular: f64,
}

impl Default for DistanceWeights {
    fn default() -> Self {
        Self {
            perpendicular: 1.0,
            parallel: 1.0,
            angular: 1.0,
        }
    }
}

/// Configuration for trajectory clustering.
///
/// Lengths are in the units of the input; for [`cluster_gps_tracks`] that is
/// meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraclusConfig {
    /// DBSCAN neighborhood radius under the weighted segment distance
    pub eps: f64,
    /// Minimum neighborhood size for a core segment
    pub min_points: usize,
    /// Minimum number of distinct tracks a cluster must span; also the
    /// minimum sweep density of a representative vertex
    pub min_trajectory_count: usize,
    /// Bits a partition must save before a track is cut (higher = fewer cuts)
    pub cost_advantage: f64,
    /// Shortest segment kept after partitioning; also the representative
    /// smoothing length
    pub min_segment_length: f64,
    /// Treat opposite segments as far apart
    pub direction: bool,
    pub weights: DistanceWeights,
}

impl Default for TraclusConfig {
    fn default() -> Self {
        Self {
            eps: 25.0,
            min_points: 3,
            min_trajectory_count: 2,
            cost_advantage: 5.0,
            min_segment_length: 10.0,
            direction: true,
            weights: DistanceWeights::default(),
        }
    }
}

impl TraclusConfig {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("eps", self.eps)?;
        if self.min_points == 0 {
            return Err(TrackError::InvalidParameter {
                name: "min_points",
                message: "must be at least 1".to_string(),
            });
        }
        if self.min_trajectory_count == 0 {
            return Err(TrackError::InvalidParameter {
                name: "min_trajectory_count",
                message: "must be at least 1".to_string(),
            });
        }
        if !self.cost_advantage.is_finite() {
            return Err(TrackError::InvalidParameter {
                name: "cost_advantage",
                message: format!("must be finite, got {}", self.cost_advantage),
            });
        }
        if !(self.min_segment_length >= 0.0 && self.min_segment_length.is_finite()) {
            return Err(TrackError::InvalidParameter {
                name: "min_segment_length",
                message: format!("must be a finite non-negative length, got {}", self.min_segment_length),
            });
        }
        let w = &self.weights;
        if [w.perpendicular, w.parallel, w.angular]
            .iter()
            .any(|v| !(*v >= 0.0 && v.is_finite()))
        {
            return Err(TrackError::InvalidParameter {
                name: "weights",
                message: "distance weights must be finite and non-negative".to_string(),
            });
        }
        Ok(())
    }

    fn dbscan_config(&self) -> DbscanConfig {
        DbscanConfig::new(self.eps, self.min_points).with_direction(self.direction)
    }
}

/// A partitioned piece of a track, tagged with where it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrajectorySegment<P> {
    pub segment: Segment<P>,
    /// Index of the source track
    pub owner: usize,
    /// Original point indices of the segment endpoints
    pub index_a: usize,
    pub index_b: usize,
    pub weights: DistanceWeights,
}

impl<P: Coordinates> Bounded<P> for TrajectorySegment<P> {
    fn envelope(&self) -> (P, P) {
        self.segment.bounds()
    }
}

impl<P: Coordinates> Metric for TrajectorySegment<P> {
    fn distance_to(&self, other: &Self, direction: bool) -> f64 {
        let w = &self.weights;
        self.segment
            .trajectory_components(&other.segment, direction)
            .weighted(w.perpendicular, w.parallel, w.angular)
    }

    /// The gap between two segments is at most `2 * perpendicular + parallel`,
    /// so the padding scales with the smaller of the two effective weights.
    /// With either weight at zero the gap is unbounded.
    fn search_radius(&self, eps: f64) -> Option<f64> {
        let w = &self.weights;
        let scale = (w.perpendicular / 2.0).min(w.parallel);
        (scale > 0.0).then(|| eps / scale)
    }
}

/// Partition one track into trajectory segments.
pub fn partition_track<P: Coordinates>(
    owner: usize,
    points: &[P],
    config: &TraclusConfig,
) -> Vec<TrajectorySegment<P>> {
    let significant = significant_points(points, config.cost_advantage);
    polyline_to_segments(points, &significant, config.min_segment_length)
        .into_iter()
        .map(|(index_a, index_b)| TrajectorySegment {
            segment: Segment::new(points[index_a], points[index_b]),
            owner,
            index_a,
            index_b,
            weights: config.weights,
        })
        .collect()
}

/// Cluster planar or Cartesian tracks and return one representative path per
/// dense group of segments.
///
/// Track indices in the result ([`RepresentativeTrajectory::segment_indices`])
/// are positions in `tracks`.
pub fn cluster_trajectories<T, P>(
    tracks: &[T],
    config: &TraclusConfig,
) -> Result<Vec<RepresentativeTrajectory<P>>>
where
    T: AsRef<[P]> + Sync,
    P: Coordinates,
{
    config.validate()?;
    for (i, track) in tracks.iter().enumerate() {
        if let Some(k) = track.as_ref().iter().position(|p| !p.is_finite()) {
            return Err(TrackError::InvalidCoordinates {
                track_id: i.to_string(),
                message: format!("point {} is not finite", k),
            });
        }
    }

    let partition_start = std::time::Instant::now();

    #[cfg(feature = "parallel")]
    let per_track: Vec<Vec<TrajectorySegment<P>>> = tracks
        .par_iter()
        .enumerate()
        .map(|(owner, track)| partition_track(owner, track.as_ref(), config))
        .collect();

    #[cfg(not(feature = "parallel"))]
    let per_track: Vec<Vec<TrajectorySegment<P>>> = tracks
        .iter()
        .enumerate()
        .map(|(owner, track)| partition_track(owner, track.as_ref(), config))
        .collect();

    let segments: Vec<TrajectorySegment<P>> = per_track.into_iter().flatten().collect();
    info!(
        "[TraClus] Partitioned {} tracks into {} segments in {}ms",
        tracks.len(),
        segments.len(),
        partition_start.elapsed().as_millis()
    );

    let cluster_start = std::time::Instant::now();
    let clustering = dbscan(&segments, &config.dbscan_config())?;

    let clusters: Vec<&Vec<usize>> = clustering
        .clusters
        .iter()
        .filter(|members| {
            let owners: BTreeSet<usize> = members.iter().map(|&m| segments[m].owner).collect();
            owners.len() >= config.min_trajectory_count
        })
        .collect();
    info!(
        "[TraClus] {} segment clusters, {} span at least {} tracks ({}ms)",
        clustering.len(),
        clusters.len(),
        config.min_trajectory_count,
        cluster_start.elapsed().as_millis()
    );

    let sweep = |members: &Vec<usize>| {
        representative::sweep_representative(
            &segments,
            members,
            config.min_trajectory_count,
            config.min_segment_length,
        )
    };

    #[cfg(feature = "parallel")]
    let representatives: Vec<RepresentativeTrajectory<P>> =
        clusters.into_par_iter().filter_map(sweep).collect();

    #[cfg(not(feature = "parallel"))]
    let representatives: Vec<RepresentativeTrajectory<P>> =
        clusters.into_iter().filter_map(sweep).collect();

    info!("[TraClus] Produced {} representative paths", representatives.len());
    Ok(representatives)
}

/// A representative path in GPS coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpsRepresentative {
    pub points: Vec<GpsPoint>,
    /// Track index -> sorted original point indices that contributed
    pub segment_indices: BTreeMap<usize, Vec<usize>>,
}

impl GpsRepresentative {
    /// Number of distinct tracks sharing this path.
    pub fn track_count(&self) -> usize {
        self.segment_indices.len()
    }
}

/// Cluster GPS tracks. Distances in `config` are meters.
///
/// All tracks are flattened into one tangent-plane frame centered on their
/// combined centroid, so the tracks must lie within one hemisphere of it.
pub fn cluster_gps_tracks<T>(tracks: &[T], config: &TraclusConfig) -> Result<Vec<GpsRepresentative>>
where
    T: AsRef<[GpsPoint]>,
{
    for (i, track) in tracks.iter().enumerate() {
        if let Some(k) = track.as_ref().iter().position(|p| !p.is_valid()) {
            return Err(TrackError::InvalidCoordinates {
                track_id: i.to_string(),
                message: format!("point {} is out of range", k),
            });
        }
    }
    if tracks.iter().all(|t| t.as_ref().is_empty()) {
        config.validate()?;
        return Ok(Vec::new());
    }

    let (frame, flat) = flatten_tracks(tracks).ok_or_else(|| TrackError::InvalidCoordinates {
        track_id: "*".to_string(),
        message: "tracks do not fit in one hemisphere".to_string(),
    })?;

    let representatives = cluster_trajectories(&flat, config)?;
    Ok(representatives
        .into_iter()
        .map(|rep| GpsRepresentative {
            points: rep.points.iter().map(|p| frame.unflatten(*p)).collect(),
            segment_indices: rep.segment_indices,
        })
        .collect())
}
