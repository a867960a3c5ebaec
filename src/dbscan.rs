//! DBSCAN: Density-Based Spatial Clustering of Applications with Noise.
//!
//! Generic over any object that has a bounding box ([`Bounded`]) and a
//! distance to objects of its own type ([`Metric`]). The distance may be
//! asymmetric and direction-aware; the `direction` flag of the config is
//! forwarded to it unchanged.
//!
//! ## Algorithm Steps
//!
//! 1. Build a [`ProximityIndex`] over the objects' bounding boxes.
//! 2. For each unvisited object P:
//!    - Find its eps-neighborhood (index candidates refined by the exact metric;
//!      P itself is always a member)
//!    - If the neighborhood is smaller than `min_points`, P stays noise
//!    - Else open a new cluster and expand it breadth-first: every core
//!      neighbor contributes its own neighborhood to the work queue, and every
//!      neighbor not yet in a cluster joins this one
//!
//! Cluster ids follow input order. Members are listed in the order they
//! joined the cluster.
//!
//! ## References
//!
//! Ester et al. (1996). "A Density-Based Algorithm for Discovering Clusters
//! in Large Spatial Databases with Noise." KDD-96.

use std::collections::VecDeque;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{ensure_positive, Result, TrackError};
use crate::geometry::{Coordinates, DVec2, DVec3};
use crate::index::{Bounded, ProximityIndex};

/// Distance between two objects of the same type.
pub trait Metric {
    /// Distance from `self` to `other`. With `direction` set, objects pointing
    /// in opposite directions may be considered far apart.
    fn distance_to(&self, other: &Self, direction: bool) -> f64;

    /// Envelope padding that finds every object within `eps` of this one.
    ///
    /// Must be at least the largest gap between two bounding boxes whose
    /// objects are `eps` apart. `None` when no padding is enough and the
    /// neighborhood query has to scan every object.
    fn search_radius(&self, eps: f64) -> Option<f64> {
        Some(eps)
    }
}

impl Metric for DVec2 {
    fn distance_to(&self, other: &Self, _direction: bool) -> f64 {
        self.distance(*other)
    }
}

impl Metric for DVec3 {
    fn distance_to(&self, other: &Self, _direction: bool) -> f64 {
        self.distance(*other)
    }
}

/// Configuration for density clustering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbscanConfig {
    /// Neighborhood radius in the units of the metric
    pub eps: f64,
    /// Minimum neighborhood size (including the object itself) for a core object
    pub min_points: usize,
    /// Forwarded to [`Metric::distance_to`]
    pub direction: bool,
}

impl Default for DbscanConfig {
    fn default() -> Self {
        Self {
            eps: 1.0,
            min_points: 3,
            direction: false,
        }
    }
}

impl DbscanConfig {
    pub fn new(eps: f64, min_points: usize) -> Self {
        Self {
            eps,
            min_points,
            direction: false,
        }
    }

    pub fn with_direction(mut self, direction: bool) -> Self {
        self.direction = direction;
        self
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive("eps", self.eps)?;
        if self.min_points == 0 {
            return Err(TrackError::InvalidParameter {
                name: "min_points",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Per-object clustering state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    /// Never reached by the scan
    Unvisited,
    /// Visited but not density-reachable from any core object
    Noise,
    /// Member of the cluster with this id
    Cluster(usize),
}

/// Result of a DBSCAN run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clustering {
    /// Member indices per cluster; cluster ids are positions in this list
    pub clusters: Vec<Vec<usize>>,
    /// Final label of every input object
    pub labels: Vec<Label>,
}

impl Clustering {
    fn all_noise(n: usize) -> Self {
        Self {
            clusters: Vec::new(),
            labels: vec![Label::Noise; n],
        }
    }

    /// Number of clusters found.
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Indices of objects that belong to no cluster.
    pub fn noise(&self) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, l)| !matches!(l, Label::Cluster(_)))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Cluster `objects`; each object counts as one toward `min_points`.
///
/// # Example
/// ```
/// use track_matcher::{dbscan, DbscanConfig, DVec2};
///
/// let points = vec![
///     DVec2::new(0.0, 0.0), DVec2::new(0.5, 0.0), DVec2::new(0.0, 0.5),
///     DVec2::new(10.0, 10.0),
/// ];
/// let result = dbscan(&points, &DbscanConfig::new(1.0, 3)).unwrap();
/// assert_eq!(result.clusters.len(), 1);
/// assert_eq!(result.noise(), vec![3]);
/// ```
pub fn dbscan<T, P>(objects: &[T], config: &DbscanConfig) -> Result<Clustering>
where
    T: Bounded<P> + Metric,
    P: Coordinates,
{
    config.validate()?;
    if objects.len() < config.min_points {
        return Ok(Clustering::all_noise(objects.len()));
    }
    let index = ProximityIndex::build(objects);
    Ok(run(objects, &index, config, |members| members.len() as f64))
}

/// Cluster `objects` reusing an index previously built over the same list.
pub fn dbscan_with_index<T, P>(
    objects: &[T],
    index: &ProximityIndex<P>,
    config: &DbscanConfig,
) -> Result<Clustering>
where
    T: Bounded<P> + Metric,
    P: Coordinates,
{
    config.validate()?;
    if index.len() != objects.len() {
        return Err(TrackError::LengthMismatch {
            what: "proximity index entries",
            expected: objects.len(),
            found: index.len(),
        });
    }
    if objects.len() < config.min_points {
        return Ok(Clustering::all_noise(objects.len()));
    }
    Ok(run(objects, index, config, |members| members.len() as f64))
}

/// Weighted variant: a neighborhood is dense when the summed weight of its
/// members reaches `min_points`.
pub fn dbscan_weighted<T, P>(
    objects: &[T],
    weights: &[f64],
    config: &DbscanConfig,
) -> Result<Clustering>
where
    T: Bounded<P> + Metric,
    P: Coordinates,
{
    config.validate()?;
    if weights.len() != objects.len() {
        return Err(TrackError::LengthMismatch {
            what: "weights",
            expected: objects.len(),
            found: weights.len(),
        });
    }
    if let Some(bad) = weights.iter().position(|w| !w.is_finite() || *w < 0.0) {
        return Err(TrackError::InvalidParameter {
            name: "weights",
            message: format!("weight {} is negative or not finite", bad),
        });
    }

    let total: f64 = weights.iter().sum();
    if total < config.min_points as f64 {
        return Ok(Clustering::all_noise(objects.len()));
    }
    let index = ProximityIndex::build(objects);
    Ok(run(objects, &index, config, |members| {
        members.iter().map(|&i| weights[i]).sum()
    }))
}

/// Exact eps-neighborhood of `objects[p]` (always contains `p`).
fn region_query<T, P>(
    objects: &[T],
    index: &ProximityIndex<P>,
    p: usize,
    config: &DbscanConfig,
) -> Vec<usize>
where
    T: Bounded<P> + Metric,
    P: Coordinates,
{
    let origin = &objects[p];
    let candidates = match origin.search_radius(config.eps) {
        Some(radius) => index.search_around(origin, radius),
        None => index.all(),
    };
    let mut neighbours: Vec<usize> = candidates
        .into_iter()
        .filter(|&c| c == p || origin.distance_to(&objects[c], config.direction) <= config.eps)
        .collect();
    // Index order is unspecified; keep expansion deterministic
    neighbours.sort_unstable();
    neighbours
}

fn run<T, P, D>(
    objects: &[T],
    index: &ProximityIndex<P>,
    config: &DbscanConfig,
    density: D,
) -> Clustering
where
    T: Bounded<P> + Metric,
    P: Coordinates,
    D: Fn(&[usize]) -> f64,
{
    let n = objects.len();
    let threshold = config.min_points as f64;
    let mut labels = vec![Label::Unvisited; n];
    let mut visited = vec![false; n];
    // Last cluster whose work queue contained each object
    let mut queued_for: Vec<Option<usize>> = vec![None; n];
    let mut clusters: Vec<Vec<usize>> = Vec::new();

    for p in 0..n {
        if visited[p] {
            continue;
        }
        visited[p] = true;

        let neighbours = region_query(objects, index, p, config);
        if density(&neighbours) < threshold {
            if labels[p] == Label::Unvisited {
                labels[p] = Label::Noise;
            }
            continue;
        }

        let cluster_id = clusters.len();
        let mut members = vec![p];
        labels[p] = Label::Cluster(cluster_id);
        queued_for[p] = Some(cluster_id);

        let mut queue: VecDeque<usize> = VecDeque::with_capacity(neighbours.len());
        for q in neighbours {
            if queued_for[q] != Some(cluster_id) {
                queued_for[q] = Some(cluster_id);
                queue.push_back(q);
            }
        }

        while let Some(q) = queue.pop_front() {
            if !visited[q] {
                visited[q] = true;
                let q_neighbours = region_query(objects, index, q, config);
                if density(&q_neighbours) >= threshold {
                    for r in q_neighbours {
                        if queued_for[r] != Some(cluster_id) {
                            queued_for[r] = Some(cluster_id);
                            queue.push_back(r);
                        }
                    }
                }
            }

            if !matches!(labels[q], Label::Cluster(_)) {
                labels[q] = Label::Cluster(cluster_id);
                members.push(q);
            }
        }

        clusters.push(members);
    }

    debug!(
        "[Dbscan] {} objects -> {} clusters (eps={}, min_points={})",
        n,
        clusters.len(),
        config.eps,
        config.min_points
    );

    Clustering { clusters, labels }
}
