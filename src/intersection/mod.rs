//! # Track Intersection
//!
//! Classifies the spatial relation of two GPS tracks with one of three
//! independent strategies:
//!
//! | Strategy | Compares | Can report |
//! |----------|----------|------------|
//! | [`IntersectionStrategy::MinCircle`] | minimal enclosing spherical caps | all relations |
//! | [`IntersectionStrategy::Rect`] | tangent-plane bounding rectangles | all relations |
//! | [`IntersectionStrategy::Grid`] | cells visited on a lat/lng grid | `Same`, `Overlapping`, `NotIntersecting` |
//!
//! Relations are stated from the first track's point of view: `Inside`
//! means the first track lies within the second, `Outside` that it
//! encloses the second. Swapping the arguments swaps those two and keeps
//! every other relation.

pub mod min_circle;
mod rect;
mod sphere_grid;

pub use min_circle::{minimal_cap, track_cap, SphericalCap};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{ensure_positive, Result, TrackError};
use crate::GpsPoint;

/// Spatial relation between two tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackRelation {
    /// A track is empty or its summary shape cannot be computed
    Undefined,
    NotIntersecting,
    Overlapping,
    Same,
    /// The first track lies within the second
    Inside,
    /// The first track encloses the second
    Outside,
}

impl TrackRelation {
    /// The relation with the arguments swapped.
    pub fn swapped(self) -> Self {
        match self {
            TrackRelation::Inside => TrackRelation::Outside,
            TrackRelation::Outside => TrackRelation::Inside,
            other => other,
        }
    }

    /// Whether the tracks share any ground.
    pub fn intersects(self) -> bool {
        matches!(
            self,
            TrackRelation::Overlapping
                | TrackRelation::Same
                | TrackRelation::Inside
                | TrackRelation::Outside
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntersectionStrategy {
    MinCircle,
    Rect,
    Grid,
}

/// Configuration for intersection tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntersectionConfig {
    /// Latitude and longitude bands of the grid strategy
    pub grid_resolution: usize,
    /// Bisection depth limit when rasterizing long steps
    pub max_bisection_depth: u32,
    /// Meters within which centers and extents count as equal
    pub same_tolerance: f64,
}

impl Default for IntersectionConfig {
    fn default() -> Self {
        Self {
            grid_resolution: 18_000,
            max_bisection_depth: 16,
            same_tolerance: 1.0,
        }
    }
}

impl IntersectionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.grid_resolution < 3 {
            return Err(TrackError::InvalidParameter {
                name: "grid_resolution",
                message: format!("must be at least 3, got {}", self.grid_resolution),
            });
        }
        ensure_positive("same_tolerance", self.same_tolerance)
    }
}

/// Classify the relation of track `a` to track `b`.
///
/// Empty tracks and tracks with invalid coordinates are
/// [`TrackRelation::Undefined`].
pub fn classify_tracks(
    a: &[GpsPoint],
    b: &[GpsPoint],
    strategy: IntersectionStrategy,
    config: &IntersectionConfig,
) -> TrackRelation {
    if a.is_empty() || b.is_empty() {
        return TrackRelation::Undefined;
    }
    if !a.iter().chain(b).all(GpsPoint::is_valid) {
        return TrackRelation::Undefined;
    }

    let relation = match strategy {
        IntersectionStrategy::MinCircle => min_circle::classify(a, b, config.same_tolerance),
        IntersectionStrategy::Rect => rect::classify(a, b, config.same_tolerance),
        IntersectionStrategy::Grid => sphere_grid::classify(
            a,
            b,
            config.grid_resolution,
            config.max_bisection_depth,
        ),
    };

    debug!(
        "[Intersect] {:?}: {} vs {} points -> {:?}",
        strategy,
        a.len(),
        b.len(),
        relation
    );
    relation
}
