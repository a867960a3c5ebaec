//! # Track Matcher
//!
//! Trajectory analysis for GPS tracks.
//!
//! This library provides:
//! - Common sub-path detection across many tracks (TraClus partition-and-group)
//! - Point-by-point matching of a track against a fixed reference track
//! - Spherical intersection tests between two tracks (three strategies)
//!
//! The building blocks are exposed as well: a generic DBSCAN over any
//! [`Bounded`] + [`Metric`] object, an R-tree backed [`ProximityIndex`], and a
//! uniform [`GridLookup`] with line rasterization.
//!
//! ## Features
//!
//! - **`parallel`** - Enable parallel processing with rayon
//!
//! ## Quick Start
//!
//! ```rust
//! use track_matcher::{GpsPoint, TrackRelation, classify_tracks, IntersectionStrategy, IntersectionConfig};
//!
//! let track_a = vec![
//!     GpsPoint::new(51.5074, -0.1278),
//!     GpsPoint::new(51.5080, -0.1290),
//!     GpsPoint::new(51.5090, -0.1300),
//! ];
//! let track_b = track_a.clone();
//!
//! let relation = classify_tracks(
//!     &track_a,
//!     &track_b,
//!     IntersectionStrategy::MinCircle,
//!     &IntersectionConfig::default(),
//! );
//! assert_eq!(relation, TrackRelation::Same);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, TrackError};

// Vector, segment and spherical primitives
pub mod geometry;
pub use geometry::{Coordinates, DVec2, DVec3, LocalFrame, Segment, EARTH_RADIUS};

// Geographic utilities (distance, length, center calculations)
pub mod geo_utils;

// Tracks with precomputed cumulative distances
pub mod track;
pub use track::{flatten_tracks, Track};

// R-tree backed proximity index
pub mod index;
pub use index::{Bounded, ProximityIndex};

// Density clustering
pub mod dbscan;
pub use dbscan::{dbscan, dbscan_weighted, Clustering, DbscanConfig, Label, Metric};

// Partition-and-group trajectory clustering
pub mod traclus;
pub use traclus::{
    cluster_gps_tracks, cluster_trajectories, polyline_to_segments, significant_points,
    DistanceWeights, GpsRepresentative, RepresentativeTrajectory, TraclusConfig,
    TrajectorySegment,
};

// Uniform grid spatial index
pub mod grid;
pub use grid::{GridLookup, GridMatch};

// Reference track matching
pub mod neighbours;
pub use neighbours::{Correspondence, MatcherConfig, NeighbourMatcher};

// Track intersection tests
pub mod intersection;
pub use intersection::{
    classify_tracks, IntersectionConfig, IntersectionStrategy, TrackRelation,
};

// Algorithm toolbox - modular access to all algorithms
pub mod algorithms;

// LRU cache for built matchers
pub mod lru_cache;

// Stateful track engine (singleton with all track state)
pub mod engine;
pub use engine::{
    with_engine, CommonPath, EngineConfig, EngineStats, PairRelation, TrackEngine, ENGINE,
};

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude, longitude and elevation.
///
/// # Example
/// ```
/// use track_matcher::GpsPoint;
/// let point = GpsPoint::new(51.5074, -0.1278); // London
/// assert_eq!(point.elevation, 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Meters above the reference sphere
    #[serde(default)]
    pub elevation: f64,
}

impl GpsPoint {
    /// Create a new GPS point at zero elevation.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation: 0.0,
        }
    }

    pub fn with_elevation(latitude: f64, longitude: f64, elevation: f64) -> Self {
        Self {
            latitude,
            longitude,
            elevation,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.elevation.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }

    /// Direction of the point from the Earth's center.
    pub fn unit_vector(&self) -> DVec3 {
        let (sin_lat, cos_lat) = self.latitude.to_radians().sin_cos();
        let (sin_lng, cos_lng) = self.longitude.to_radians().sin_cos();
        DVec3::new(cos_lat * cos_lng, cos_lat * sin_lng, sin_lat)
    }

    /// Earth-centered Cartesian position in meters.
    pub fn to_cartesian(&self) -> DVec3 {
        self.unit_vector() * (EARTH_RADIUS + self.elevation)
    }

    /// Inverse of [`to_cartesian`](Self::to_cartesian).
    pub fn from_cartesian(v: DVec3) -> Self {
        let mut point = Self::from_direction(v);
        point.elevation = v.length() - EARTH_RADIUS;
        point
    }

    /// Latitude/longitude of a direction vector, at zero elevation.
    pub fn from_direction(v: DVec3) -> Self {
        let horizontal = v.x.hypot(v.y);
        Self::new(
            v.z.atan2(horizontal).to_degrees(),
            v.y.atan2(v.x).to_degrees(),
        )
    }

    /// Equality of position within `epsilon` degrees.
    pub fn approx_eq(&self, other: &GpsPoint, epsilon: f64) -> bool {
        (self.latitude - other.latitude).abs() <= epsilon
            && (self.longitude - other.longitude).abs() <= epsilon
    }
}

// ============================================================================
// Tests
// ============================================================================
