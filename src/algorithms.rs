//! # Algorithm Toolbox
//!
//! Direct access to every trajectory algorithm, for integrating specific
//! pieces into your own systems without the stateful engine.
//!
//! ## Core Algorithms
//!
//! - **Density Clustering**: generic DBSCAN over R-tree indexed objects
//! - **Trajectory Clustering**: TraClus partition-and-group
//! - **Grid Lookup**: uniform grid with line rasterization
//! - **Reference Matching**: per-point correspondences against a reference
//! - **Intersection Tests**: MinCircle, Rect and Grid strategies
//!
//! ## Geographic Utilities
//!
//! - **Haversine Distance**: Great-circle distance between GPS points
//! - **Polyline Length**: Total distance along a path
//! - **Spherical Centroid**: Center of a GPS track on the unit sphere
//!
//! # Example
//!
//! ```rust
//! use track_matcher::algorithms::{
//!     classify_tracks, haversine_distance, GpsPoint, IntersectionConfig,
//!     IntersectionStrategy, TrackRelation,
//! };
//!
//! let london = GpsPoint::new(51.5074, -0.1278);
//! let paris = GpsPoint::new(48.8566, 2.3522);
//! let distance = haversine_distance(&london, &paris);
//! assert!((distance / 1000.0 - 343.0).abs() < 5.0);
//!
//! let relation = classify_tracks(
//!     &[london],
//!     &[paris],
//!     IntersectionStrategy::MinCircle,
//!     &IntersectionConfig::default(),
//! );
//! assert_eq!(relation, TrackRelation::NotIntersecting);
//! ```

// =============================================================================
// Core Types (re-exported from lib)
// =============================================================================

pub use crate::{GpsPoint, Track, TrackError};

pub use crate::geometry::{
    angle_between, great_circle_midpoint, mean, Coordinates, DistanceComponents, DVec2, DVec3,
    LocalFrame, Segment, EARTH_RADIUS,
};

// =============================================================================
// Geographic Utilities
// =============================================================================

pub use crate::geo_utils::{
    compute_center, great_circle_distance, haversine_distance, polyline_length,
};

// =============================================================================
// Spatial Indexing
// =============================================================================

/// R-tree backed index over anything with an axis-aligned envelope.
pub use crate::index::{Bounded, ProximityIndex};

/// Uniform grid over a planar track.
pub use crate::grid::{GridLookup, GridMatch};

// =============================================================================
// Density Clustering
// =============================================================================

pub use crate::dbscan::{
    dbscan, dbscan_weighted, dbscan_with_index, Clustering, DbscanConfig, Label, Metric,
};

// =============================================================================
// Trajectory Clustering
// =============================================================================

/// Partition a polyline at its characteristic points.
pub use crate::traclus::{partition_track, polyline_to_segments, significant_points};

/// Cluster planar trajectories or GPS tracks into representative paths.
pub use crate::traclus::{
    cluster_gps_tracks, cluster_trajectories, DistanceWeights, GpsRepresentative,
    RepresentativeTrajectory, TraclusConfig, TrajectorySegment,
};

// =============================================================================
// Reference Matching
// =============================================================================

pub use crate::neighbours::{Correspondence, MatcherConfig, NeighbourMatcher};

// =============================================================================
// Intersection Tests
// =============================================================================

pub use crate::intersection::{
    classify_tracks, minimal_cap, track_cap, IntersectionConfig, IntersectionStrategy,
    SphericalCap, TrackRelation,
};
