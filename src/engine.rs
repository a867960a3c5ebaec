//! # Track Engine
//!
//! Stateful track store that keeps GPS tracks in memory and serves the
//! analyses over them by id.
//!
//! ## Architecture
//!
//! The engine manages:
//! - GPS tracks keyed by string id
//! - Common paths (TraClus over every stored track), cached until the
//!   track set or configuration changes
//! - Built reference matchers, kept in a bounded LRU cache keyed by the
//!   reference track id
//!
//! A process-wide instance is available through [`ENGINE`] and
//! [`with_engine`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Instant;

use log::{debug, info};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{OptionExt, Result, TrackError};
use crate::geo_utils::polyline_length;
use crate::lru_cache::LruCache;
use crate::{
    classify_tracks, cluster_gps_tracks, Correspondence, GpsPoint, IntersectionConfig,
    IntersectionStrategy, MatcherConfig, NeighbourMatcher, TraclusConfig, TrackRelation,
};

// ============================================================================
// Core Types
// ============================================================================

/// Configuration for every analysis the engine runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub traclus: TraclusConfig,
    pub matcher: MatcherConfig,
    pub intersection: IntersectionConfig,
    /// Number of built reference matchers kept in memory
    pub matcher_cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            traclus: TraclusConfig::default(),
            matcher: MatcherConfig::default(),
            intersection: IntersectionConfig::default(),
            matcher_cache_capacity: 16,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        self.traclus.validate()?;
        self.matcher.validate()?;
        self.intersection.validate()?;
        if self.matcher_cache_capacity == 0 {
            return Err(TrackError::InvalidParameter {
                name: "matcher_cache_capacity",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// A common path with its contributing tracks named by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommonPath {
    pub points: Vec<GpsPoint>,
    /// Length along `points` in meters
    pub length: f64,
    /// Track id -> sorted point indices of that track on the path
    pub segment_indices: BTreeMap<String, Vec<usize>>,
}

impl CommonPath {
    pub fn track_count(&self) -> usize {
        self.segment_indices.len()
    }
}

/// Relation of one pair of stored tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairRelation {
    pub first: String,
    pub second: String,
    pub relation: TrackRelation,
}

/// Engine statistics for monitoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    pub track_count: u32,
    pub point_count: u64,
    /// `None` until common paths have been computed for the current tracks
    pub common_path_count: Option<u32>,
    pub cached_matcher_count: u32,
    pub matcher_cache_hits: u64,
    pub matcher_cache_misses: u64,
}

// ============================================================================
// Track Engine
// ============================================================================

/// The stateful track engine.
pub struct TrackEngine {
    tracks: HashMap<String, Vec<GpsPoint>>,
    common_paths: Option<Vec<CommonPath>>,
    matchers: LruCache<String, NeighbourMatcher>,
    config: EngineConfig,
}

impl TrackEngine {
    /// Create an engine with default configuration.
    pub fn new() -> Self {
        Self::with_config_unchecked(EngineConfig::default())
    }

    /// Create an engine with a custom configuration.
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_config_unchecked(config))
    }

    fn with_config_unchecked(config: EngineConfig) -> Self {
        Self {
            tracks: HashMap::new(),
            common_paths: None,
            matchers: LruCache::new(config.matcher_cache_capacity),
            config,
        }
    }

    // ========================================================================
    // Track Management
    // ========================================================================

    /// Add or replace a track.
    pub fn add_track(&mut self, id: impl Into<String>, points: Vec<GpsPoint>) -> Result<()> {
        let id = id.into();
        if id.is_empty() {
            return Err(TrackError::InvalidParameter {
                name: "id",
                message: "track id must not be empty".to_string(),
            });
        }
        if let Some(i) = points.iter().position(|p| !p.is_valid()) {
            return Err(TrackError::InvalidCoordinates {
                track_id: id,
                message: format!("point {} is out of range", i),
            });
        }

        debug!("[Engine] Adding track {} ({} points)", id, points.len());
        self.matchers.invalidate(&id);
        self.tracks.insert(id, points);
        self.common_paths = None;
        Ok(())
    }

    /// Remove a track. Returns whether it was present.
    pub fn remove_track(&mut self, id: &str) -> bool {
        let id = id.to_string();
        self.matchers.invalidate(&id);
        let removed = self.tracks.remove(&id).is_some();
        if removed {
            self.common_paths = None;
        }
        removed
    }

    /// Remove every track and cached result.
    pub fn clear(&mut self) {
        self.tracks.clear();
        self.common_paths = None;
        self.matchers.clear();
    }

    /// All track ids, sorted.
    pub fn track_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.tracks.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn has_track(&self, id: &str) -> bool {
        self.tracks.contains_key(id)
    }

    pub fn track(&self, id: &str) -> Option<&[GpsPoint]> {
        self.tracks.get(id).map(Vec::as_slice)
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replace the configuration, dropping results computed under the old one.
    pub fn set_config(&mut self, config: EngineConfig) -> Result<()> {
        config.validate()?;
        if config.traclus != self.config.traclus {
            self.common_paths = None;
        }
        if config.matcher != self.config.matcher
            || config.matcher_cache_capacity != self.config.matcher_cache_capacity
        {
            self.matchers = LruCache::new(config.matcher_cache_capacity);
        }
        self.config = config;
        Ok(())
    }

    // ========================================================================
    // Common Paths
    // ========================================================================

    /// Common paths over all stored tracks.
    pub fn common_paths(&mut self) -> Result<&[CommonPath]> {
        if self.common_paths.is_none() {
            let paths = self.compute_common_paths()?;
            self.common_paths = Some(paths);
        }
        self.common_paths
            .as_deref()
            .ok_or_internal("common paths missing after computation")
    }

    /// Common paths as a JSON array; `"[]"` when they cannot be computed.
    pub fn common_paths_json(&mut self) -> String {
        match self.common_paths() {
            Ok(paths) => serde_json::to_string(paths).unwrap_or_else(|_| "[]".to_string()),
            Err(e) => {
                info!("[Engine] Common paths unavailable: {}", e);
                "[]".to_string()
            }
        }
    }

    fn compute_common_paths(&self) -> Result<Vec<CommonPath>> {
        let start = Instant::now();
        let ids = self.track_ids();
        let tracks: Vec<&[GpsPoint]> = ids
            .iter()
            .filter_map(|id| self.tracks.get(id).map(Vec::as_slice))
            .collect();

        let representatives = cluster_gps_tracks(&tracks, &self.config.traclus)?;
        let paths: Vec<CommonPath> = representatives
            .into_iter()
            .map(|rep| CommonPath {
                length: polyline_length(&rep.points),
                points: rep.points,
                segment_indices: rep
                    .segment_indices
                    .into_iter()
                    .filter_map(|(i, indices)| Some((ids.get(i)?.clone(), indices)))
                    .collect(),
            })
            .collect();

        info!(
            "[Engine] Found {} common paths over {} tracks in {}ms",
            paths.len(),
            ids.len(),
            start.elapsed().as_millis()
        );
        Ok(paths)
    }

    // ========================================================================
    // Matching
    // ========================================================================

    /// Match `current_id` against `reference_id`. One list of correspondences
    /// per current point, in current order, with unmatched points omitted.
    pub fn match_tracks(
        &mut self,
        reference_id: &str,
        current_id: &str,
    ) -> Result<Vec<Vec<Correspondence>>> {
        let reference = self
            .tracks
            .get(reference_id)
            .ok_or_unknown_track(reference_id)?;
        let current = self.tracks.get(current_id).ok_or_unknown_track(current_id)?;

        let config = &self.config.matcher;
        let matcher = self
            .matchers
            .get_or_try_insert_with(&reference_id.to_string(), || {
                debug!("[Engine] Building matcher for {}", reference_id);
                NeighbourMatcher::from_gps(reference, config.clone())
            })?;
        matcher.match_gps(current)
    }

    // ========================================================================
    // Intersection
    // ========================================================================

    /// Relation of track `id_a` to track `id_b`.
    pub fn classify(
        &self,
        id_a: &str,
        id_b: &str,
        strategy: IntersectionStrategy,
    ) -> Result<TrackRelation> {
        let a = self.tracks.get(id_a).ok_or_unknown_track(id_a)?;
        let b = self.tracks.get(id_b).ok_or_unknown_track(id_b)?;
        Ok(classify_tracks(a, b, strategy, &self.config.intersection))
    }

    /// Relations of every unordered pair of stored tracks, in sorted id order.
    pub fn classify_all(&self, strategy: IntersectionStrategy) -> Vec<PairRelation> {
        let start = Instant::now();
        let ids = self.track_ids();
        let pairs: Vec<(usize, usize)> = (0..ids.len())
            .flat_map(|i| (i + 1..ids.len()).map(move |j| (i, j)))
            .collect();

        let config = &self.config.intersection;
        let relate = |&(i, j): &(usize, usize)| {
            let a = self.tracks.get(&ids[i]).map(Vec::as_slice).unwrap_or(&[]);
            let b = self.tracks.get(&ids[j]).map(Vec::as_slice).unwrap_or(&[]);
            PairRelation {
                first: ids[i].clone(),
                second: ids[j].clone(),
                relation: classify_tracks(a, b, strategy, config),
            }
        };

        #[cfg(feature = "parallel")]
        let relations: Vec<PairRelation> = pairs.par_iter().map(relate).collect();

        #[cfg(not(feature = "parallel"))]
        let relations: Vec<PairRelation> = pairs.iter().map(relate).collect();

        info!(
            "[Engine] Classified {} pairs with {:?} in {}ms",
            relations.len(),
            strategy,
            start.elapsed().as_millis()
        );
        relations
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    pub fn stats(&self) -> EngineStats {
        EngineStats {
            track_count: self.tracks.len() as u32,
            point_count: self.tracks.values().map(|t| t.len() as u64).sum(),
            common_path_count: self.common_paths.as_ref().map(|p| p.len() as u32),
            cached_matcher_count: self.matchers.len() as u32,
            matcher_cache_hits: self.matchers.hits(),
            matcher_cache_misses: self.matchers.misses(),
        }
    }
}

impl Default for TrackEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Global Singleton
// ============================================================================

/// Global engine instance.
pub static ENGINE: Lazy<Mutex<TrackEngine>> = Lazy::new(|| Mutex::new(TrackEngine::new()));

/// Run `f` with exclusive access to the global engine.
///
/// A panic while the lock was held does not leave the engine unusable; the
/// state it left behind is used as is.
pub fn with_engine<F, R>(f: F) -> R
where
    F: FnOnce(&mut TrackEngine) -> R,
{
    let mut engine = ENGINE.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut engine)
}

// ============================================================================
// Tests
// ============================================================================
