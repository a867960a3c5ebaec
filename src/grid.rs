//! Uniform grid over a flattened 2D track.
//!
//! Every point index is stored in the cell containing the point. When two
//! consecutive points are more than one cell apart, the cells on the line
//! between them (Bresenham) also receive the later point's index, so a query
//! near the middle of a long step still finds that step.
//!
//! Queries return candidates with their exact point distance; they are a
//! superset of the points within the radius and callers filter further.

use serde::{Deserialize, Serialize};

use crate::error::{ensure_positive, Result, TrackError};
use crate::geometry::DVec2;
use crate::track::Track;

/// A grid candidate: point index and its distance from the query point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridMatch {
    pub index: usize,
    pub distance: f64,
}

/// Cell coordinates (column, row).
type Cell = (i64, i64);

/// Largest number of cells a grid may allocate.
pub const MAX_GRID_CELLS: usize = 1 << 24;

/// Dense bucket grid covering a track's bounding rectangle.
#[derive(Debug, Clone)]
pub struct GridLookup {
    points: Vec<DVec2>,
    origin: DVec2,
    cell_size: f64,
    columns: usize,
    rows: usize,
    buckets: Vec<Vec<usize>>,
}

impl GridLookup {
    /// Index `track` with square cells of `cell_size`.
    ///
    /// Fails when the track's extent would need more than
    /// [`MAX_GRID_CELLS`] cells of that size.
    pub fn new(track: &Track, cell_size: f64) -> Result<Self> {
        ensure_positive("cell_size", cell_size)?;
        if let Some(i) = track.points().iter().position(|p| !p.is_finite()) {
            return Err(TrackError::InvalidCoordinates {
                track_id: "reference".to_string(),
                message: format!("point {} is not finite", i),
            });
        }

        let Some((lo, hi)) = track.bounds() else {
            return Ok(Self {
                points: Vec::new(),
                origin: DVec2::ZERO,
                cell_size,
                columns: 0,
                rows: 0,
                buckets: Vec::new(),
            });
        };

        // Float to int casts saturate, so a huge extent stays huge
        let columns = (((hi.x - lo.x) / cell_size).floor() as usize).saturating_add(1);
        let rows = (((hi.y - lo.y) / cell_size).floor() as usize).saturating_add(1);
        let cells = columns
            .checked_mul(rows)
            .filter(|&cells| cells <= MAX_GRID_CELLS)
            .ok_or_else(|| TrackError::InvalidParameter {
                name: "cell_size",
                message: format!(
                    "{} is too small for a {:.1} x {:.1} extent",
                    cell_size,
                    hi.x - lo.x,
                    hi.y - lo.y
                ),
            })?;

        let mut grid = Self {
            points: track.points().to_vec(),
            origin: lo,
            cell_size,
            columns,
            rows,
            buckets: vec![Vec::new(); cells],
        };

        let mut previous: Option<Cell> = None;
        for (k, p) in track.points().iter().enumerate() {
            let cell = grid.cell_of(*p);
            grid.insert(cell, k);

            if let Some(prev) = previous {
                if (cell.0 - prev.0).abs() > 1 || (cell.1 - prev.1).abs() > 1 {
                    for traversed in bresenham(prev, cell) {
                        grid.insert(traversed, k);
                    }
                }
            }
            previous = Some(cell);
        }

        Ok(grid)
    }

    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Grid dimensions as (columns, rows).
    pub fn dimensions(&self) -> (usize, usize) {
        (self.columns, self.rows)
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn cell_of(&self, p: DVec2) -> Cell {
        let cell = ((p - self.origin) / self.cell_size).floor();
        let (col, row) = (cell.x as i64, cell.y as i64);
        (
            col.clamp(0, self.columns as i64 - 1),
            row.clamp(0, self.rows as i64 - 1),
        )
    }

    fn insert(&mut self, (col, row): Cell, index: usize) {
        let bucket = &mut self.buckets[row as usize * self.columns + col as usize];
        if bucket.last() != Some(&index) {
            bucket.push(index);
        }
    }

    /// Clamped cell range `[lo, hi]` along one axis, or `None` when the
    /// interval misses the grid.
    fn axis_range(&self, from: f64, to: f64, origin: f64, cells: usize) -> Option<(usize, usize)> {
        let lo = ((from - origin) / self.cell_size).floor();
        let hi = ((to - origin) / self.cell_size).floor();
        if !(lo.is_finite() && hi.is_finite()) || hi < 0.0 || lo > (cells as f64 - 1.0) {
            return None;
        }
        Some((lo.max(0.0) as usize, (hi as usize).min(cells - 1)))
    }

    /// Candidates around `point`, nearest first.
    ///
    /// Covers every cell within `radius + cell_size` of the point, so all
    /// points within `radius` are included. Empty when the covered range
    /// lies outside the grid.
    pub fn find(&self, point: &DVec2, radius: f64) -> Vec<GridMatch> {
        if self.buckets.is_empty() || !point.is_finite() {
            return Vec::new();
        }
        let reach = radius.max(0.0) + self.cell_size;

        let Some((c0, c1)) =
            self.axis_range(point.x - reach, point.x + reach, self.origin.x, self.columns)
        else {
            return Vec::new();
        };
        let Some((r0, r1)) =
            self.axis_range(point.y - reach, point.y + reach, self.origin.y, self.rows)
        else {
            return Vec::new();
        };

        let mut indices: Vec<usize> = (r0..=r1)
            .flat_map(|row| {
                self.buckets[row * self.columns + c0..=row * self.columns + c1]
                    .iter()
                    .flatten()
                    .copied()
            })
            .collect();
        indices.sort_unstable();
        indices.dedup();

        let mut matches: Vec<GridMatch> = indices
            .into_iter()
            .map(|index| GridMatch {
                index,
                distance: self.points[index].distance(*point),
            })
            .collect();
        matches.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.index.cmp(&b.index))
        });
        matches
    }

    /// Candidates for every point of `track`.
    ///
    /// The radius grows to half the longer adjacent step of the query track,
    /// so sparse points still reach the reference. Points without any
    /// candidate are left out.
    pub fn find_track(&self, track: &Track, radius: f64) -> Vec<(usize, Vec<GridMatch>)> {
        (0..track.len())
            .filter_map(|i| {
                let matches = self.find(&track.points()[i], adaptive_radius(track, i, radius));
                (!matches.is_empty()).then_some((i, matches))
            })
            .collect()
    }
}

/// `max(radius, max(displacement[i], displacement[i + 1]) / 2)`.
pub(crate) fn adaptive_radius(track: &Track, i: usize, radius: f64) -> f64 {
    let displacement = track.displacement();
    let here = displacement.get(i).copied().unwrap_or(0.0);
    let next = displacement.get(i + 1).copied().unwrap_or(0.0);
    radius.max(here.max(next) / 2.0)
}

/// Cells on the line from `from` to `to`, both ends included.
fn bresenham(from: Cell, to: Cell) -> Vec<Cell> {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let sx = if x < to.0 { 1 } else { -1 };
    let sy = if y < to.1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut cells = Vec::with_capacity((dx - dy) as usize + 1);
    loop {
        cells.push((x, y));
        if (x, y) == to {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force(track: &Track, point: &DVec2, radius: f64) -> Vec<usize> {
        track
            .points()
            .iter()
            .enumerate()
            .filter(|(_, p)| p.distance(*point) <= radius)
            .map(|(i, _)| i)
            .collect()
    }

    #[test]
    fn test_bresenham_line() {
        assert_eq!(bresenham((0, 0), (3, 0)), vec![(0, 0), (1, 0), (2, 0), (3, 0)]);
        assert_eq!(bresenham((2, 2), (0, 0)), vec![(2, 2), (1, 1), (0, 0)]);
        assert_eq!(bresenham((1, 1), (1, 1)), vec![(1, 1)]);
        let steep = bresenham((0, 0), (1, 5));
        assert_eq!(steep.len(), 6);
        assert_eq!(steep.first(), Some(&(0, 0)));
        assert_eq!(steep.last(), Some(&(1, 5)));
    }

    #[test]
    fn test_find_matches_brute_force() {
        let track = Track::new(
            (0..40)
                .map(|i| {
                    let t = i as f64 * 0.3;
                    DVec2::new(t.cos() * 50.0 + i as f64, t.sin() * 30.0)
                })
                .collect(),
        );
        let grid = GridLookup::new(&track, 7.0).unwrap();

        for query in [DVec2::new(0.0, 0.0), DVec2::new(40.0, 10.0), DVec2::new(-20.0, -25.0)] {
            for radius in [1.0, 5.0, 20.0] {
                let mut found: Vec<usize> = grid
                    .find(&query, radius)
                    .into_iter()
                    .filter(|m| m.distance <= radius)
                    .map(|m| m.index)
                    .collect();
                found.sort_unstable();
                assert_eq!(found, brute_force(&track, &query, radius));
            }
        }
    }

    #[test]
    fn test_results_sorted_and_unique() {
        let track = Track::new((0..20).map(|i| DVec2::new(i as f64, 0.0)).collect());
        let grid = GridLookup::new(&track, 2.0).unwrap();
        let found = grid.find(&DVec2::new(5.2, 0.5), 3.0);
        assert_eq!(found[0].index, 5);
        assert!(found.windows(2).all(|w| w[0].distance <= w[1].distance));
        let mut ids: Vec<usize> = found.iter().map(|m| m.index).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), found.len());
    }

    #[test]
    fn test_sparse_step_is_rasterized() {
        // One 100m step over 1m cells
        let track = Track::new(vec![DVec2::new(0.0, 0.0), DVec2::new(100.0, 0.0)]);
        let grid = GridLookup::new(&track, 1.0).unwrap();
        let found = grid.find(&DVec2::new(50.0, 0.5), 1.0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].index, 1);
    }

    #[test]
    fn test_outside_grid_is_empty() {
        let track = Track::new(vec![DVec2::new(0.0, 0.0), DVec2::new(10.0, 10.0)]);
        let grid = GridLookup::new(&track, 1.0).unwrap();
        assert!(grid.find(&DVec2::new(500.0, 500.0), 5.0).is_empty());

        let empty = GridLookup::new(&Track::new(vec![]), 1.0).unwrap();
        assert!(empty.is_empty());
        assert!(empty.find(&DVec2::new(0.0, 0.0), 10.0).is_empty());
    }

    #[test]
    fn test_invalid_cell_size() {
        let track = Track::new(vec![DVec2::new(0.0, 0.0)]);
        assert!(GridLookup::new(&track, 0.0).is_err());
        assert!(GridLookup::new(&track, f64::NAN).is_err());
    }

    #[test]
    fn test_oversized_grid_rejected() {
        let track = Track::new(vec![DVec2::ZERO, DVec2::new(50_000.0, 50_000.0)]);
        assert!(matches!(
            GridLookup::new(&track, 0.01),
            Err(TrackError::InvalidParameter { name: "cell_size", .. })
        ));
        // Overflows usize before the cap is reached
        assert!(GridLookup::new(&track, 1e-300).is_err());

        // A long but thin track stays within the cap
        let long = Track::new(vec![DVec2::ZERO, DVec2::new(100_000.0, 0.0)]);
        let grid = GridLookup::new(&long, 1.0).unwrap();
        assert_eq!(grid.dimensions(), (100_001, 1));
    }

    #[test]
    fn test_find_track_adaptive_radius() {
        let reference = Track::new((0..=10).map(|i| DVec2::new(i as f64 * 10.0, 0.0)).collect());
        let grid = GridLookup::new(&reference, 5.0).unwrap();

        // Second point is 30m above the reference line but its 80m steps
        // widen the radius to 40m
        let current = Track::new(vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(50.0, 30.0),
            DVec2::new(100.0, 0.0),
            DVec2::new(1000.0, 1000.0),
        ]);
        assert!((adaptive_radius(&current, 1, 1.0) - (50f64.powi(2) + 30f64.powi(2)).sqrt() / 2.0).abs() < 1e-9);

        let result = grid.find_track(&current, 1.0);
        let indices: Vec<usize> = result.iter().map(|(i, _)| *i).collect();
        assert!(indices.contains(&0));
        assert!(indices.contains(&1));
        // Far outside the grid even with its widened radius
        assert!(!indices.contains(&3));
        assert!(result.iter().all(|(_, m)| !m.is_empty()));
    }
}
