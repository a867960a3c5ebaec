//! Intersection by rasterizing both tracks onto a latitude/longitude grid.
//!
//! Cell `(i, j)` covers latitude band `i` and longitude band `j` of a
//! `resolution x resolution` grid. All longitudes of the first and last
//! latitude band are merged into one polar cell. Steps whose endpoints are
//! not in touching cells are bisected along the great circle until they are,
//! up to a fixed depth. Two tracks intersect when a cell of one equals or
//! touches a cell of the other.

use std::collections::HashSet;

use glam::DVec3;

use crate::geometry::great_circle_midpoint;
use crate::GpsPoint;

use super::TrackRelation;

/// Cell coordinates `(latitude band, longitude band)`.
type Cell = (usize, usize);

struct SphereGrid {
    resolution: usize,
    max_depth: u32,
}

impl SphereGrid {
    fn new(resolution: usize, max_depth: u32) -> Self {
        Self {
            resolution: resolution.max(1),
            max_depth,
        }
    }

    fn is_polar(&self, band: usize) -> bool {
        band == 0 || band == self.resolution - 1
    }

    fn cell_of(&self, p: &GpsPoint) -> Cell {
        let n = self.resolution as f64;
        let i = ((p.latitude + 90.0) / 180.0 * n).floor().clamp(0.0, n - 1.0) as usize;
        let j = ((p.longitude + 180.0) / 360.0 * n).floor().rem_euclid(n) as usize;
        (i, j)
    }

    fn cell_of_direction(&self, v: DVec3) -> Cell {
        self.canonical(self.cell_of(&GpsPoint::from_direction(v)))
    }

    /// Polar bands collapse to longitude band 0.
    fn canonical(&self, (i, j): Cell) -> Cell {
        if self.is_polar(i) {
            (i, 0)
        } else {
            (i, j)
        }
    }

    /// Whether two cells are equal or touch. A polar cell spans every
    /// longitude, so it touches every cell of the neighbouring band.
    fn adjacent(&self, a: Cell, b: Cell) -> bool {
        if a.0.abs_diff(b.0) > 1 {
            return false;
        }
        if self.is_polar(a.0) || self.is_polar(b.0) {
            return true;
        }
        let dj = a.1.abs_diff(b.1);
        dj.min(self.resolution - dj) <= 1
    }

    /// The cell itself and its (up to) eight neighbours, canonicalized.
    /// Longitude wraps across the antimeridian.
    fn neighbourhood(&self, (i, j): Cell) -> impl Iterator<Item = Cell> + '_ {
        let n = self.resolution as i64;
        (-1i64..=1).flat_map(move |di| {
            (-1i64..=1).filter_map(move |dj| {
                let band = i as i64 + di;
                (0..n).contains(&band).then(|| {
                    let lng = (j as i64 + dj).rem_euclid(n);
                    self.canonical((band as usize, lng as usize))
                })
            })
        })
    }

    /// Add the cells between two points, bisecting the great-circle arc.
    fn rasterize_arc(&self, a: DVec3, b: DVec3, depth: u32, cells: &mut HashSet<Cell>) {
        if depth >= self.max_depth
            || self.adjacent(self.cell_of_direction(a), self.cell_of_direction(b))
        {
            return;
        }
        let Some(mid) = great_circle_midpoint(a, b) else {
            // Antipodal step: no unique arc to follow
            return;
        };
        cells.insert(self.cell_of_direction(mid));
        self.rasterize_arc(a, mid, depth + 1, cells);
        self.rasterize_arc(mid, b, depth + 1, cells);
    }

    /// Every cell a track passes through.
    fn rasterize(&self, points: &[GpsPoint]) -> HashSet<Cell> {
        let mut cells: HashSet<Cell> = points
            .iter()
            .map(|p| self.canonical(self.cell_of(p)))
            .collect();
        for pair in points.windows(2) {
            self.rasterize_arc(pair[0].unit_vector(), pair[1].unit_vector(), 0, &mut cells);
        }
        cells
    }

    /// Whether any cell of `b` equals or touches a cell of `a`.
    fn touches(&self, a: &HashSet<Cell>, b: &HashSet<Cell>) -> bool {
        b.iter().any(|&cell| {
            if self.is_polar(cell.0) {
                a.iter().any(|&other| self.adjacent(cell, other))
            } else {
                self.neighbourhood(cell).any(|near| a.contains(&near))
            }
        })
    }
}

fn identical(a: &[GpsPoint], b: &[GpsPoint]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(p, q)| p.approx_eq(q, 1e-9))
}

/// Classify by shared or touching grid cells. Only `Same`, `Overlapping` and
/// `NotIntersecting` are produced for non-empty tracks.
pub(crate) fn classify(
    a: &[GpsPoint],
    b: &[GpsPoint],
    resolution: usize,
    max_depth: u32,
) -> TrackRelation {
    if identical(a, b) {
        return TrackRelation::Same;
    }

    let grid = SphereGrid::new(resolution, max_depth);
    let (cells_a, cells_b) = (grid.rasterize(a), grid.rasterize(b));
    if grid.touches(&cells_a, &cells_b) {
        TrackRelation::Overlapping
    } else {
        TrackRelation::NotIntersecting
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cells_and_wrap() {
        let grid = SphereGrid::new(36, 8);
        assert_eq!(grid.cell_of(&GpsPoint::new(-90.0, -180.0)), (0, 0));
        assert_eq!(grid.cell_of(&GpsPoint::new(90.0, 180.0)), (35, 0));
        assert_eq!(grid.cell_of(&GpsPoint::new(0.0, 0.0)), (18, 18));

        // Longitude bands wrap across the antimeridian
        assert!(grid.adjacent((18, 0), (18, 35)));
        assert!(!grid.adjacent((18, 0), (18, 2)));
        // A polar cell touches every cell of the neighbouring band
        assert!(grid.adjacent((35, 0), (34, 17)));
        assert!(!grid.adjacent((35, 0), (33, 0)));
        assert_eq!(grid.canonical((0, 12)), (0, 0));
    }

    #[test]
    fn test_neighbourhood() {
        let grid = SphereGrid::new(36, 8);
        let around: HashSet<Cell> = grid.neighbourhood((18, 0)).collect();
        assert_eq!(around.len(), 9);
        assert!(around.contains(&(17, 35)));
        assert!(around.contains(&(19, 1)));

        // Next to the pole the whole polar band is one cell
        let polar: HashSet<Cell> = grid.neighbourhood((1, 7)).collect();
        assert!(polar.contains(&(0, 0)));
        assert_eq!(polar.len(), 7);
    }

    #[test]
    fn test_crossing_tracks_overlap() {
        // An east-west and a north-south step crossing far from any vertex
        let a = vec![GpsPoint::new(0.0, -10.0), GpsPoint::new(0.0, 10.0)];
        let b = vec![GpsPoint::new(-10.0, 0.5), GpsPoint::new(10.0, 0.5)];
        assert_eq!(classify(&a, &b, 360, 16), TrackRelation::Overlapping);
        assert_eq!(classify(&b, &a, 360, 16), TrackRelation::Overlapping);
    }

    #[test]
    fn test_diagonal_steps_crossing_at_a_corner() {
        // Each step spans two diagonal cells, so neither is bisected and the
        // tracks share no cell; they cross at the common corner
        let a = vec![GpsPoint::new(0.25, 0.5), GpsPoint::new(0.75, 1.5)];
        let b = vec![GpsPoint::new(0.75, 0.5), GpsPoint::new(0.25, 1.5)];
        let grid = SphereGrid::new(360, 16);
        let (cells_a, cells_b) = (grid.rasterize(&a), grid.rasterize(&b));
        assert!(cells_a.is_disjoint(&cells_b));

        assert_eq!(classify(&a, &b, 360, 16), TrackRelation::Overlapping);
        assert_eq!(classify(&b, &a, 360, 16), TrackRelation::Overlapping);
    }

    #[test]
    fn test_distant_tracks() {
        let a = vec![GpsPoint::new(10.0, 10.0), GpsPoint::new(10.5, 10.5)];
        let b = vec![GpsPoint::new(-20.0, 100.0), GpsPoint::new(-20.5, 100.5)];
        assert_eq!(classify(&a, &b, 360, 16), TrackRelation::NotIntersecting);
    }

    #[test]
    fn test_same_track() {
        let a = vec![GpsPoint::new(10.0, 10.0), GpsPoint::new(10.5, 10.5)];
        assert_eq!(classify(&a, &a.clone(), 360, 16), TrackRelation::Same);
    }

    #[test]
    fn test_polar_cells_merge() {
        // Different longitudes inside the polar band share one cell
        let a = vec![GpsPoint::new(89.9, 0.0)];
        let b = vec![GpsPoint::new(89.9, 120.0)];
        assert_eq!(classify(&a, &b, 360, 16), TrackRelation::Overlapping);
        // A cell next to the polar band touches it at any longitude
        let c = vec![GpsPoint::new(89.2, -60.0)];
        assert_eq!(classify(&c, &a, 360, 16), TrackRelation::Overlapping);
        assert_eq!(classify(&a, &c, 360, 16), TrackRelation::Overlapping);
    }
}
