//! R-tree indexed bounding boxes and spatial query utilities.
//!
//! The proximity index answers "which objects have a bounding box that
//! intersects this query box". It over-approximates; callers refine the
//! candidates with an exact distance.

use rstar::{RTree, RTreeObject, AABB};

use crate::geometry::{Coordinates, DVec2, DVec3, Segment};

/// Anything with an axis-aligned bounding box in the space of `P`.
pub trait Bounded<P: Coordinates> {
    /// Component-wise `(min, max)` corners.
    fn envelope(&self) -> (P, P);
}

impl Bounded<DVec2> for DVec2 {
    fn envelope(&self) -> (DVec2, DVec2) {
        (*self, *self)
    }
}

impl Bounded<DVec3> for DVec3 {
    fn envelope(&self) -> (DVec3, DVec3) {
        (*self, *self)
    }
}

impl<P: Coordinates> Bounded<P> for Segment<P> {
    fn envelope(&self) -> (P, P) {
        self.bounds()
    }
}

/// An object's bounding box with its index for R-tree queries
#[derive(Debug, Clone)]
struct IndexedEnvelope<P: Coordinates> {
    idx: usize,
    envelope: AABB<P::Corner>,
}

impl<P: Coordinates> RTreeObject for IndexedEnvelope<P> {
    type Envelope = AABB<P::Corner>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope.clone()
    }
}

/// Static spatial index over a list of bounded objects.
///
/// Built once; rebuild when the object list changes. Queries are read-only,
/// so a built index can be shared between threads.
#[derive(Debug, Clone)]
pub struct ProximityIndex<P: Coordinates> {
    tree: RTree<IndexedEnvelope<P>>,
}

impl<P: Coordinates> ProximityIndex<P> {
    /// Bulk-load the bounding boxes of `objects`.
    pub fn build<T: Bounded<P>>(objects: &[T]) -> Self {
        let indexed: Vec<IndexedEnvelope<P>> = objects
            .iter()
            .enumerate()
            .map(|(idx, object)| {
                let (lo, hi) = object.envelope();
                IndexedEnvelope {
                    idx,
                    envelope: AABB::from_corners(lo.corner(), hi.corner()),
                }
            })
            .collect();
        Self {
            tree: RTree::bulk_load(indexed),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Indices of all objects whose bounding box intersects `[min, max]`.
    /// Order is unspecified.
    pub fn search(&self, min: P, max: P) -> Vec<usize> {
        let query = AABB::from_corners(min.corner(), max.corner());
        self.tree
            .locate_in_envelope_intersecting(&query)
            .map(|entry| entry.idx)
            .collect()
    }

    /// Candidates within `radius` of an object's bounding box.
    pub fn search_around<T: Bounded<P>>(&self, object: &T, radius: f64) -> Vec<usize> {
        let (lo, hi) = object.envelope();
        let pad = P::splat(radius);
        self.search(lo - pad, hi + pad)
    }

    /// Indices of every indexed object, ascending.
    pub fn all(&self) -> Vec<usize> {
        let mut all: Vec<usize> = self.tree.iter().map(|entry| entry.idx).collect();
        all.sort_unstable();
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    fn grid_points() -> Vec<DVec2> {
        (0..10)
            .flat_map(|i| (0..10).map(move |j| DVec2::new(i as f64, j as f64)))
            .collect()
    }

    #[test]
    fn test_search_box() {
        let points = grid_points();
        let index = ProximityIndex::build(&points);
        assert_eq!(index.len(), 100);

        let mut found = index.search(DVec2::new(1.5, 1.5), DVec2::new(3.5, 2.5));
        found.sort_unstable();
        let expected: Vec<usize> = vec![2 * 10 + 2, 3 * 10 + 2];
        assert_eq!(found, expected);
    }

    #[test]
    fn test_repeated_queries() {
        let points = grid_points();
        let index = ProximityIndex::build(&points);
        for _ in 0..3 {
            assert_eq!(index.search_around(&DVec2::new(5.0, 5.0), 0.5).len(), 1);
        }
    }

    #[test]
    fn test_query_outside_universe_is_empty() {
        let index = ProximityIndex::build(&grid_points());
        assert!(index
            .search(DVec2::new(100.0, 100.0), DVec2::new(200.0, 200.0))
            .is_empty());

        let empty: ProximityIndex<DVec2> = ProximityIndex::build::<DVec2>(&[]);
        assert!(empty.is_empty());
        assert!(empty.all().is_empty());
        assert!(empty.search(DVec2::ZERO, DVec2::new(1.0, 1.0)).is_empty());
    }

    #[test]
    fn test_segments_indexed_by_box() {
        let segments = vec![
            Segment::new(DVec2::new(0.0, 0.0), DVec2::new(10.0, 10.0)),
            Segment::new(DVec2::new(20.0, 0.0), DVec2::new(30.0, 0.0)),
        ];
        let index = ProximityIndex::build(&segments);
        assert_eq!(index.search(DVec2::new(4.0, 6.0), DVec2::new(5.0, 7.0)), vec![0]);
        assert_eq!(index.all(), vec![0, 1]);
    }

    #[test]
    fn test_cartesian_points() {
        let points = vec![DVec3::new(0.0, 0.0, 0.0), DVec3::new(5.0, 5.0, 5.0)];
        let index = ProximityIndex::build(&points);
        assert_eq!(index.search_around(&DVec3::new(1.0, 1.0, 1.0), 1.0), vec![0]);
    }
}
