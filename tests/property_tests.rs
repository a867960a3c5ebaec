use std::collections::{BTreeSet, HashSet};

use proptest::prelude::*;
use track_matcher::{
    classify_tracks, dbscan, Clustering, DVec2, DbscanConfig, GpsPoint, GridLookup,
    IntersectionConfig, IntersectionStrategy, Label, MatcherConfig, NeighbourMatcher, Track,
    TrackRelation,
};

const STRATEGIES: [IntersectionStrategy; 3] = [
    IntersectionStrategy::MinCircle,
    IntersectionStrategy::Rect,
    IntersectionStrategy::Grid,
];

fn planar_points(max_len: usize) -> impl Strategy<Value = Vec<DVec2>> {
    prop::collection::vec((0.0f64..200.0, 0.0f64..200.0), 1..max_len)
        .prop_map(|coords| coords.into_iter().map(|(x, y)| DVec2::new(x, y)).collect())
}

/// Points together with a permutation of their indices.
fn shuffled_points(max_len: usize) -> impl Strategy<Value = (Vec<DVec2>, Vec<usize>)> {
    planar_points(max_len).prop_flat_map(|points| {
        let order: Vec<usize> = (0..points.len()).collect();
        (Just(points), Just(order).prop_shuffle())
    })
}

/// A walk of small steps, like a recorded track.
fn planar_walk(max_len: usize) -> impl Strategy<Value = Vec<DVec2>> {
    prop::collection::vec((-8.0f64..8.0, -8.0f64..8.0), 2..max_len).prop_map(|steps| {
        let mut p = DVec2::ZERO;
        steps
            .into_iter()
            .map(|(dx, dy)| {
                p += DVec2::new(dx, dy);
                p
            })
            .collect()
    })
}

fn is_core(points: &[DVec2], i: usize, eps: f64, min_points: usize) -> bool {
    points.iter().filter(|q| points[i].distance(**q) <= eps).count() >= min_points
}

/// Clusters restricted to `keep`, as sets of ids under `rename`.
fn cluster_sets(
    clustering: &Clustering,
    keep: impl Fn(usize) -> bool,
    rename: impl Fn(usize) -> usize,
) -> BTreeSet<BTreeSet<usize>> {
    clustering
        .clusters
        .iter()
        .map(|members| {
            members
                .iter()
                .copied()
                .filter(|&m| keep(m))
                .map(&rename)
                .collect::<BTreeSet<usize>>()
        })
        .filter(|set| !set.is_empty())
        .collect()
}

/// A short GPS track near a random location away from the poles.
fn gps_track() -> impl Strategy<Value = Vec<GpsPoint>> {
    (-60.0f64..60.0, -170.0f64..170.0).prop_flat_map(|(lat, lng)| {
        prop::collection::vec((-0.05f64..0.05, -0.05f64..0.05), 1..15).prop_map(move |offsets| {
            offsets
                .into_iter()
                .map(|(dlat, dlng)| GpsPoint::new(lat + dlat, lng + dlng))
                .collect()
        })
    })
}

proptest! {
    #[test]
    fn prop_dbscan_clusters_disjoint(
        points in planar_points(60),
        eps in 1.0f64..40.0,
        min_points in 1usize..5,
    ) {
        let result = dbscan(&points, &DbscanConfig::new(eps, min_points)).unwrap();
        prop_assert_eq!(result.labels.len(), points.len());

        let mut seen = HashSet::new();
        for (id, members) in result.clusters.iter().enumerate() {
            prop_assert!(!members.is_empty());
            for &m in members {
                prop_assert!(seen.insert(m), "object {} in two clusters", m);
                prop_assert_eq!(result.labels[m], Label::Cluster(id));
            }
        }
        for i in result.noise() {
            prop_assert!(!seen.contains(&i));
        }
    }

    #[test]
    fn prop_dbscan_core_clusters_ignore_input_order(
        (points, order) in shuffled_points(50),
        eps in 1.0f64..40.0,
        min_points in 1usize..5,
    ) {
        let config = DbscanConfig::new(eps, min_points);
        let shuffled: Vec<DVec2> = order.iter().map(|&i| points[i]).collect();
        let original = dbscan(&points, &config).unwrap();
        let permuted = dbscan(&shuffled, &config).unwrap();

        // Border objects may join either of two clusters depending on the
        // scan order; core objects and noise may not
        let core: Vec<bool> = (0..points.len())
            .map(|i| is_core(&points, i, eps, min_points))
            .collect();
        prop_assert_eq!(
            cluster_sets(&original, |m| core[m], |m| m),
            cluster_sets(&permuted, |m| core[order[m]], |m| order[m])
        );

        let noise: BTreeSet<usize> = original.noise().into_iter().collect();
        let permuted_noise: BTreeSet<usize> =
            permuted.noise().into_iter().map(|m| order[m]).collect();
        prop_assert_eq!(noise, permuted_noise);
    }

    #[test]
    fn prop_grid_matches_brute_force(
        points in planar_points(80),
        query in (0.0f64..200.0, 0.0f64..200.0),
        radius in 0.5f64..30.0,
        cell_size in 1.0f64..25.0,
    ) {
        let track = Track::new(points.clone());
        let grid = GridLookup::new(&track, cell_size).unwrap();
        let query = DVec2::new(query.0, query.1);

        let found = grid.find(&query, radius);
        prop_assert!(found.windows(2).all(|w| w[0].distance <= w[1].distance));

        let mut within: Vec<usize> = found
            .iter()
            .filter(|m| m.distance <= radius)
            .map(|m| m.index)
            .collect();
        within.sort_unstable();

        let expected: Vec<usize> = points
            .iter()
            .enumerate()
            .filter(|(_, p)| p.distance(query) <= radius)
            .map(|(i, _)| i)
            .collect();
        prop_assert_eq!(within, expected);
    }

    #[test]
    fn prop_matcher_lists_sorted_and_unique(
        reference in planar_walk(40),
        current in planar_walk(40),
        radius in 2.0f64..20.0,
    ) {
        let config = MatcherConfig { radius, cell_size: 5.0 };
        let matcher = NeighbourMatcher::new(Track::new(reference.clone()), config).unwrap();
        let result = matcher.match_track(&Track::new(current.clone()));

        let mut last_current = None;
        for correspondences in &result {
            prop_assert!(!correspondences.is_empty());
            prop_assert!(correspondences.windows(2).all(|w| w[0].distance <= w[1].distance));

            let refs: HashSet<usize> = correspondences.iter().map(|c| c.reference_index).collect();
            prop_assert_eq!(refs.len(), correspondences.len());

            let current_index = correspondences[0].current_index;
            prop_assert!(correspondences.iter().all(|c| c.current_index == current_index));
            if let Some(last) = last_current {
                prop_assert!(current_index > last);
            }
            last_current = Some(current_index);

            for c in correspondences {
                prop_assert!(c.distance <= radius);
                prop_assert!((0.0..1.0).contains(&c.fraction) || reference.len() == 1);
                prop_assert!(c.reference_index < reference.len());
            }
        }
    }

    #[test]
    fn prop_intersection_self_is_same(track in gps_track()) {
        let config = IntersectionConfig::default();
        for strategy in STRATEGIES {
            prop_assert_eq!(
                classify_tracks(&track, &track, strategy, &config),
                TrackRelation::Same
            );
        }
    }

    #[test]
    fn prop_intersection_swap_symmetry(a in gps_track(), b in gps_track()) {
        let config = IntersectionConfig::default();
        for strategy in STRATEGIES {
            let forward = classify_tracks(&a, &b, strategy, &config);
            let backward = classify_tracks(&b, &a, strategy, &config);
            prop_assert_eq!(forward, backward.swapped());
        }
    }
}
