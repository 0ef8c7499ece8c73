//! R-tree spatial indexing over track points.
//!
//! Both index flavors wrap an [`rstar::RTree`] rather than a hand-rolled
//! KD-tree; the spatial-index contract (immutable, radius queries in
//! degree space, thread-safe reads) is satisfied identically either way,
//! and this crate's geo stack already depends on `rstar` for exactly this
//! kind of 2-D point query, so there is no reason to introduce a second
//! data structure alongside it. Leaf types mirror the `IndexedPoint`
//! pattern used for R-tree-backed GPS lookups elsewhere in this codebase:
//! a flat `{lat, lng, ...index fields}` struct implementing
//! `RTreeObject`/`PointDistance` against squared planar (degree) distance.

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::store::TrackStore;

/// A leaf in a [`GlobalSpatialIndex`]: a point's coordinates plus its
/// global arena index.
#[derive(Debug, Clone, Copy)]
pub struct GlobalIndexedPoint {
    pub global_idx: u32,
    pub lat: f64,
    pub lng: f64,
}

impl RTreeObject for GlobalIndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lat, self.lng])
    }
}

impl PointDistance for GlobalIndexedPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlat = self.lat - point[0];
        let dlng = self.lng - point[1];
        dlat * dlat + dlng * dlng
    }
}

/// R-tree over every point in a [`TrackStore`], leaves carrying the global
/// arena index.
pub struct GlobalSpatialIndex {
    tree: RTree<GlobalIndexedPoint>,
}

impl GlobalSpatialIndex {
    /// Global indices within `radius_deg` (Euclidean, in degrees) of
    /// `center = (lat, lng)`. Deduplicated, order unspecified.
    pub fn in_range(&self, center: (f64, f64), radius_deg: f64) -> Vec<u32> {
        let radius_sq = radius_deg * radius_deg;
        self.tree
            .locate_within_distance([center.0, center.1], radius_sq)
            .map(|p| p.global_idx)
            .collect()
    }
}

/// Build an [`GlobalSpatialIndex`] over every point in `store`.
pub fn build_global_index(store: &TrackStore) -> GlobalSpatialIndex {
    let indexed: Vec<GlobalIndexedPoint> = store
        .points()
        .iter()
        .enumerate()
        .map(|(i, p)| GlobalIndexedPoint {
            global_idx: i as u32,
            lat: p.latitude,
            lng: p.longitude,
        })
        .collect();
    GlobalSpatialIndex { tree: RTree::bulk_load(indexed) }
}

/// A leaf in a [`TrackSpatialIndex`]: a point's coordinates plus both its
/// position within the track (0-based) and its global arena index, so a
/// query result can be translated to a global index in O(1) without a
/// second lookup.
#[derive(Debug, Clone, Copy)]
pub struct TrackIndexedPoint {
    pub local_pos: u32,
    pub global_idx: u32,
    pub lat: f64,
    pub lng: f64,
}

impl RTreeObject for TrackIndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lat, self.lng])
    }
}

impl PointDistance for TrackIndexedPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlat = self.lat - point[0];
        let dlng = self.lng - point[1];
        dlat * dlat + dlng * dlng
    }
}

/// R-tree over a single track's points.
pub struct TrackSpatialIndex {
    tree: RTree<TrackIndexedPoint>,
}

impl TrackSpatialIndex {
    /// Global indices of this track's points within `radius_deg` of
    /// `center = (lat, lng)`. Deduplicated, order unspecified.
    pub fn in_range(&self, center: (f64, f64), radius_deg: f64) -> Vec<u32> {
        let radius_sq = radius_deg * radius_deg;
        self.tree
            .locate_within_distance([center.0, center.1], radius_sq)
            .map(|p| p.global_idx)
            .collect()
    }
}

/// Build a [`TrackSpatialIndex`] over a single track's points.
pub fn build_track_index(store: &TrackStore, track_pos: usize) -> TrackSpatialIndex {
    let first = store.track_range(track_pos).first;
    let indexed: Vec<TrackIndexedPoint> = store
        .track_points(track_pos)
        .iter()
        .enumerate()
        .map(|(local_pos, p)| TrackIndexedPoint {
            local_pos: local_pos as u32,
            global_idx: first + local_pos as u32,
            lat: p.latitude,
            lng: p.longitude,
        })
        .collect();
    TrackSpatialIndex { tree: RTree::bulk_load(indexed) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{build_store, TrackPoint};

    fn straight_track(lat: f64, lon0: f64, step: f64, n: usize) -> Vec<TrackPoint> {
        (0..n).map(|i| TrackPoint::new(lat, lon0 + step * i as f64)).collect()
    }

    #[test]
    fn global_index_finds_nearby_point() {
        let store = build_store(vec![straight_track(46.5, 15.0, 0.001, 5)]).unwrap();
        let index = build_global_index(&store);
        let hits = index.in_range((46.5, 15.0), 0.0005);
        assert!(hits.contains(&0));
    }

    #[test]
    fn global_index_excludes_far_point() {
        let store = build_store(vec![straight_track(46.5, 15.0, 0.001, 5)]).unwrap();
        let index = build_global_index(&store);
        let hits = index.in_range((46.5, 15.0), 0.0005);
        assert!(!hits.contains(&4));
    }

    #[test]
    fn track_index_maps_local_hits_to_global_indices() {
        let store = build_store(vec![
            straight_track(46.5, 15.0, 0.001, 3),
            straight_track(47.0, 16.0, 0.001, 4),
        ])
        .unwrap();
        let index = build_track_index(&store, 1);
        let hits = index.in_range((47.0, 16.0), 0.0005);
        // Track 1 starts at global index 3.
        assert_eq!(hits, vec![3]);
    }
}
