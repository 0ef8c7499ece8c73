//! # trackrepeat
//!
//! Discovers repeated route segments across overlapping GPS tracks.
//!
//! Given several recorded GPS tracks of repeated outdoor activities (e.g.
//! cycling rides) over a largely overlapping road network, this crate
//! discovers contiguous sub-polylines of a chosen reference track that
//! recur, within a geometric tolerance, in several of the other tracks —
//! and can stitch discovered segments into a longer directed path by
//! connecting their endpoints head-to-tail.
//!
//! ## Modules
//!
//! - [`geo`] — great-circle distance, Douglas-Peucker simplification,
//!   discrete Fréchet distance, and the other geometric primitives.
//! - [`store`] — the immutable track store (global point arena + tracks).
//! - [`spatial`] — R-tree spatial indexing over track points.
//! - [`reference`] — reference-ride selection via hotspot scoring.
//! - [`discovery`] — the segment discovery engine (the hard part).
//! - [`pathfinder`] — the segment-graph pathfinder.
//!
//! ## Quick start
//!
//! ```rust
//! use trackrepeat::{build_store, find_overlapping_segments, DiscoveryConfig, TrackPoint};
//!
//! let track_a: Vec<TrackPoint> = (0..20)
//!     .map(|i| TrackPoint::new(46.5, 15.0 + 0.0001 * i as f64))
//!     .collect();
//! let track_b = track_a.clone();
//!
//! let store = build_store(vec![track_a, track_b]).unwrap();
//! let config = DiscoveryConfig { max_length_m: 100.0, tol_m: 2.0, min_runs: 2, ..Default::default() };
//! let (segments, close_tracks) = find_overlapping_segments(&store, 0, &config).unwrap();
//! assert!(!segments.is_empty());
//! assert_eq!(close_tracks.len(), 2);
//! ```
//!
//! ## Scope
//!
//! This crate is the discovery engine and pathfinder only. Activity-file
//! parsing, external enrichment (surface/highway tagging, weather),
//! persistence, and plotting/viewers are out of scope — callers hand in
//! already-parsed [`TrackPoint`] sequences and consume the in-memory
//! [`discovery::Segment`]/[`pathfinder::PathElement`] results.

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{OptionExt, Result, RouteMatchError};

pub mod geo;

pub mod store;
pub use store::{build_store, Track, TrackPoint, TrackStore};

pub mod spatial;
pub use spatial::{build_global_index, build_track_index, GlobalSpatialIndex, TrackSpatialIndex};

pub mod reference;
pub use reference::{find_best_ref_ride, ReferenceConfig};

pub mod discovery;
pub use discovery::{find_overlapping_segments, DiscoveryConfig, Segment, CONTIGUITY_SLACK};

pub mod pathfinder;
pub use pathfinder::{find_path_between_segments, Orientation, PathElement, PathfinderConfig};

/// A bare `(longitude, latitude)`-addressable geographic point, in degrees.
///
/// Most of the crate's internals operate on [`TrackPoint`]s resolved from
/// the [`TrackStore`] rather than this type directly; `GpsPoint` is the
/// lightweight carrier used by the free functions in [`geo`] and by
/// `candidate_polyline`/bounding-box computations, mirroring the flat
/// `{latitude, longitude}` shape used throughout this codebase's
/// geometry layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Whether the coordinates are finite and within the valid WGS84 range.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// A geographic bounding box, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Compute bounds from a slice of points. `None` for empty input.
    pub fn from_points(points: &[GpsPoint]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;
        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }
        Some(Self { min_lat, max_lat, min_lng, max_lng })
    }

    /// The center point of this bounding box.
    pub fn center(&self) -> GpsPoint {
        GpsPoint::new((self.min_lat + self.max_lat) / 2.0, (self.min_lng + self.max_lng) / 2.0)
    }
}

/// Top-level convenience re-export of [`geo::haversine_distance`], taking
/// bare `(lat, lon)` pairs as spec.md's external interface signature
/// specifies, rather than [`GpsPoint`]s.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    geo::haversine_distance(&GpsPoint::new(lat1, lon1), &GpsPoint::new(lat2, lon2))
}

/// Top-level convenience re-export of [`geo::discrete_frechet`], taking bare
/// `(lat, lon)` tuples.
pub fn discrete_frechet(p: &[(f64, f64)], q: &[(f64, f64)]) -> f64 {
    let p: Vec<GpsPoint> = p.iter().map(|&(lat, lon)| GpsPoint::new(lat, lon)).collect();
    let q: Vec<GpsPoint> = q.iter().map(|&(lat, lon)| GpsPoint::new(lat, lon)).collect();
    geo::discrete_frechet(&p, &q)
}

/// Top-level convenience re-export of [`geo::douglas_peucker`], taking and
/// returning bare `(lat, lon)` tuples.
pub fn douglas_peucker(points: &[(f64, f64)], epsilon_m: f64) -> Vec<(f64, f64)> {
    let pts: Vec<GpsPoint> = points.iter().map(|&(lat, lon)| GpsPoint::new(lat, lon)).collect();
    geo::douglas_peucker(&pts, epsilon_m)
        .into_iter()
        .map(|p| (p.latitude, p.longitude))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gps_point_validity() {
        assert!(GpsPoint::new(51.5, -0.1).is_valid());
        assert!(!GpsPoint::new(f64::NAN, -0.1).is_valid());
        assert!(!GpsPoint::new(91.0, 0.0).is_valid());
    }

    #[test]
    fn bounds_from_points_empty_is_none() {
        assert!(Bounds::from_points(&[]).is_none());
    }

    #[test]
    fn bounds_center_is_midpoint() {
        let points = vec![GpsPoint::new(46.0, 15.0), GpsPoint::new(47.0, 16.0)];
        let bounds = Bounds::from_points(&points).unwrap();
        let center = bounds.center();
        assert!((center.latitude - 46.5).abs() < 1e-9);
        assert!((center.longitude - 15.5).abs() < 1e-9);
    }

    #[test]
    fn top_level_haversine_matches_geo_module() {
        let a = (51.5074, -0.1278);
        let b = (48.8566, 2.3522);
        let via_top_level = haversine_distance(a.0, a.1, b.0, b.1);
        let via_module = geo::haversine_distance(&GpsPoint::new(a.0, a.1), &GpsPoint::new(b.0, b.1));
        assert_eq!(via_top_level, via_module);
    }

    #[test]
    fn top_level_discrete_frechet_zero_for_identical_polyline() {
        let p = vec![(46.5, 15.0), (46.5, 15.001), (46.5, 15.002)];
        assert_eq!(discrete_frechet(&p, &p), 0.0);
    }

    #[test]
    fn top_level_douglas_peucker_keeps_endpoints() {
        let p = vec![(0.0, 0.0), (0.0, 0.0005), (0.0, 0.001)];
        let simplified = douglas_peucker(&p, 100.0);
        assert_eq!(simplified.first(), p.first());
        assert_eq!(simplified.last(), p.last());
    }
}
