//! Track storage: the global point arena and the tracks that index into it.
//!
//! A [`TrackStore`] owns every ingested point in one flat `Vec<TrackPoint>`
//! (the "global point table") plus a `Vec<Track>` of `[first..=last]` ranges
//! into that arena. Segments and spatial indices refer to points by their
//! `u32` position in the arena rather than by owned copies or by
//! `(track, local_index)` pairs, per the arena-plus-dense-index pattern:
//! this avoids ownership cycles and makes sharing across worker threads
//! trivial (the arena is read-only after [`build_store`] returns).

use std::collections::HashMap;

use crate::error::{Result, RouteMatchError};
use crate::GpsPoint;

/// One recorded GPS fix.
///
/// Only `latitude`/`longitude` are required by the discovery and pathfinder
/// engines; everything else is optional and never inspected by them. `extra`
/// is a side-channel for arbitrary additional scalar/string properties
/// (heart rate, cadence, sport-specific fields, ...) that a caller may want
/// to carry through but which the core never reads — keeping the hot loops
/// free of string-keyed map lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub time: Option<i64>,
    pub altitude: Option<f64>,
    pub distance: Option<f64>,
    pub extra: HashMap<String, serde_json::Value>,
}

impl TrackPoint {
    /// Construct a point with only the mandatory fields set.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            time: None,
            altitude: None,
            distance: None,
            extra: HashMap::new(),
        }
    }

    /// Whether the coordinates are finite and within the valid WGS84 range.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Project down to the bare lat/lon pair the geo primitives operate on.
    pub fn as_gps_point(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

/// One recorded activity: a contiguous, inclusive range of global point
/// indices into the store's arena, in original capture order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Track {
    pub first: u32,
    pub last: u32,
}

impl Track {
    /// Number of points in this track.
    pub fn len(&self) -> usize {
        (self.last - self.first + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Immutable collection of tracks plus the global point arena they index
/// into. Constructed once by [`build_store`] and read-only thereafter —
/// shared by reference across worker threads during discovery.
#[derive(Debug)]
pub struct TrackStore {
    points: Vec<TrackPoint>,
    tracks: Vec<Track>,
}

impl TrackStore {
    /// All tracks, in input order. A track's position in this slice is its
    /// "track position" as used elsewhere in the API (`ref_ride_idx`,
    /// `run_ranges` keys, close-track indices).
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Number of tracks in the store.
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// O(1) lookup of a point by its global arena index.
    pub fn point(&self, global_idx: u32) -> &TrackPoint {
        &self.points[global_idx as usize]
    }

    /// The full global point arena, in arena order (tracks are stored
    /// contiguously and in input order, so this is also the concatenation
    /// of every track's points).
    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    /// O(1) access to a track's inclusive global index range.
    pub fn track_range(&self, track_pos: usize) -> Track {
        self.tracks[track_pos]
    }

    /// The ordered global indices belonging to a track.
    pub fn track_indices(&self, track_pos: usize) -> Vec<u32> {
        let t = self.tracks[track_pos];
        (t.first..=t.last).collect()
    }

    /// The ordered points belonging to a track, as a contiguous slice of the
    /// arena (tracks never interleave, so this is a single slice, not a
    /// gather).
    pub fn track_points(&self, track_pos: usize) -> &[TrackPoint] {
        let t = self.tracks[track_pos];
        &self.points[t.first as usize..=t.last as usize]
    }

    /// Resolve a global index range to its `GpsPoint` polyline.
    pub fn polyline_for(&self, indices: &[u32]) -> Vec<GpsPoint> {
        indices.iter().map(|&i| self.point(i).as_gps_point()).collect()
    }
}

/// Build a [`TrackStore`] from raw per-track point sequences.
///
/// Fails with [`RouteMatchError::InvalidInput`] if any track has fewer than
/// two points with finite, valid lat/lon, or if `tracks_input` is empty.
/// Points are concatenated into the arena in input order; each track's
/// `[first..=last]` range reflects its position within that concatenation.
pub fn build_store(tracks_input: Vec<Vec<TrackPoint>>) -> Result<TrackStore> {
    if tracks_input.is_empty() {
        return Err(RouteMatchError::InvalidInput {
            message: "no tracks provided".to_string(),
        });
    }

    let mut points = Vec::new();
    let mut tracks = Vec::with_capacity(tracks_input.len());

    for (pos, track_points) in tracks_input.into_iter().enumerate() {
        let valid_count = track_points.iter().filter(|p| p.is_valid()).count();
        if valid_count < 2 {
            return Err(RouteMatchError::InvalidInput {
                message: format!(
                    "track at position {} has {} valid points, at least 2 required",
                    pos, valid_count
                ),
            });
        }

        let first = points.len() as u32;
        points.extend(track_points);
        let last = points.len() as u32 - 1;
        tracks.push(Track { first, last });
    }

    Ok(TrackStore { points, tracks })
}
