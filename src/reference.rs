//! Reference-ride selection.
//!
//! Picks the track that passes through the most "hotspot" cells — grid
//! cells visited by many distinct tracks — on the theory that the track
//! touching the most shared ground is the best anchor for discovery.
//! Grounded in the grid-cell quantization used for frequent-section
//! detection elsewhere in this codebase (`SportGrid`/`point_to_cell`):
//! cell size is computed once from the mean latitude of all points, then
//! every point is floor-divided into a `(row, col)` cell.

use std::collections::{HashMap, HashSet};

use log::warn;

use crate::store::TrackStore;

const METERS_PER_LAT_DEGREE: f64 = 111_319.0;

/// Tunables for [`find_best_ref_ride`].
#[derive(Debug, Clone, Copy)]
pub struct ReferenceConfig {
    /// Hotspot grid cell size, in meters.
    pub grid_size_m: f64,
    /// Minimum number of distinct tracks visiting a cell for it to count
    /// as a hotspot.
    pub min_reps_for_hotspot: usize,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            grid_size_m: 50.0,
            min_reps_for_hotspot: 10,
        }
    }
}

/// Choose the reference track position: the track with the highest count
/// of points falling in hotspot cells. Ties broken by lowest track
/// position.
///
/// If no cell meets `min_reps_for_hotspot`, falls back to track position
/// `0` and logs a warning — this is a recoverable condition, not an error.
pub fn find_best_ref_ride(store: &TrackStore, config: &ReferenceConfig) -> usize {
    let points = store.points();
    if points.is_empty() {
        return 0;
    }

    let mean_lat = points.iter().map(|p| p.latitude).sum::<f64>() / points.len() as f64;
    let cell_size_lat = config.grid_size_m / METERS_PER_LAT_DEGREE;
    let lng_scale = mean_lat.to_radians().cos().abs().max(0.1);
    let cell_size_lng = cell_size_lat / lng_scale;

    let point_to_cell = |lat: f64, lng: f64| -> (i32, i32) {
        ((lat / cell_size_lat).floor() as i32, (lng / cell_size_lng).floor() as i32)
    };

    // cell -> distinct visiting track positions
    let mut cell_visitors: HashMap<(i32, i32), HashSet<usize>> = HashMap::new();
    for (track_pos, _) in store.tracks().iter().enumerate() {
        let mut visited_cells: HashSet<(i32, i32)> = HashSet::new();
        for p in store.track_points(track_pos) {
            visited_cells.insert(point_to_cell(p.latitude, p.longitude));
        }
        for cell in visited_cells {
            cell_visitors.entry(cell).or_default().insert(track_pos);
        }
    }

    let hotspots: HashSet<(i32, i32)> = cell_visitors
        .into_iter()
        .filter(|(_, tracks)| tracks.len() >= config.min_reps_for_hotspot)
        .map(|(cell, _)| cell)
        .collect();

    if hotspots.is_empty() {
        warn!("no hotspot cells found (min_reps_for_hotspot={}); falling back to track 0", config.min_reps_for_hotspot);
        return 0;
    }

    let mut best_pos = 0usize;
    let mut best_score = -1i64;
    for (track_pos, _) in store.tracks().iter().enumerate() {
        let score = store
            .track_points(track_pos)
            .iter()
            .filter(|p| hotspots.contains(&point_to_cell(p.latitude, p.longitude)))
            .count() as i64;
        if score > best_score {
            best_score = score;
            best_pos = track_pos;
        }
    }

    best_pos
}
