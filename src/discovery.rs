//! The segment discovery engine.
//!
//! Given a reference track, enumerates candidate reference sub-ranges of a
//! target geographic length and finds which other tracks repeat each
//! candidate within a Fréchet tolerance. Two stages, mirroring the
//! parallel `par_iter().filter_map().collect()` / sequential-dedup split
//! used for section detection elsewhere in this codebase:
//!
//! - **Stage 1** (parallel): a cheap boolean Fréchet check with early exit,
//!   counting how many tracks support each candidate.
//! - **Stage 2** (sequential): deduplicates promoted candidates by
//!   reference-range overlap, then recomputes the best matching window per
//!   supporting track for the survivors.
//!
//! Computing full per-track details for every candidate up front would
//! waste most of the work, since most candidates fail `min_runs` or get
//! deduplicated; Stage 1 filters cheaply before Stage 2 pays for detail.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use log::{info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::error::{Result, RouteMatchError};
use crate::geo;
use crate::spatial::{self, TrackSpatialIndex};
use crate::store::TrackStore;
use crate::GpsPoint;

/// Contiguity slack in the narrow-phase gate: a window is admissible if the
/// gap between its extreme global indices is at most `window_len +
/// CONTIGUITY_SLACK`. A build-time design constant, not a runtime option,
/// per the specification's guidance that the undocumented `tolerance * 20`
/// variant seen in some source drafts is not canonical — only this `+5`
/// rule is implemented.
pub const CONTIGUITY_SLACK: usize = 5;

/// Tunables for [`find_overlapping_segments`].
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryConfig {
    /// Target minimum geographic length of a candidate segment, in meters.
    pub max_length_m: f64,
    /// Fréchet acceptance tolerance for a supporting run, in meters.
    pub tol_m: f64,
    /// Stride between consecutive candidate starts along the reference
    /// track.
    pub window_step: usize,
    /// Minimum number of distinct supporting tracks (including the
    /// reference) for a candidate to be promoted.
    pub min_runs: usize,
    /// Broad-phase bounding-box expansion margin, in meters.
    pub prefilter_margin_m: f64,
    /// Jaccard-like overlap threshold on `ref_range` used to deduplicate
    /// candidates, in `[0, 1]`.
    pub dedup_overlap_frac: f64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_length_m: 500.0,
            tol_m: 5.0,
            window_step: 1,
            min_runs: 2,
            prefilter_margin_m: 5.0,
            dedup_overlap_frac: 0.8,
        }
    }
}

/// A discovered repeated route segment.
#[derive(Debug, Clone)]
pub struct Segment {
    /// Global point indices from the reference track forming the
    /// representative polyline.
    pub ref_range: Vec<u32>,
    /// Geographic length of `candidate_polyline`, in meters.
    pub candidate_length_m: f64,
    /// The `(latitude, longitude)` sequence for `ref_range`.
    pub candidate_polyline: Vec<(f64, f64)>,
    /// Track position -> contiguous ordered global index range in that
    /// track whose polyline is within tolerance of `candidate_polyline`.
    /// The reference track's own position is always present.
    pub run_ranges: HashMap<usize, Vec<u32>>,
}

struct CandidateWindow {
    start: usize,
    end: usize,
}

fn valid_starts(cum: &[f64], window_step: usize, max_length_m: f64) -> Vec<CandidateWindow> {
    let mut starts = Vec::new();
    let mut s = 0usize;
    while s < cum.len() {
        let target = cum[s] + max_length_m;
        let mut e = s + 1;
        while e < cum.len() && cum[e] < target {
            e += 1;
        }
        if e < cum.len() {
            starts.push(CandidateWindow { start: s, end: e });
        }
        s += window_step;
    }
    starts
}

/// Radius (in degrees) for the broad-phase R-tree query around a
/// candidate's center: half the candidate's bounding-box diagonal plus the
/// Fréchet tolerance plus the prefilter margin, both already converted to
/// degrees.
fn search_radius_deg(candidate_bounds: &crate::Bounds, tol_deg: f64, prefilter_margin_deg: f64) -> f64 {
    let dlat = candidate_bounds.max_lat - candidate_bounds.min_lat;
    let dlng = candidate_bounds.max_lng - candidate_bounds.min_lng;
    let half_diagonal = (dlat * dlat + dlng * dlng).sqrt() / 2.0;
    half_diagonal + tol_deg + prefilter_margin_deg
}

/// Sorted, ascending global indices of `track_pos` within `radius_deg` of
/// `center`.
fn candidate_set(index: &TrackSpatialIndex, center: (f64, f64), radius_deg: f64) -> Vec<u32> {
    let mut set = index.in_range(center, radius_deg);
    set.sort_unstable();
    set
}

/// Contiguous-gap-admissible windows of `window_len` consecutive elements
/// of the (sorted) `candidate_set`.
fn admissible_windows(candidate_set: &[u32], window_len: usize) -> impl Iterator<Item = &[u32]> {
    candidate_set.windows(window_len).filter(move |w| {
        let gap = w[w.len() - 1] - w[0];
        (gap as usize) <= window_len + CONTIGUITY_SLACK
    })
}

/// Best (smallest-distance) admissible window of `track_set` within
/// `tol_m`, returned as its inclusive `(min_idx, max_idx)` global index
/// range.
fn best_window(
    store: &TrackStore,
    track_set: &[u32],
    candidate_polyline: &[GpsPoint],
    tol_m: f64,
) -> Option<(u32, u32)> {
    let window_len = candidate_polyline.len();
    if track_set.len() < window_len {
        return None;
    }
    let mut best: Option<(f64, u32, u32)> = None;
    for window in admissible_windows(track_set, window_len) {
        let window_points: Vec<GpsPoint> = window.iter().map(|&i| store.point(i).as_gps_point()).collect();
        let dist = geo::discrete_frechet(candidate_polyline, &window_points);
        if dist <= tol_m {
            let better = match &best {
                None => true,
                Some((best_dist, _, _)) => dist < *best_dist,
            };
            if better {
                best = Some((dist, window[0], window[window.len() - 1]));
            }
        }
    }
    best.map(|(_, first, last)| (first, last))
}

/// Boolean early-exit check: does any admissible window support the
/// candidate within `tol_m`?
fn track_supports_within(
    store: &TrackStore,
    track_set: &[u32],
    candidate_polyline: &[GpsPoint],
    tol_m: f64,
) -> bool {
    let window_len = candidate_polyline.len();
    if track_set.len() < window_len {
        return false;
    }
    for window in admissible_windows(track_set, window_len) {
        let window_points: Vec<GpsPoint> = window.iter().map(|&i| store.point(i).as_gps_point()).collect();
        if geo::discrete_frechet_within(candidate_polyline, &window_points, tol_m) {
            return true;
        }
    }
    false
}

/// Run the two-stage discovery algorithm over `store`, using the track at
/// `ref_ride_idx` as the reference.
///
/// Returns the discovered segments (unordered) and the positions of tracks
/// identified as "close" to the reference (bounding boxes intersecting the
/// reference's expanded bounding box). An empty close-tracks set or zero
/// candidates meeting `min_runs` are not errors: both return `Ok` with
/// empty results.
pub fn find_overlapping_segments(
    store: &TrackStore,
    ref_ride_idx: usize,
    config: &DiscoveryConfig,
) -> Result<(Vec<Segment>, Vec<usize>)> {
    if ref_ride_idx >= store.track_count() {
        return Err(RouteMatchError::InvalidInput {
            message: format!("ref_ride_idx {} out of bounds (track_count={})", ref_ride_idx, store.track_count()),
        });
    }
    if config.window_step == 0 {
        return Err(RouteMatchError::InvalidInput {
            message: "window_step must be positive".to_string(),
        });
    }
    if !(0.0..=1.0).contains(&config.dedup_overlap_frac) {
        return Err(RouteMatchError::InvalidInput {
            message: format!("dedup_overlap_frac {} outside [0,1]", config.dedup_overlap_frac),
        });
    }
    let min_runs = if config.min_runs < 1 {
        warn!("min_runs {} < 1, clamping to 1", config.min_runs);
        1
    } else {
        config.min_runs
    };

    let start_time = Instant::now();

    // --- Preparation ---
    let ref_global_indices = store.track_indices(ref_ride_idx);
    let ref_gps: Vec<GpsPoint> = store.track_points(ref_ride_idx).iter().map(|p| p.as_gps_point()).collect();
    if ref_gps.len() < 2 {
        return Ok((vec![], vec![]));
    }

    let ref_bounds = geo::compute_bounds(&ref_gps);
    let ref_mean_lat = (ref_bounds.min_lat + ref_bounds.max_lat) / 2.0;
    let tol_deg = geo::meters_to_degrees(config.tol_m, ref_mean_lat);
    let prefilter_margin_deg = geo::meters_to_degrees(config.prefilter_margin_m, ref_mean_lat);

    let close_tracks: Vec<usize> = (0..store.track_count())
        .filter(|&t| {
            let track_bounds = geo::compute_bounds(&store.polyline_for(&store.track_indices(t)));
            geo::bounds_overlap(&ref_bounds, &track_bounds, config.prefilter_margin_m, ref_mean_lat)
        })
        .collect();

    if close_tracks.is_empty() {
        info!("discovery: close_tracks=0, returning empty results");
        return Ok((vec![], vec![]));
    }

    #[cfg(feature = "parallel")]
    let track_indices: HashMap<usize, TrackSpatialIndex> = close_tracks
        .par_iter()
        .map(|&t| (t, spatial::build_track_index(store, t)))
        .collect();
    #[cfg(not(feature = "parallel"))]
    let track_indices: HashMap<usize, TrackSpatialIndex> = close_tracks
        .iter()
        .map(|&t| (t, spatial::build_track_index(store, t)))
        .collect();

    let cum = geo::cumulative_arc_length(&ref_gps);
    let starts = valid_starts(&cum, config.window_step, config.max_length_m);

    info!(
        "discovery: {} close tracks, {} valid candidate starts",
        close_tracks.len(),
        starts.len()
    );

    // --- Stage 1: parallel counting pass ---
    let count_candidate = |window: &CandidateWindow| -> (usize, usize, usize) {
        let candidate_polyline = &ref_gps[window.start..=window.end];
        let candidate_bounds = geo::compute_bounds(candidate_polyline);
        let candidate_center = geo::compute_center(candidate_polyline);
        let r_deg = search_radius_deg(&candidate_bounds, tol_deg, prefilter_margin_deg);

        let count = close_tracks
            .iter()
            .filter(|&&t| {
                let idx = &track_indices[&t];
                let set = candidate_set(idx, (candidate_center.latitude, candidate_center.longitude), r_deg);
                track_supports_within(store, &set, candidate_polyline, config.tol_m)
            })
            .count();

        (window.start, window.end, count)
    };

    #[cfg(feature = "parallel")]
    let counted: Vec<(usize, usize, usize)> = starts.par_iter().map(count_candidate).collect();
    #[cfg(not(feature = "parallel"))]
    let counted: Vec<(usize, usize, usize)> = starts.iter().map(count_candidate).collect();

    // --- Promotion ---
    let mut promoted: Vec<(usize, usize, usize)> =
        counted.into_iter().filter(|&(_, _, count)| count >= min_runs).collect();
    promoted.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));

    info!("discovery: {} candidates promoted after stage 1", promoted.len());

    // --- Stage 2: sequential dedup + detail pass ---
    let mut accepted: Vec<Segment> = Vec::new();
    for (s, e, _count) in promoted {
        let candidate_range: Vec<u32> = ref_global_indices[s..=e].to_vec();
        let candidate_set_hash: HashSet<u32> = candidate_range.iter().copied().collect();

        let is_duplicate = accepted.iter().any(|existing: &Segment| {
            let existing_set: HashSet<u32> = existing.ref_range.iter().copied().collect();
            let common = candidate_set_hash.intersection(&existing_set).count();
            let denom = candidate_range.len().min(existing.ref_range.len());
            denom > 0 && (common as f64 / denom as f64) >= config.dedup_overlap_frac
        });
        if is_duplicate {
            continue;
        }

        let candidate_polyline_gps = &ref_gps[s..=e];
        let candidate_bounds = geo::compute_bounds(candidate_polyline_gps);
        let candidate_center = geo::compute_center(candidate_polyline_gps);
        let r_deg = search_radius_deg(&candidate_bounds, tol_deg, prefilter_margin_deg);

        let mut run_ranges: HashMap<usize, Vec<u32>> = HashMap::new();
        for &t in &close_tracks {
            let idx = &track_indices[&t];
            let set = candidate_set(idx, (candidate_center.latitude, candidate_center.longitude), r_deg);
            if let Some((first, last)) = best_window(store, &set, candidate_polyline_gps, config.tol_m) {
                run_ranges.insert(t, (first..=last).collect());
            }
        }

        if run_ranges.len() < min_runs {
            // Stage 1's boolean check and stage 2's best-window search agree
            // by construction, but guard against it anyway rather than
            // emit an under-supported segment.
            continue;
        }

        let candidate_length_m = geo::polyline_length(candidate_polyline_gps);
        let candidate_polyline: Vec<(f64, f64)> =
            candidate_polyline_gps.iter().map(|p| (p.latitude, p.longitude)).collect();

        accepted.push(Segment {
            ref_range: candidate_range,
            candidate_length_m,
            candidate_polyline,
            run_ranges,
        });
    }

    info!(
        "discovery: {} segments discovered in {:?}",
        accepted.len(),
        start_time.elapsed()
    );

    Ok((accepted, close_tracks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{build_store, TrackPoint};

    fn straight_track(lat: f64, lon0: f64, step: f64, n: usize) -> Vec<TrackPoint> {
        (0..n).map(|i| TrackPoint::new(lat, lon0 + step * i as f64)).collect()
    }

    #[test]
    fn rejects_out_of_bounds_ref_ride() {
        let store = build_store(vec![straight_track(46.5, 15.0, 0.0001, 10)]).unwrap();
        let config = DiscoveryConfig::default();
        let result = find_overlapping_segments(&store, 5, &config);
        assert!(matches!(result, Err(RouteMatchError::InvalidInput { .. })));
    }

    #[test]
    fn rejects_zero_window_step() {
        let store = build_store(vec![straight_track(46.5, 15.0, 0.0001, 10)]).unwrap();
        let config = DiscoveryConfig { window_step: 0, ..Default::default() };
        let result = find_overlapping_segments(&store, 0, &config);
        assert!(matches!(result, Err(RouteMatchError::InvalidInput { .. })));
    }

    #[test]
    fn rejects_dedup_overlap_frac_out_of_range() {
        let store = build_store(vec![straight_track(46.5, 15.0, 0.0001, 10)]).unwrap();
        let config = DiscoveryConfig { dedup_overlap_frac: 1.5, ..Default::default() };
        let result = find_overlapping_segments(&store, 0, &config);
        assert!(matches!(result, Err(RouteMatchError::InvalidInput { .. })));
    }

    // Scenario S1 — trivial repetition: two identical straight tracks.
    #[test]
    fn s1_trivial_repetition_finds_a_segment() {
        let track = straight_track(46.5, 15.0, 0.0001, 10);
        let store = build_store(vec![track.clone(), track]).unwrap();
        let config = DiscoveryConfig {
            max_length_m: 50.0,
            tol_m: 1.0,
            window_step: 1,
            min_runs: 2,
            prefilter_margin_m: 5.0,
            dedup_overlap_frac: 0.8,
        };
        let (segments, close_tracks) = find_overlapping_segments(&store, 0, &config).unwrap();
        assert_eq!(close_tracks.len(), 2);
        assert!(!segments.is_empty());
        let seg = &segments[0];
        assert!(seg.run_ranges.len() >= 2);
        assert!(seg.run_ranges.contains_key(&0));
        assert!(seg.candidate_length_m >= 50.0 - 1e-6);
    }

    // Scenario S3 — Fréchet tolerance sanity.
    #[test]
    fn s3_tight_tolerance_rejects_perturbed_track() {
        let track_a = straight_track(46.5, 15.0, 0.0002, 30);
        // Perturb track B by roughly 3m orthogonal (a small latitude shift).
        let track_b: Vec<TrackPoint> = track_a
            .iter()
            .map(|p| TrackPoint::new(p.latitude + 0.00003, p.longitude))
            .collect();
        let store = build_store(vec![track_a, track_b]).unwrap();

        let loose = DiscoveryConfig {
            max_length_m: 300.0,
            tol_m: 6.0,
            window_step: 1,
            min_runs: 2,
            prefilter_margin_m: 5.0,
            dedup_overlap_frac: 0.8,
        };
        let (found_loose, _) = find_overlapping_segments(&store, 0, &loose).unwrap();
        assert!(!found_loose.is_empty());

        let tight = DiscoveryConfig { tol_m: 0.5, ..loose };
        let (found_tight, _) = find_overlapping_segments(&store, 0, &tight).unwrap();
        assert!(found_tight.is_empty());
    }

    #[test]
    fn no_close_tracks_returns_empty_not_error() {
        let store = build_store(vec![
            straight_track(46.5, 15.0, 0.0001, 10),
            straight_track(10.0, -60.0, 0.0001, 10),
        ])
        .unwrap();
        let config = DiscoveryConfig { prefilter_margin_m: 1.0, ..Default::default() };
        let (segments, close_tracks) = find_overlapping_segments(&store, 0, &config).unwrap();
        assert!(segments.is_empty());
        assert_eq!(close_tracks.len(), 1);
    }

    #[test]
    fn min_runs_below_one_is_clamped() {
        let track = straight_track(46.5, 15.0, 0.0001, 10);
        let store = build_store(vec![track]).unwrap();
        let config = DiscoveryConfig {
            max_length_m: 50.0,
            min_runs: 0,
            ..Default::default()
        };
        let (segments, _) = find_overlapping_segments(&store, 0, &config).unwrap();
        // A single track with min_runs clamped to 1 still matches itself.
        assert!(!segments.is_empty());
    }
}
