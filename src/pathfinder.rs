//! The segment-graph pathfinder.
//!
//! Stitches discovered [`Segment`](crate::discovery::Segment)s into a
//! longer directed path by building a graph whose nodes are `(segment,
//! orientation)` pairs and connecting nodes whose oriented endpoints lie
//! within a geographic tolerance of one another, head to tail. A plain
//! breadth-first search over that graph finds the shortest connecting
//! path, in the same `VecDeque` + visited-set + parent-pointer style used
//! for cluster growth elsewhere in this codebase (`sections.rs`'s
//! cell-flood-fill), adapted from a grid's 4/8-neighbor adjacency to the
//! segment graph's oriented-endpoint adjacency.

use std::collections::VecDeque;

use crate::discovery::Segment;
use crate::error::{Result, RouteMatchError};
use crate::geo;
use crate::store::TrackStore;
use crate::GpsPoint;

/// Tunables for [`find_path_between_segments`].
#[derive(Debug, Clone, Copy)]
pub struct PathfinderConfig {
    /// Minimum number of segments a returned path must contain.
    pub min_length: usize,
    /// Minimum supporting-track count (`|run_ranges|`) a segment must have
    /// to participate in the graph at all.
    pub min_runs: usize,
    /// Maximum great-circle distance, in meters, between two oriented
    /// endpoints for them to be considered connected.
    pub tolerance_m: f64,
}

impl Default for PathfinderConfig {
    fn default() -> Self {
        Self {
            min_length: 1,
            min_runs: 2,
            tolerance_m: 50.0,
        }
    }
}

/// A segment's traversal direction within a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Forward,
    Reversed,
}

/// One element of a reconstructed path: the segment traversed, its
/// 1-based position in the `segments` slice passed to
/// [`find_path_between_segments`], and the orientation it was traversed
/// in.
#[derive(Debug, Clone)]
pub struct PathElement {
    pub segment: Segment,
    pub segment_index: usize,
    pub orientation: Orientation,
}

fn locate(segments: &[Segment], needle: &Segment) -> Option<usize> {
    segments.iter().position(|s| s.ref_range == needle.ref_range)
}

/// Forward-orientation start endpoint: the first point of `ref_range`.
fn start_forward(store: &TrackStore, seg: &Segment) -> GpsPoint {
    store.point(seg.ref_range[0]).as_gps_point()
}

/// Forward-orientation end endpoint: the last point of `ref_range`.
fn end_forward(store: &TrackStore, seg: &Segment) -> GpsPoint {
    store.point(*seg.ref_range.last().unwrap()).as_gps_point()
}

fn near(a: GpsPoint, b: GpsPoint, tolerance_m: f64) -> bool {
    geo::haversine_distance(&a, &b) <= tolerance_m
}

/// Node index helpers: node `i` is `(segment i, Forward)`, node `i + n` is
/// `(segment i, Reversed)`, for `n` total segments.
fn node_segment(node: usize, n: usize) -> usize {
    node % n
}

fn node_orientation(node: usize, n: usize) -> Orientation {
    if node < n { Orientation::Forward } else { Orientation::Reversed }
}

/// Find a directed path of segments from `start` to `end`, stitching
/// segments whose endpoints connect head-to-tail (in either orientation)
/// within `config.tolerance_m`.
///
/// Performs a breadth-first search over the `2N`-node oriented-segment
/// graph starting at `(start, Forward)`; the first node visited whose
/// underlying segment is `end` (in either orientation) terminates the
/// search. Fails with [`RouteMatchError::PathNotFound`] if no such node is
/// reachable, [`RouteMatchError::ReconstructionFailure`] if the
/// reconstructed path's head segment does not match `start` (an internal
/// consistency check — should not happen given a correct BFS), and
/// [`RouteMatchError::PathTooShort`] if the found path has fewer than
/// `config.min_length` segments.
pub fn find_path_between_segments(
    start: &Segment,
    end: &Segment,
    segments: &[Segment],
    store: &TrackStore,
    config: &PathfinderConfig,
) -> Result<Vec<PathElement>> {
    let start_idx = locate(segments, start)
        .ok_or_else(|| RouteMatchError::InvalidInput { message: "start segment not found in segments list".to_string() })?;
    let end_idx = locate(segments, end)
        .ok_or_else(|| RouteMatchError::InvalidInput { message: "end segment not found in segments list".to_string() })?;

    let n = segments.len();
    let eligible: Vec<bool> = segments.iter().map(|s| s.run_ranges.len() >= config.min_runs).collect();

    let start_fwd: Vec<GpsPoint> = segments.iter().map(|s| start_forward(store, s)).collect();
    let end_fwd: Vec<GpsPoint> = segments.iter().map(|s| end_forward(store, s)).collect();

    // Adjacency list over 2n nodes: node i = (segment i, Forward),
    // node i+n = (segment i, Reversed).
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); 2 * n];
    for i in 0..n {
        if !eligible[i] {
            continue;
        }
        for j in 0..n {
            if i == j || !eligible[j] {
                continue;
            }
            if near(end_fwd[i], start_fwd[j], config.tolerance_m) {
                adjacency[i].push(j); // (i, forward) -> (j, forward)
            }
            if near(end_fwd[i], end_fwd[j], config.tolerance_m) {
                adjacency[i].push(j + n); // (i, forward) -> (j, reversed)
            }
            if near(start_fwd[i], start_fwd[j], config.tolerance_m) {
                adjacency[i + n].push(j); // (i, reversed) -> (j, forward)
            }
            if near(start_fwd[i], end_fwd[j], config.tolerance_m) {
                adjacency[i + n].push(j + n); // (i, reversed) -> (j, reversed)
            }
        }
    }

    let source = start_idx; // (start, Forward)
    let targets = [end_idx, end_idx + n];

    let mut visited = vec![false; 2 * n];
    let mut parent: Vec<Option<usize>> = vec![None; 2 * n];
    let mut queue: VecDeque<usize> = VecDeque::new();
    visited[source] = true;
    queue.push_back(source);

    let mut terminal: Option<usize> = None;
    if targets.contains(&source) {
        terminal = Some(source);
    }

    'bfs: while let Some(node) = queue.pop_front() {
        for &next in &adjacency[node] {
            if visited[next] {
                continue;
            }
            visited[next] = true;
            parent[next] = Some(node);
            if targets.contains(&next) {
                terminal = Some(next);
                break 'bfs;
            }
            queue.push_back(next);
        }
    }

    let terminal = terminal.ok_or(RouteMatchError::PathNotFound)?;

    // Reconstruct by walking parent pointers from terminal back to source,
    // then reversing.
    let mut node_path = vec![terminal];
    let mut cur = terminal;
    while let Some(p) = parent[cur] {
        node_path.push(p);
        cur = p;
    }
    node_path.reverse();

    let path: Vec<PathElement> = node_path
        .into_iter()
        .map(|node| {
            let seg_idx = node_segment(node, n);
            PathElement {
                segment: segments[seg_idx].clone(),
                segment_index: seg_idx + 1,
                orientation: node_orientation(node, n),
            }
        })
        .collect();

    if path.first().map(|e| e.segment_index - 1) != Some(start_idx) {
        return Err(RouteMatchError::ReconstructionFailure);
    }

    if path.len() < config.min_length {
        return Err(RouteMatchError::PathTooShort);
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{build_store, TrackPoint};
    use std::collections::HashMap;

    fn straight_track(lat: f64, lon0: f64, step: f64, n: usize) -> Vec<TrackPoint> {
        (0..n).map(|i| TrackPoint::new(lat, lon0 + step * i as f64)).collect()
    }

    /// Build a minimal store with one long track so segments can be carved
    /// out of real global indices, then hand-construct `Segment`s whose
    /// `ref_range` points at disjoint slices of that track positioned so
    /// their endpoints are near (or far) from one another, as required by
    /// each scenario.
    fn segment_from(store: &crate::store::TrackStore, indices: &[u32], support: usize) -> Segment {
        let polyline = store.polyline_for(indices);
        let mut run_ranges = HashMap::new();
        for t in 0..support {
            run_ranges.insert(t, indices.to_vec());
        }
        Segment {
            ref_range: indices.to_vec(),
            candidate_length_m: geo::polyline_length(&polyline),
            candidate_polyline: polyline.iter().map(|p| (p.latitude, p.longitude)).collect(),
            run_ranges,
        }
    }

    // Scenario S5 — three segments chained head-to-tail, forward throughout.
    #[test]
    fn s5_chains_three_segments_forward() {
        // Each consecutive pair of segments shares its boundary point, so
        // the segment endpoints connect exactly (distance 0) regardless of
        // the track's point spacing.
        let track = straight_track(46.5, 15.0, 0.01, 28);
        let store = build_store(vec![track]).unwrap();

        let s1 = segment_from(&store, &(0..10).collect::<Vec<u32>>(), 2);
        let s2 = segment_from(&store, &(9..19).collect::<Vec<u32>>(), 2);
        let s3 = segment_from(&store, &(18..28).collect::<Vec<u32>>(), 2);
        let segments = vec![s1.clone(), s2.clone(), s3.clone()];

        let config = PathfinderConfig { min_length: 3, min_runs: 2, tolerance_m: 50.0 };
        let path = find_path_between_segments(&s1, &s3, &segments, &store, &config).unwrap();

        assert_eq!(path.len(), 3);
        assert_eq!(path[0].segment_index, 1);
        assert_eq!(path[1].segment_index, 2);
        assert_eq!(path[2].segment_index, 3);
        assert!(path.iter().all(|e| e.orientation == Orientation::Forward));
    }

    // Scenario S6 — two segments whose ends are near, but whose starts are
    // far apart; the second must be traversed reversed.
    #[test]
    fn s6_reverses_second_segment_when_tails_meet() {
        let track_a = straight_track(46.5, 15.0, 0.01, 10);
        // Track b covers the same physical road, captured in the same
        // direction: its end coincides with track a's end, but its start
        // does not coincide with track a's end, so only a tail-to-tail
        // (forward -> reversed) connection exists.
        let track_b = straight_track(46.5, 15.0, 0.01, 10);
        let store = build_store(vec![track_a, track_b]).unwrap();

        let s1 = segment_from(&store, &(0..10).collect::<Vec<u32>>(), 2);
        let s2 = segment_from(&store, &(10..20).collect::<Vec<u32>>(), 2);
        let segments = vec![s1.clone(), s2.clone()];

        let config = PathfinderConfig { min_length: 2, min_runs: 2, tolerance_m: 50.0 };
        let path = find_path_between_segments(&s1, &s2, &segments, &store, &config).unwrap();

        assert_eq!(path.len(), 2);
        assert_eq!(path[0].orientation, Orientation::Forward);
        assert_eq!(path[1].orientation, Orientation::Reversed);
    }

    #[test]
    fn returns_path_not_found_when_disconnected() {
        let track = straight_track(46.5, 15.0, 0.01, 10);
        let far = straight_track(10.0, -60.0, 0.01, 10);
        let store = build_store(vec![track, far]).unwrap();

        let s1 = segment_from(&store, &(0..10).collect::<Vec<u32>>(), 2);
        let s2 = segment_from(&store, &(10..20).collect::<Vec<u32>>(), 2);
        let segments = vec![s1.clone(), s2.clone()];

        let config = PathfinderConfig { min_length: 1, min_runs: 2, tolerance_m: 50.0 };
        let result = find_path_between_segments(&s1, &s2, &segments, &store, &config);
        assert!(matches!(result, Err(RouteMatchError::PathNotFound)));
    }

    #[test]
    fn returns_path_too_short_when_min_length_unmet() {
        let track = straight_track(46.5, 15.0, 0.01, 19);
        let store = build_store(vec![track]).unwrap();

        let s1 = segment_from(&store, &(0..10).collect::<Vec<u32>>(), 2);
        let s2 = segment_from(&store, &(9..19).collect::<Vec<u32>>(), 2);
        let segments = vec![s1.clone(), s2.clone()];

        let config = PathfinderConfig { min_length: 5, min_runs: 2, tolerance_m: 50.0 };
        let result = find_path_between_segments(&s1, &s2, &segments, &store, &config);
        assert!(matches!(result, Err(RouteMatchError::PathTooShort)));
    }

    #[test]
    fn ineligible_segment_below_min_runs_has_no_edges() {
        let track = straight_track(46.5, 15.0, 0.01, 19);
        let store = build_store(vec![track]).unwrap();

        let s1 = segment_from(&store, &(0..10).collect::<Vec<u32>>(), 2);
        let s2 = segment_from(&store, &(9..19).collect::<Vec<u32>>(), 1); // below min_runs
        let segments = vec![s1.clone(), s2.clone()];

        let config = PathfinderConfig { min_length: 1, min_runs: 2, tolerance_m: 50.0 };
        let result = find_path_between_segments(&s1, &s2, &segments, &store, &config);
        assert!(matches!(result, Err(RouteMatchError::PathNotFound)));
    }
}
