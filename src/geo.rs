//! # Geographic Utilities
//!
//! Core geographic computation primitives for GPS track analysis.
//!
//! All functions are designed to be efficient and accurate for GPS trajectory data.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two GPS points |
//! | [`polyline_length`] | Total length of a GPS track in meters |
//! | [`cumulative_arc_length`] | Running arc length along a GPS track |
//! | [`compute_bounds`] | Bounding box of a GPS track |
//! | [`compute_center`] | Centroid of a GPS track |
//! | [`bounds_overlap`] | Check if two bounding boxes overlap |
//! | [`meters_to_degrees`] | Convert meters to approximate degrees at a latitude |
//! | [`douglas_peucker`] | Polyline simplification with a perpendicular-distance tolerance |
//! | [`discrete_frechet`] | Discrete Fréchet distance between two polylines |
//! | [`discrete_frechet_within`] | Early-exit boolean Fréchet tolerance check |
//!
//! ## Example
//!
//! ```rust
//! use trackrepeat::{GpsPoint, geo};
//!
//! let track = vec![
//!     GpsPoint::new(51.5074, -0.1278),  // London
//!     GpsPoint::new(51.5080, -0.1290),
//!     GpsPoint::new(51.5090, -0.1300),
//! ];
//!
//! let length = geo::polyline_length(&track);
//! println!("Track length: {:.0}m", length);
//!
//! let bounds = geo::compute_bounds(&track);
//! println!("Bounds: {:.4}N to {:.4}N", bounds.min_lat, bounds.max_lat);
//!
//! let dist = geo::haversine_distance(&track[0], &track[2]);
//! println!("Start to end: {:.0}m", dist);
//! ```
//!
//! ## Algorithm Notes
//!
//! ### Haversine Formula
//!
//! The haversine formula calculates the great-circle distance between two points on a sphere.
//! It's the standard method for GPS distance calculation, accurate to within 0.3% for most
//! practical applications.
//!
//! Reference: [Haversine formula (Wikipedia)](https://en.wikipedia.org/wiki/Haversine_formula)
//!
//! ### Coordinate System
//!
//! All functions expect WGS84 coordinates (latitude/longitude in degrees), which is the
//! standard used by GPS receivers and mapping services.
//!
//! ### Discrete Fréchet distance
//!
//! [`discrete_frechet`] implements the classic Eiter/Mannila bottom-up dynamic program over
//! the two polylines' coordinate sequences, using [`haversine_distance`] as the point metric
//! so results are reported in meters rather than planar units.

// Leading `::` disambiguates the `geo` crate dependency from this crate's
// own `geo` module of the same name.
use ::geo::{Point, Haversine, Distance};
use crate::{GpsPoint, Bounds};

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two GPS points using the Haversine formula.
///
/// Returns the distance in meters along the Earth's surface (assuming a spherical Earth
/// with radius 6,371 km).
///
/// # Example
///
/// ```rust
/// use trackrepeat::{GpsPoint, geo};
///
/// let london = GpsPoint::new(51.5074, -0.1278);
/// let paris = GpsPoint::new(48.8566, 2.3522);
///
/// let distance = geo::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0); // ~344 km
/// ```
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Calculate the total length of a polyline (GPS track) in meters.
///
/// Sums the haversine distance between consecutive points. Empty or single-point
/// tracks return 0.0.
pub fn polyline_length(points: &[GpsPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

/// Cumulative arc length along an ordered sequence of points, in meters.
///
/// `result[0] == 0.0` and `result[k] == result[k-1] + haversine_distance(points[k-1],
/// points[k])`. Always the same length as `points`; empty input returns an empty vec.
pub fn cumulative_arc_length(points: &[GpsPoint]) -> Vec<f64> {
    let mut cum = Vec::with_capacity(points.len());
    let mut acc = 0.0;
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            acc += haversine_distance(&points[i - 1], p);
        }
        cum.push(acc);
    }
    cum
}

/// Convert meters to approximate degrees at a given latitude.
///
/// Uses a latitude-adjusted equatorial approximation: more accurate at the given
/// latitude than a fixed conversion factor.
///
/// # Notes
///
/// - At the equator, 1 degree ≈ 111,320 meters
/// - At 45°N/S, 1 degree ≈ 78,710 meters (longitude) / 111,132 meters (latitude)
/// - At the poles, longitude degrees become meaningless
///
/// This function returns a single value suitable for bounding box calculations
/// where a square search area is acceptable.
#[inline]
pub fn meters_to_degrees(meters: f64, latitude: f64) -> f64 {
    let lat_rad = latitude.to_radians();
    let meters_per_degree = 111_320.0 * lat_rad.cos().max(0.1);
    meters / meters_per_degree
}

// =============================================================================
// Bounding Box Functions
// =============================================================================

/// Compute the bounding box of a GPS track.
///
/// For empty input, returns a bounds with MIN/MAX sentinel values that will fail
/// any overlap check.
pub fn compute_bounds(points: &[GpsPoint]) -> Bounds {
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

    Bounds { min_lat, max_lat, min_lng, max_lng }
}

/// Compute the bounding box as a tuple `(min_lat, max_lat, min_lng, max_lng)`.
#[inline]
pub fn compute_bounds_tuple(points: &[GpsPoint]) -> (f64, f64, f64, f64) {
    let bounds = compute_bounds(points);
    (bounds.min_lat, bounds.max_lat, bounds.min_lng, bounds.max_lng)
}

/// Check if two bounding boxes overlap, with an optional buffer.
///
/// Useful for quick spatial filtering before expensive point-by-point comparisons.
/// Two tracks with non-overlapping bounds cannot share any common points.
pub fn bounds_overlap(a: &Bounds, b: &Bounds, buffer_meters: f64, reference_lat: f64) -> bool {
    let buffer_deg = meters_to_degrees(buffer_meters, reference_lat);

    !(a.max_lat + buffer_deg < b.min_lat ||
      b.max_lat + buffer_deg < a.min_lat ||
      a.max_lng + buffer_deg < b.min_lng ||
      b.max_lng + buffer_deg < a.min_lng)
}

// =============================================================================
// Center/Centroid Functions
// =============================================================================

/// Compute the geographic center (centroid) of a GPS track.
///
/// Returns the arithmetic mean of all latitude and longitude values. Returns
/// `(0, 0)` for empty input.
///
/// For tracks spanning large areas or crossing the antimeridian (180°/-180° longitude),
/// this simple averaging may produce unexpected results.
pub fn compute_center(points: &[GpsPoint]) -> GpsPoint {
    if points.is_empty() {
        return GpsPoint::new(0.0, 0.0);
    }

    let sum_lat: f64 = points.iter().map(|p| p.latitude).sum();
    let sum_lng: f64 = points.iter().map(|p| p.longitude).sum();
    let n = points.len() as f64;

    GpsPoint::new(sum_lat / n, sum_lng / n)
}

// =============================================================================
// Simplification
// =============================================================================

/// Douglas-Peucker polyline simplification with a perpendicular-distance
/// tolerance in meters.
///
/// `points` are WGS84 lat/lon degrees. The polyline is linearized into a local
/// planar meter space (`lon * cos(mean_lat) * 111_000`, `lat * 111_000`) before
/// perpendicular distances are measured against it, so `epsilon_m` has a
/// consistent physical meaning regardless of latitude. Always keeps the first
/// and last points.
///
/// Implemented iteratively with an explicit stack rather than recursion, so
/// long input windows cannot overflow the call stack.
pub fn douglas_peucker(points: &[GpsPoint], epsilon_m: f64) -> Vec<GpsPoint> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let mean_lat = points.iter().map(|p| p.latitude).sum::<f64>() / points.len() as f64;
    let lon_scale = mean_lat.to_radians().cos().abs().max(1e-6) * 111_000.0;
    let lat_scale = 111_000.0;

    let planar: Vec<(f64, f64)> = points
        .iter()
        .map(|p| (p.longitude * lon_scale, p.latitude * lat_scale))
        .collect();

    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;

    // Stack of (start, end) index ranges still to be examined.
    let mut stack = vec![(0usize, points.len() - 1)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }

        let (sx, sy) = planar[start];
        let (ex, ey) = planar[end];
        let chord_len_sq = (ex - sx).powi(2) + (ey - sy).powi(2);

        let mut max_dist = -1.0f64;
        let mut max_idx = start;
        for (offset, &(px, py)) in planar[(start + 1)..end].iter().enumerate() {
            let i = start + 1 + offset;
            let dist = if chord_len_sq < 1e-9 {
                ((px - sx).powi(2) + (py - sy).powi(2)).sqrt()
            } else {
                let t = ((px - sx) * (ex - sx) + (py - sy) * (ey - sy)) / chord_len_sq;
                let t_clamped = t.clamp(0.0, 1.0);
                let proj_x = sx + t_clamped * (ex - sx);
                let proj_y = sy + t_clamped * (ey - sy);
                ((px - proj_x).powi(2) + (py - proj_y).powi(2)).sqrt()
            };
            if dist > max_dist {
                max_dist = dist;
                max_idx = i;
            }
        }

        if max_dist > epsilon_m {
            keep[max_idx] = true;
            stack.push((start, max_idx));
            stack.push((max_idx, end));
        }
    }

    points
        .iter()
        .zip(keep.iter())
        .filter_map(|(p, &k)| k.then_some(*p))
        .collect()
}

// =============================================================================
// Curve Similarity
// =============================================================================

/// Discrete Fréchet distance between two polylines, in meters.
///
/// Bottom-up dynamic program over an `n x m` matrix, flattened row-major into a
/// single `Vec<f64>`, following the classic Eiter/Mannila recurrence:
///
/// ```text
/// ca[i,j] = max( min(ca[i-1,j], ca[i-1,j-1], ca[i,j-1]), d(p[i], q[j]) )
/// ```
///
/// with base cases along row 0 and column 0. `d` is [`haversine_distance`], so
/// unlike a planar Fréchet implementation this is meaningful directly in meters.
/// Cost is `O(nm)` time and space. Returns `0.0` if either input is empty.
pub fn discrete_frechet(p: &[GpsPoint], q: &[GpsPoint]) -> f64 {
    let n = p.len();
    let m = q.len();
    if n == 0 || m == 0 {
        return 0.0;
    }

    let mut ca = vec![-1.0f64; n * m];
    for i in 0..n {
        for j in 0..m {
            let d = haversine_distance(&p[i], &q[j]);
            ca[i * m + j] = match (i, j) {
                (0, 0) => d,
                (_, 0) => ca[(i - 1) * m].max(d),
                (0, _) => ca[j - 1].max(d),
                (_, _) => ca[(i - 1) * m + j]
                    .min(ca[(i - 1) * m + j - 1])
                    .min(ca[i * m + j - 1])
                    .max(d),
            };
        }
    }

    ca[n * m - 1]
}

/// Boolean "is the discrete Fréchet distance within tolerance" check, with early exit.
///
/// Fills the same `ca` matrix as [`discrete_frechet`] row by row, but aborts as
/// soon as an entire row's minimum value already exceeds `tol_m`. Because `ca`
/// is non-decreasing along both dimensions, once that happens no cell in a
/// later row can come back under tolerance either, so the candidate can be
/// rejected without filling the rest of the matrix. Used by the discovery
/// engine's counting pass, where most candidate windows fail quickly and only
/// the boolean verdict is needed.
pub fn discrete_frechet_within(p: &[GpsPoint], q: &[GpsPoint], tol_m: f64) -> bool {
    let n = p.len();
    let m = q.len();
    if n == 0 || m == 0 {
        return true;
    }

    let mut ca = vec![-1.0f64; n * m];
    for i in 0..n {
        let mut row_min = f64::INFINITY;
        for j in 0..m {
            let d = haversine_distance(&p[i], &q[j]);
            let val = match (i, j) {
                (0, 0) => d,
                (_, 0) => ca[(i - 1) * m].max(d),
                (0, _) => ca[j - 1].max(d),
                (_, _) => ca[(i - 1) * m + j]
                    .min(ca[(i - 1) * m + j - 1])
                    .min(ca[i * m + j - 1])
                    .max(d),
            };
            ca[i * m + j] = val;
            row_min = row_min.min(val);
        }
        if row_min > tol_m {
            return false;
        }
    }

    ca[n * m - 1] <= tol_m
}

// =============================================================================
// Unit Tests
// =============================================================================
