//! Pure-Rust WGS84 → UTM bbox transformation (Snyder 1987, USGS formulas).
//!
//! Covers EPSG 326xx (UTM North) and 327xx (UTM South), the grids every
//! Sentinel-2 L2A asset is delivered in. No libproj dependency.

use crate::error::{CloudError, Result};
use crate::window::BBox;

// ── WGS84 ellipsoid constants ────────────────────────────────────────────

const A: f64 = 6_378_137.0; // semi-major axis (m)
const F: f64 = 1.0 / 298.257_223_563; // flattening
const E2: f64 = 2.0 * F - F * F; // eccentricity squared
const E_PRIME2: f64 = E2 / (1.0 - E2); // second eccentricity squared
const K0: f64 = 0.9996; // UTM scale factor
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

// ── Public API ───────────────────────────────────────────────────────────

/// Points sampled along each bbox edge before taking the envelope.
pub const DENSIFY_POINTS: usize = 21;

/// Transform a bounding box from `src_epsg` to `dst_epsg`.
///
/// The edges are densified so the envelope also covers the curvature the
/// UTM projection introduces between corners. Identical CRSs return the
/// bbox unchanged; only WGS84 to UTM North/South is supported otherwise.
pub fn transform_bounds(bbox: &BBox, src_epsg: u32, dst_epsg: u32) -> Result<BBox> {
    if src_epsg == dst_epsg {
        return Ok(*bbox);
    }
    if !is_wgs84(src_epsg) {
        return Err(CloudError::UnsupportedCrs(src_epsg));
    }
    let (zone, north) = parse_utm_epsg(dst_epsg).ok_or(CloudError::UnsupportedCrs(dst_epsg))?;

    let mut min_e = f64::INFINITY;
    let mut min_n = f64::INFINITY;
    let mut max_e = f64::NEG_INFINITY;
    let mut max_n = f64::NEG_INFINITY;

    for (lon, lat) in edge_points(bbox, DENSIFY_POINTS) {
        let (e, n) = wgs84_to_utm(lon, lat, zone, north);
        min_e = min_e.min(e);
        min_n = min_n.min(n);
        max_e = max_e.max(e);
        max_n = max_n.max(n);
    }

    Ok(BBox::new(min_e, min_n, max_e, max_n))
}

/// Points along the four edges of `bbox`, `per_edge` on each, corners included.
fn edge_points(bbox: &BBox, per_edge: usize) -> Vec<(f64, f64)> {
    let steps = per_edge.max(2) - 1;
    let lerp = |a: f64, b: f64, i: usize| a + (b - a) * i as f64 / steps as f64;

    let mut points = Vec::with_capacity(4 * (steps + 1));
    for i in 0..=steps {
        let x = lerp(bbox.min_x, bbox.max_x, i);
        let y = lerp(bbox.min_y, bbox.max_y, i);
        points.push((x, bbox.min_y));
        points.push((x, bbox.max_y));
        points.push((bbox.min_x, y));
        points.push((bbox.max_x, y));
    }
    points
}

/// Check if an EPSG code represents WGS84 geographic.
pub fn is_wgs84(epsg: u32) -> bool {
    epsg == 4326
}

/// Parse an EPSG code into UTM zone info: `Some((zone, is_north))`.
///
/// - EPSG 326xx → zone xx, North hemisphere
/// - EPSG 327xx → zone xx, South hemisphere
pub fn parse_utm_epsg(epsg: u32) -> Option<(u32, bool)> {
    if (32601..=32660).contains(&epsg) {
        Some((epsg - 32600, true))
    } else if (32701..=32760).contains(&epsg) {
        Some((epsg - 32700, false))
    } else {
        None
    }
}

// ── Core projection (Snyder 1987, USGS Prof. Paper 1395, pp. 61-64) ─────

/// Convert WGS84 (longitude, latitude) in degrees to UTM (easting, northing)
/// in metres for the given zone and hemisphere.
fn wgs84_to_utm(lon_deg: f64, lat_deg: f64, zone: u32, north: bool) -> (f64, f64) {
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();

    // Central meridian of the zone
    let lon0 = ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians();

    let sin_lat = lat.sin();
    let cos_lat = lat.cos();
    let tan_lat = lat.tan();

    let n = A / (1.0 - E2 * sin_lat * sin_lat).sqrt();
    let t = tan_lat * tan_lat;
    let c = E_PRIME2 * cos_lat * cos_lat;
    let a_coeff = cos_lat * (lon - lon0);

    // Meridional arc length M (Snyder eq. 3-21)
    let m = meridional_arc(lat);

    let a2 = a_coeff * a_coeff;
    let a4 = a2 * a2;
    let a6 = a4 * a2;

    // Easting (Snyder eq. 8-9)
    let easting = K0 * n
        * (a_coeff
            + (1.0 - t + c) * a2 * a_coeff / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * E_PRIME2)
                * a4
                * a_coeff
                / 120.0)
        + FALSE_EASTING;

    // Northing (Snyder eq. 8-10)
    let northing = K0
        * (m
            + n
                * tan_lat
                * (a2 / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * E_PRIME2) * a6 / 720.0));

    let northing = if north {
        northing
    } else {
        northing + FALSE_NORTHING_SOUTH
    };

    (easting, northing)
}

/// Meridional arc from equator to latitude `lat` (radians).
/// Snyder eq. 3-21.
fn meridional_arc(lat: f64) -> f64 {
    let e2 = E2;
    let e4 = e2 * e2;
    let e6 = e4 * e2;

    A * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
        - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
        + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
        - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}

// ── Tests ────────────────────────────────────────────────────────────────
