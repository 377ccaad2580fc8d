//! Scene screening with the Sentinel-2 scene classification layer (SCL)

use s2batch_core::raster::{Raster, RasterElement};

/// SCL classes that hide the surface:
/// 0 no data, 1 saturated or defective, 2 topographic shadow,
/// 3 cloud shadow, 8 cloud medium probability, 9 cloud high probability,
/// 10 thin cirrus.
pub const OBSTRUCTION_CLASSES: [u8; 7] = [0, 1, 2, 3, 8, 9, 10];

/// Fraction of cells whose class is in `classes`, in `[0, 1]`.
///
/// An empty grid has nothing obstructed and returns 0.
pub fn cloud_fraction<T: RasterElement>(scl: &Raster<T>, classes: &[u8]) -> f64 {
    if scl.is_empty() {
        return 0.0;
    }
    let obstructed = scl
        .data()
        .iter()
        .filter(|&&v| classes.iter().any(|&c| RasterElement::to_f64(v) == f64::from(c)))
        .count();
    obstructed as f64 / scl.len() as f64
}

/// Whether a scene should be skipped: strictly more than `max_cloud_cover`
/// percent of it is obstructed.
pub fn exceeds_cloud_cover(fraction: f64, max_cloud_cover: f64) -> bool {
    fraction > max_cloud_cover / 100.0
}
