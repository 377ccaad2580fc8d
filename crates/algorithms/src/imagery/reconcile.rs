//! Resolution reconciliation between Sentinel-2 bands
//!
//! Sentinel-2 delivers bands at 10, 20 and 60 m. Two subsets cut from the
//! same bbox at 10 m and 20 m differ by a factor of two, give or take one
//! row or column from window rounding. Coarser bands are upsampled by
//! nearest-neighbour duplication and the trailing row/column is dropped
//! where the two grids still disagree.

use ndarray::{s, Array2};
use s2batch_core::raster::Raster;
use s2batch_core::{Error, Result};
use tracing::debug;

/// Pixel-size ratios closer than this to 1 or 2 count as exact
const RATIO_TOLERANCE: f64 = 1e-6;

/// Duplicate every cell into a 2x2 block (rows, then columns)
pub fn upsample2(data: &Array2<f64>) -> Array2<f64> {
    let (rows, cols) = data.dim();
    Array2::from_shape_fn((rows * 2, cols * 2), |(r, c)| data[[r / 2, c / 2]])
}

fn trim(data: &Array2<f64>, rows: usize, cols: usize) -> Array2<f64> {
    data.slice(s![..rows, ..cols]).to_owned()
}

/// Common length of one axis, or an error when the two differ by more than one
fn common_len(finer: usize, doubled: usize) -> Result<usize> {
    if finer.abs_diff(doubled) > 1 {
        return Err(Error::Algorithm(format!(
            "cannot reconcile axis lengths {finer} and {doubled}: not a 2x resolution ratio"
        )));
    }
    Ok(finer.min(doubled))
}

/// Reconcile a finer raster with one at half its resolution.
///
/// Returns both grids at a common shape. The adjusted coarser raster takes
/// the finer raster's transform and CRS; the finer raster keeps its own.
pub fn reconcile(
    finer: &Raster<f64>,
    coarser: &Raster<f64>,
) -> Result<(Raster<f64>, Raster<f64>, (usize, usize))> {
    let doubled = upsample2(coarser.data());
    let (dr, dc) = doubled.dim();
    let (fr, fc) = finer.shape();

    let rows = common_len(fr, dr)?;
    let cols = common_len(fc, dc)?;

    let finer_adjusted = finer.with_data(trim(finer.data(), rows, cols));
    let coarser_adjusted = finer.with_data(trim(&doubled, rows, cols));
    Ok((finer_adjusted, coarser_adjusted, (rows, cols)))
}

/// Bring bands of 1x and 2x pixel size onto the grid of the finest band.
///
/// The finest band is chosen by pixel size. Coarser bands are upsampled;
/// every band is then trimmed to the smallest shape, which may differ from
/// any band's by at most one row and one column. All outputs carry the
/// finest band's transform and CRS.
pub fn align_bands(bands: &[&Raster<f64>]) -> Result<Vec<Raster<f64>>> {
    let finest = bands
        .iter()
        .min_by(|a, b| a.cell_size().total_cmp(&b.cell_size()))
        .ok_or_else(|| Error::Algorithm("no bands to align".into()))?;
    let finest_size = finest.cell_size();

    let mut grids = Vec::with_capacity(bands.len());
    for band in bands {
        let ratio = band.cell_size() / finest_size;
        if (ratio - 1.0).abs() < RATIO_TOLERANCE {
            grids.push(band.data().clone());
        } else if (ratio - 2.0).abs() < RATIO_TOLERANCE {
            grids.push(upsample2(band.data()));
        } else {
            return Err(Error::Algorithm(format!(
                "unsupported resolution ratio {ratio:.3} (cell sizes {} and {finest_size})",
                band.cell_size()
            )));
        }
    }

    let rows = grids.iter().map(|g| g.nrows()).min().unwrap_or(0);
    let cols = grids.iter().map(|g| g.ncols()).min().unwrap_or(0);
    for grid in &grids {
        let (r, c) = grid.dim();
        if r - rows > 1 || c - cols > 1 {
            return Err(Error::SizeMismatch {
                er: rows,
                ec: cols,
                ar: r,
                ac: c,
            });
        }
    }

    if grids.iter().any(|g| g.dim() != (rows, cols)) {
        debug!(rows, cols, "aligned bands to common shape");
    }

    Ok(grids
        .iter()
        .map(|g| finest.with_data(trim(g, rows, cols)))
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
