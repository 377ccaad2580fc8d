//! Multi-band raster stacks

use ndarray::{Array3, ArrayView2, Axis};

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster};

/// An N-band `f64` grid sharing one transform and CRS.
///
/// Data is laid out as (band, row, col).
#[derive(Debug, Clone, PartialEq)]
pub struct RasterStack {
    data: Array3<f64>,
    transform: GeoTransform,
    crs: Option<CRS>,
}

impl RasterStack {
    /// Stack equally shaped bands. Georeferencing comes from the first band.
    pub fn from_bands(bands: &[&Raster<f64>]) -> Result<Self> {
        let first = bands
            .first()
            .ok_or_else(|| Error::Other("cannot stack zero bands".into()))?;
        let (rows, cols) = first.shape();

        for band in &bands[1..] {
            if band.shape() != (rows, cols) {
                return Err(Error::SizeMismatch {
                    er: rows,
                    ec: cols,
                    ar: band.rows(),
                    ac: band.cols(),
                });
            }
        }

        let mut data = Array3::zeros((bands.len(), rows, cols));
        for (mut slot, band) in data.axis_iter_mut(Axis(0)).zip(bands) {
            slot.assign(band.data());
        }

        Ok(Self {
            data,
            transform: *first.transform(),
            crs: first.crs().cloned(),
        })
    }

    pub fn band_count(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// Dimensions of each band as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        let (_, rows, cols) = self.data.dim();
        (rows, cols)
    }

    pub fn band(&self, index: usize) -> Option<ArrayView2<'_, f64>> {
        (index < self.band_count()).then(|| self.data.index_axis(Axis(0), index))
    }

    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    /// Build a stack from raw (band, row, col) data
    pub fn from_array(data: Array3<f64>, transform: GeoTransform, crs: Option<CRS>) -> Self {
        Self { data, transform, crs }
    }
}
