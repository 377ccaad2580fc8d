//! Raster access seam.
//!
//! The pipeline never talks to files or URLs directly: it asks a
//! [`RasterSource`] to open a locator and reads pixel windows from the
//! returned [`RasterDataset`]. [`crate::cog::CogSource`] is the shipped
//! implementation; tests plug in in-memory sources.

use s2batch_core::{GeoTransform, TypedRaster, CRS};

use crate::error::Result;
use crate::window::PixelWindow;

/// Opens raster datasets by locator (URL or path).
pub trait RasterSource: Send + Sync {
    fn open(&self, locator: &str) -> Result<Box<dyn RasterDataset>>;
}

/// An opened single-band raster.
pub trait RasterDataset {
    /// Native coordinate reference, if the file declares one.
    fn crs(&self) -> Option<&CRS>;

    /// Affine transform of the full image.
    fn transform(&self) -> &GeoTransform;

    fn width(&self) -> usize;

    fn height(&self) -> usize;

    /// Read `window` of band 1 with the dataset's sample type.
    ///
    /// The returned raster carries pixel data only; callers attach the
    /// window transform and CRS.
    fn read_window(&mut self, window: &PixelWindow) -> Result<TypedRaster>;
}

impl<S: RasterSource + ?Sized> RasterSource for std::sync::Arc<S> {
    fn open(&self, locator: &str) -> Result<Box<dyn RasterDataset>> {
        (**self).open(locator)
    }
}
