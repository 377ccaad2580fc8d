//! Raster subset extraction.
//!
//! Cuts the part of a single-band raster covered by a WGS84 bounding box,
//! in the raster's own grid: no resampling, the native CRS and sample type
//! are kept and the transform is shifted to the window origin.

use std::path::Path;

use s2batch_core::io::write_geotiff;
use s2batch_core::TypedRaster;
use tracing::{debug, info};

use crate::error::{CloudError, Result};
use crate::reproject::transform_bounds;
use crate::source::RasterSource;
use crate::window::{window_for_bbox, BBox};

const WGS84: u32 = 4326;

/// Read the window of `locator` covering `bbox_wgs84` into memory.
pub fn extract_subset(
    source: &dyn RasterSource,
    locator: &str,
    bbox_wgs84: &BBox,
) -> Result<TypedRaster> {
    let mut dataset = source.open(locator)?;

    let crs = dataset.crs().cloned().ok_or(CloudError::MissingCrs)?;
    let epsg = crs.epsg().ok_or(CloudError::MissingCrs)?;
    let native_bbox = transform_bounds(bbox_wgs84, WGS84, epsg)?;
    debug!(locator, epsg, ?native_bbox, "reprojected bbox");

    let transform = *dataset.transform();
    let window = window_for_bbox(&native_bbox, &transform, dataset.width(), dataset.height())
        .ok_or(CloudError::EmptyWindow)?;

    let mut subset = dataset.read_window(&window)?;
    subset.set_transform(window.transform(&transform));
    subset.set_crs(Some(crs));
    Ok(subset)
}

/// Extract a subset and write it as a single-band GeoTIFF at `path`.
///
/// Missing parent directories are created.
pub fn save_subset(
    source: &dyn RasterSource,
    locator: &str,
    bbox_wgs84: &BBox,
    path: &Path,
) -> Result<TypedRaster> {
    let subset = extract_subset(source, locator, bbox_wgs84)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    write_geotiff(&subset, path)?;

    let (rows, cols) = subset.shape();
    info!(path = %path.display(), rows, cols, dtype = %subset.data_type(), "saved subset");
    Ok(subset)
}
