//! Bounding boxes and pixel windows.
//!
//! Maps a bounding box in a raster's own CRS to the block of pixels that
//! covers it.

use s2batch_core::raster::GeoTransform;

/// An axis-aligned bounding box `[min_x, min_y, max_x, max_y]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    pub fn from_array(coords: [f64; 4]) -> Self {
        Self::new(coords[0], coords[1], coords[2], coords[3])
    }
}

/// A rectangular block of pixels: offsets and lengths in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelWindow {
    pub col_off: usize,
    pub row_off: usize,
    pub width: usize,
    pub height: usize,
}

impl PixelWindow {
    pub fn new(col_off: usize, row_off: usize, width: usize, height: usize) -> Self {
        Self { col_off, row_off, width, height }
    }

    pub fn col_end(&self) -> usize {
        self.col_off + self.width
    }

    pub fn row_end(&self) -> usize {
        self.row_off + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Transform of this window within a raster georeferenced by `transform`
    pub fn transform(&self, transform: &GeoTransform) -> GeoTransform {
        transform.window(self.col_off, self.row_off)
    }
}

/// Pixel window of an `image_width` x `image_height` raster covering `bbox`.
///
/// Offsets are the floor of the fractional pixel position of the bbox's
/// upper-left corner and lengths are the rounded fractional extent; the
/// result is clipped to the image. Returns `None` when nothing remains.
pub fn window_for_bbox(
    bbox: &BBox,
    transform: &GeoTransform,
    image_width: usize,
    image_height: usize,
) -> Option<PixelWindow> {
    // For north-up images, max_y maps to the first row.
    let (col_a, row_a) = transform.geo_to_pixel(bbox.min_x, bbox.max_y);
    let (col_b, row_b) = transform.geo_to_pixel(bbox.max_x, bbox.min_y);
    if !(col_a.is_finite() && col_b.is_finite() && row_a.is_finite() && row_b.is_finite()) {
        return None;
    }

    let col_start = col_a.min(col_b).floor();
    let row_start = row_a.min(row_b).floor();
    let col_len = (col_a - col_b).abs().round();
    let row_len = (row_a - row_b).abs().round();

    let clip = |start: f64, len: f64, limit: usize| -> (usize, usize) {
        let lo = start.max(0.0).min(limit as f64) as usize;
        let hi = (start + len).max(0.0).min(limit as f64) as usize;
        (lo, hi)
    };

    let (min_col, max_col) = clip(col_start, col_len, image_width);
    let (min_row, max_row) = clip(row_start, row_len, image_height);

    let window = PixelWindow::new(min_col, min_row, max_col - min_col, max_row - min_row);
    (!window.is_empty()).then_some(window)
}
