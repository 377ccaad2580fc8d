//! Raster data structures

mod element;
mod geotransform;
mod grid;
mod stack;
mod typed;

pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use grid::Raster;
pub use stack::RasterStack;
pub use typed::{DataType, TypedRaster};
