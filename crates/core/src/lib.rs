//! # s2batch core
//!
//! Raster types and GeoTIFF I/O shared by the s2batch crates.
//!
//! This crate provides:
//! - `Raster<T>`: single-band georeferenced grid
//! - `TypedRaster`: a single band tagged with its on-disk sample type
//! - `RasterStack`: an N-band `f64` grid used for composites
//! - `GeoTransform` and `CRS` for georeferencing
//! - GeoTIFF reading and writing without GDAL

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{DataType, GeoTransform, Raster, RasterElement, RasterStack, TypedRaster};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster, RasterElement, RasterStack, TypedRaster};
}
