//! Single-band rasters tagged with their sample type.
//!
//! Band subsets are written with the sample type of the source asset
//! (Sentinel-2 reflectances are `u16`, SCL is `u8`), so the pipeline
//! carries the type alongside the grid until it needs `f64` arithmetic.

use std::fmt;

use crate::crs::CRS;
use crate::raster::{GeoTransform, Raster};

/// GeoTIFF sample types understood by the reader and writer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    U8,
    U16,
    I16,
    U32,
    I32,
    F32,
    F64,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::U8 => "uint8",
            Self::U16 => "uint16",
            Self::I16 => "int16",
            Self::U32 => "uint32",
            Self::I32 => "int32",
            Self::F32 => "float32",
            Self::F64 => "float64",
        };
        f.write_str(name)
    }
}

/// A single-band raster whose cell type is known only at runtime
#[derive(Debug, Clone, PartialEq)]
pub enum TypedRaster {
    U8(Raster<u8>),
    U16(Raster<u16>),
    I16(Raster<i16>),
    U32(Raster<u32>),
    I32(Raster<i32>),
    F32(Raster<f32>),
    F64(Raster<f64>),
}

macro_rules! dispatch {
    ($value:expr, $raster:ident => $body:expr) => {
        match $value {
            TypedRaster::U8($raster) => $body,
            TypedRaster::U16($raster) => $body,
            TypedRaster::I16($raster) => $body,
            TypedRaster::U32($raster) => $body,
            TypedRaster::I32($raster) => $body,
            TypedRaster::F32($raster) => $body,
            TypedRaster::F64($raster) => $body,
        }
    };
}

impl TypedRaster {
    pub fn data_type(&self) -> DataType {
        match self {
            Self::U8(_) => DataType::U8,
            Self::U16(_) => DataType::U16,
            Self::I16(_) => DataType::I16,
            Self::U32(_) => DataType::U32,
            Self::I32(_) => DataType::I32,
            Self::F32(_) => DataType::F32,
            Self::F64(_) => DataType::F64,
        }
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        dispatch!(self, r => r.shape())
    }

    pub fn transform(&self) -> &GeoTransform {
        dispatch!(self, r => r.transform())
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        dispatch!(self, r => r.set_transform(transform))
    }

    pub fn crs(&self) -> Option<&CRS> {
        dispatch!(self, r => r.crs())
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        dispatch!(self, r => r.set_crs(crs))
    }

    /// Widen to `f64`, keeping transform and CRS
    pub fn to_f64(&self) -> Raster<f64> {
        dispatch!(self, r => r.to_f64())
    }
}

macro_rules! impl_from_raster {
    ($t:ty, $variant:ident) => {
        impl From<Raster<$t>> for TypedRaster {
            fn from(r: Raster<$t>) -> Self {
                TypedRaster::$variant(r)
            }
        }
    };
}

impl_from_raster!(u8, U8);
impl_from_raster!(u16, U16);
impl_from_raster!(i16, I16);
impl_from_raster!(u32, U32);
impl_from_raster!(i32, I32);
impl_from_raster!(f32, F32);
impl_from_raster!(f64, F64);
