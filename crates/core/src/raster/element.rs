//! Raster element trait for generic cell values

use num_traits::{NumCast, Zero};
use std::fmt::Debug;

use super::DataType;

/// Trait for types that can be stored in a raster cell.
///
/// Every implementor maps to exactly one GeoTIFF sample type, so a
/// `Raster<T>` can be written back with the type it was read with.
pub trait RasterElement:
    Copy + Clone + Debug + PartialOrd + PartialEq + NumCast + Zero + Send + Sync + 'static
{
    /// Sample type tag used when the value is stored in a GeoTIFF
    const DATA_TYPE: DataType;

    /// Whether this type is a floating point type
    fn is_float() -> bool;

    /// Widen to f64. Every supported sample type fits.
    fn to_f64(self) -> f64 {
        NumCast::from(self).unwrap_or(f64::NAN)
    }
}

macro_rules! impl_raster_element {
    ($t:ty, $dt:expr, $float:expr) => {
        impl RasterElement for $t {
            const DATA_TYPE: DataType = $dt;

            fn is_float() -> bool {
                $float
            }
        }
    };
}

impl_raster_element!(u8, DataType::U8, false);
impl_raster_element!(u16, DataType::U16, false);
impl_raster_element!(i16, DataType::I16, false);
impl_raster_element!(u32, DataType::U32, false);
impl_raster_element!(i32, DataType::I32, false);
impl_raster_element!(f32, DataType::F32, true);
impl_raster_element!(f64, DataType::F64, true);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening_is_exact_for_sensor_values() {
        assert_eq!(10_000u16.to_f64(), 10_000.0);
        assert_eq!((-32_768i16).to_f64(), -32_768.0);
        assert_eq!(u16::DATA_TYPE, DataType::U16);
        assert!(f32::is_float());
        assert!(!u8::is_float());
    }
}
