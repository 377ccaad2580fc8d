//! I/O operations for reading and writing GeoTIFF rasters

pub mod geokeys;
mod native;

pub use geokeys::{read_geo_meta, GeoTiffMeta};
pub use native::{
    decoded_data_type, inspect_geotiff, read_geotiff, read_geotiff_from_buffer,
    read_geotiff_stack, samples_per_pixel, typed_from_decoded, write_geotiff,
    write_geotiff_stack, write_geotiff_to_buffer, GeoTiffInfo,
};
