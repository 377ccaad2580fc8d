//! Native GeoTIFF reading/writing (without GDAL)
//!
//! Single-band rasters keep their sample type on disk. Multi-band stacks
//! are written as pixel-interleaved 64-bit float.

use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;

use ndarray::Array3;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{
    ColorType, Gray16, Gray32, Gray32Float, Gray64Float, Gray8, GrayI16, GrayI32,
};
use tiff::encoder::{TiffEncoder, TiffValue};
use tiff::tags::Tag;
use tiff::ColorType as SampleLayout;

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::io::geokeys::{read_geo_meta, write_geo_tags, GeoTiffMeta};
use crate::raster::{DataType, GeoTransform, Raster, RasterElement, RasterStack, TypedRaster};

/// Summary of a GeoTIFF's first image directory
#[derive(Debug, Clone)]
pub struct GeoTiffInfo {
    pub width: usize,
    pub height: usize,
    pub bands: usize,
    pub data_type: DataType,
    pub transform: Option<GeoTransform>,
    pub crs: Option<CRS>,
}

/// Number of samples per pixel for a decoded colour layout
pub fn samples_per_pixel(layout: SampleLayout) -> Result<usize> {
    match layout {
        SampleLayout::Gray(_) => Ok(1),
        SampleLayout::GrayA(_) => Ok(2),
        SampleLayout::RGB(_) => Ok(3),
        SampleLayout::RGBA(_) => Ok(4),
        SampleLayout::Multiband { num_samples, .. } => Ok(num_samples as usize),
        other => Err(Error::UnsupportedDataType(format!("{:?}", other))),
    }
}

/// Sample type of a decoded buffer
pub fn decoded_data_type(result: &DecodingResult) -> Result<DataType> {
    match result {
        DecodingResult::U8(_) => Ok(DataType::U8),
        DecodingResult::U16(_) => Ok(DataType::U16),
        DecodingResult::I16(_) => Ok(DataType::I16),
        DecodingResult::U32(_) => Ok(DataType::U32),
        DecodingResult::I32(_) => Ok(DataType::I32),
        DecodingResult::F32(_) => Ok(DataType::F32),
        DecodingResult::F64(_) => Ok(DataType::F64),
        _ => Err(unsupported_samples()),
    }
}

fn unsupported_samples() -> Error {
    Error::UnsupportedDataType(
        "only 8/16/32-bit integer and 32/64-bit float samples are supported".into(),
    )
}

/// Wrap a decoded single-sample buffer as a `TypedRaster`
pub fn typed_from_decoded(result: DecodingResult, rows: usize, cols: usize) -> Result<TypedRaster> {
    let typed = match result {
        DecodingResult::U8(buf) => Raster::from_vec(buf, rows, cols)?.into(),
        DecodingResult::U16(buf) => Raster::from_vec(buf, rows, cols)?.into(),
        DecodingResult::I16(buf) => Raster::from_vec(buf, rows, cols)?.into(),
        DecodingResult::U32(buf) => Raster::from_vec(buf, rows, cols)?.into(),
        DecodingResult::I32(buf) => Raster::from_vec(buf, rows, cols)?.into(),
        DecodingResult::F32(buf) => Raster::from_vec(buf, rows, cols)?.into(),
        DecodingResult::F64(buf) => Raster::from_vec(buf, rows, cols)?.into(),
        _ => return Err(unsupported_samples()),
    };
    Ok(typed)
}

fn decoded_to_f64(result: DecodingResult) -> Result<Vec<f64>> {
    fn widen<T: RasterElement>(buf: Vec<T>) -> Vec<f64> {
        buf.into_iter().map(RasterElement::to_f64).collect()
    }
    match result {
        DecodingResult::U8(buf) => Ok(widen(buf)),
        DecodingResult::U16(buf) => Ok(widen(buf)),
        DecodingResult::I16(buf) => Ok(widen(buf)),
        DecodingResult::U32(buf) => Ok(widen(buf)),
        DecodingResult::I32(buf) => Ok(widen(buf)),
        DecodingResult::F32(buf) => Ok(widen(buf)),
        DecodingResult::F64(buf) => Ok(buf),
        _ => Err(unsupported_samples()),
    }
}

fn apply_meta(raster: &mut TypedRaster, meta: GeoTiffMeta) {
    if let Some(transform) = meta.transform {
        raster.set_transform(transform);
    }
    raster.set_crs(meta.crs);
}

/// Read band 1 of a single-band GeoTIFF, keeping its sample type
pub fn read_geotiff<P: AsRef<Path>>(path: P) -> Result<TypedRaster> {
    let file = File::open(path.as_ref())?;
    decode_band(file)
}

/// Read band 1 of a single-band GeoTIFF held in memory
pub fn read_geotiff_from_buffer(data: &[u8]) -> Result<TypedRaster> {
    decode_band(Cursor::new(data))
}

fn decode_band<R: Read + Seek>(reader: R) -> Result<TypedRaster> {
    let mut decoder = Decoder::new(reader)?;
    let (width, height) = decoder.dimensions()?;

    let samples = samples_per_pixel(decoder.colortype()?)?;
    if samples != 1 {
        return Err(Error::UnsupportedDataType(format!(
            "expected a single-band GeoTIFF, found {} samples per pixel",
            samples
        )));
    }

    let meta = read_geo_meta(&mut decoder)?;
    let result = decoder.read_image()?;
    let mut raster = typed_from_decoded(result, height as usize, width as usize)?;
    apply_meta(&mut raster, meta);
    Ok(raster)
}

/// Read every band of a GeoTIFF as `f64`
pub fn read_geotiff_stack<P: AsRef<Path>>(path: P) -> Result<RasterStack> {
    let mut decoder = Decoder::new(File::open(path.as_ref())?)?;
    let (width, height) = decoder.dimensions()?;
    let (rows, cols) = (height as usize, width as usize);
    let bands = samples_per_pixel(decoder.colortype()?)?;

    let meta = read_geo_meta(&mut decoder)?;
    let interleaved = decoded_to_f64(decoder.read_image()?)?;
    if interleaved.len() != rows * cols * bands {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let data = Array3::from_shape_fn((bands, rows, cols), |(b, r, c)| {
        interleaved[(r * cols + c) * bands + b]
    });

    Ok(RasterStack::from_array(
        data,
        meta.transform.unwrap_or_default(),
        meta.crs,
    ))
}

/// Describe a GeoTIFF without decoding more than its first chunk
pub fn inspect_geotiff<P: AsRef<Path>>(path: P) -> Result<GeoTiffInfo> {
    let mut decoder = Decoder::new(File::open(path.as_ref())?)?;
    let (width, height) = decoder.dimensions()?;
    let bands = samples_per_pixel(decoder.colortype()?)?;
    let meta = read_geo_meta(&mut decoder)?;
    let data_type = decoded_data_type(&decoder.read_chunk(0)?)?;

    Ok(GeoTiffInfo {
        width: width as usize,
        height: height as usize,
        bands,
        data_type,
        transform: meta.transform,
        crs: meta.crs,
    })
}

/// Write a single-band raster with its own sample type
pub fn write_geotiff<P: AsRef<Path>>(raster: &TypedRaster, path: P) -> Result<()> {
    let file = BufWriter::new(File::create(path.as_ref())?);
    encode_typed(raster, file)
}

/// Write a single-band raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer(raster: &TypedRaster) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_typed(raster, Cursor::new(&mut buf))?;
    Ok(buf)
}

fn encode_typed<W: Write + Seek>(raster: &TypedRaster, writer: W) -> Result<()> {
    let mut encoder = TiffEncoder::new(writer)?;
    match raster {
        TypedRaster::U8(r) => encode_band::<Gray8, _, _>(&mut encoder, r),
        TypedRaster::U16(r) => encode_band::<Gray16, _, _>(&mut encoder, r),
        TypedRaster::I16(r) => encode_band::<GrayI16, _, _>(&mut encoder, r),
        TypedRaster::U32(r) => encode_band::<Gray32, _, _>(&mut encoder, r),
        TypedRaster::I32(r) => encode_band::<GrayI32, _, _>(&mut encoder, r),
        TypedRaster::F32(r) => encode_band::<Gray32Float, _, _>(&mut encoder, r),
        TypedRaster::F64(r) => encode_band::<Gray64Float, _, _>(&mut encoder, r),
    }
}

fn encode_band<C, T, W>(encoder: &mut TiffEncoder<W>, raster: &Raster<T>) -> Result<()>
where
    C: ColorType<Inner = T>,
    T: RasterElement,
    [T]: TiffValue,
    W: Write + Seek,
{
    let (rows, cols) = raster.shape();
    if rows == 0 || cols == 0 {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let data: Vec<T> = raster.data().iter().copied().collect();
    let mut image = encoder.new_image::<C>(cols as u32, rows as u32)?;
    write_geo_tags(image.encoder(), raster.transform(), raster.crs())?;
    image.write_data(&data)?;
    Ok(())
}

/// Write an N-band stack as pixel-interleaved 64-bit float
pub fn write_geotiff_stack<P: AsRef<Path>>(stack: &RasterStack, path: P) -> Result<()> {
    let file = BufWriter::new(File::create(path.as_ref())?);
    encode_stack(stack, file)
}

fn encode_stack<W: Write + Seek>(stack: &RasterStack, writer: W) -> Result<()> {
    let bands = stack.band_count();
    let (rows, cols) = stack.shape();
    if bands == 0 || rows == 0 || cols == 0 {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut encoder = TiffEncoder::new(writer)?;
    let mut dir = encoder.image_directory()?;

    dir.write_tag(Tag::ImageWidth, cols as u32)?;
    dir.write_tag(Tag::ImageLength, rows as u32)?;
    dir.write_tag(Tag::BitsPerSample, vec![64u16; bands].as_slice())?;
    dir.write_tag(Tag::Compression, 1u16)?;
    // BlackIsZero
    dir.write_tag(Tag::PhotometricInterpretation, 1u16)?;
    dir.write_tag(Tag::SamplesPerPixel, bands as u16)?;
    // IEEE floating point
    dir.write_tag(Tag::SampleFormat, vec![3u16; bands].as_slice())?;
    dir.write_tag(Tag::PlanarConfiguration, 1u16)?;
    dir.write_tag(Tag::RowsPerStrip, rows as u32)?;
    if bands > 1 {
        dir.write_tag(Tag::ExtraSamples, vec![0u16; bands - 1].as_slice())?;
    }

    write_geo_tags(&mut dir, stack.transform(), stack.crs())?;

    let data = stack.data();
    let mut interleaved = Vec::with_capacity(bands * rows * cols);
    for r in 0..rows {
        for c in 0..cols {
            interleaved.extend((0..bands).map(|b| data[[b, r, c]]));
        }
    }

    let offset = dir.write_data(interleaved.as_slice())?;
    let offset = u32::try_from(offset)
        .map_err(|_| Error::Other("stack exceeds the 4 GiB classic TIFF limit".into()))?;
    dir.write_tag(Tag::StripOffsets, offset)?;
    dir.write_tag(Tag::StripByteCounts, (interleaved.len() * 8) as u32)?;
    dir.finish()?;

    Ok(())
}
