//! GeoTIFF georeferencing tags.
//!
//! Reads tags 33550 (ModelPixelScale), 33922 (ModelTiepoint),
//! 34264 (ModelTransformation), 34735 (GeoKeyDirectory) and
//! 34737 (GeoAsciiParams) into a `GeoTransform` and optional `CRS`, and
//! writes the same tags for rasters produced by s2batch.

use std::io::{Read, Seek, Write};

use tiff::decoder::Decoder;
use tiff::encoder::{DirectoryEncoder, TiffKind};
use tiff::tags::Tag;

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::GeoTransform;

pub const MODEL_PIXEL_SCALE: u16 = 33550;
pub const MODEL_TIEPOINT: u16 = 33922;
pub const MODEL_TRANSFORMATION: u16 = 34264;
pub const GEO_KEY_DIRECTORY: u16 = 34735;
pub const GEO_ASCII_PARAMS: u16 = 34737;

const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;

const MODEL_TYPE_PROJECTED: u16 = 1;
const MODEL_TYPE_GEOGRAPHIC: u16 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;
const USER_DEFINED: u16 = 32767;

/// Georeferencing read from a GeoTIFF directory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeoTiffMeta {
    pub transform: Option<GeoTransform>,
    pub crs: Option<CRS>,
}

/// Named tags and `Tag::Unknown` hash differently, so lookups must go
/// through the exhaustive constructor.
fn tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

/// Read georeferencing from the decoder's current image directory.
pub fn read_geo_meta<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<GeoTiffMeta> {
    let transform = read_transform(decoder)?;
    let crs = read_crs(decoder)?;
    Ok(GeoTiffMeta { transform, crs })
}

fn read_f64_tag<R: Read + Seek>(decoder: &mut Decoder<R>, code: u16) -> Result<Option<Vec<f64>>> {
    if decoder.find_tag(tag(code))?.is_none() {
        return Ok(None);
    }
    Ok(Some(decoder.get_tag_f64_vec(tag(code))?))
}

fn read_transform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<GeoTransform>> {
    let scale = read_f64_tag(decoder, MODEL_PIXEL_SCALE)?;
    let tiepoint = read_f64_tag(decoder, MODEL_TIEPOINT)?;

    if let (Some(scale), Some(tiepoint)) = (&scale, &tiepoint) {
        if scale.len() >= 2 && tiepoint.len() >= 6 {
            // tiepoint: [I, J, K, X, Y, Z]
            let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
            let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
            return Ok(Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1])));
        }
    }

    // 4x4 row-major matrix
    if let Some(t) = read_f64_tag(decoder, MODEL_TRANSFORMATION)? {
        if t.len() >= 16 {
            return Ok(Some(GeoTransform {
                origin_x: t[3],
                origin_y: t[7],
                pixel_width: t[0],
                pixel_height: t[5],
                row_rotation: t[1],
                col_rotation: t[4],
            }));
        }
    }

    Ok(None)
}

fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Result<Option<CRS>> {
    if decoder.find_tag(tag(GEO_KEY_DIRECTORY))?.is_none() {
        return Ok(None);
    }
    let keys = decoder.get_tag_u16_vec(tag(GEO_KEY_DIRECTORY))?;
    if let Some(code) = epsg_from_geokeys(&keys) {
        return Ok(Some(CRS::from_epsg(code)));
    }

    if decoder.find_tag(tag(GEO_ASCII_PARAMS))?.is_some() {
        let citation = decoder.get_tag_ascii_string(tag(GEO_ASCII_PARAMS))?;
        let citation = citation.trim_end_matches(['|', '\0']).trim();
        if !citation.is_empty() {
            return Ok(Some(CRS::from_citation(citation)));
        }
    }

    Ok(None)
}

/// Find ProjectedCSTypeGeoKey (3072) or GeographicTypeGeoKey (2048) in a
/// GeoKeyDirectory: `[version, revision, minor, count, (id, location, count, value)*]`.
pub fn epsg_from_geokeys(keys: &[u16]) -> Option<u32> {
    if keys.len() < 4 {
        return None;
    }
    let num_keys = keys[3] as usize;

    let mut geographic = None;
    for entry in keys[4..].chunks_exact(4).take(num_keys) {
        let (key_id, location, value) = (entry[0], entry[1], entry[3]);
        // Values stored in other tags are never plain EPSG codes
        if location != 0 || value == 0 || value == USER_DEFINED {
            continue;
        }
        match key_id {
            PROJECTED_CS_TYPE_GEO_KEY => return Some(value as u32),
            GEOGRAPHIC_TYPE_GEO_KEY => geographic = Some(value as u32),
            _ => {}
        }
    }
    geographic
}

/// Build the GeoKeyDirectory for an optional CRS
pub fn build_geokey_directory(crs: Option<&CRS>) -> Vec<u16> {
    let code = crs.and_then(CRS::epsg).and_then(|c| u16::try_from(c).ok());
    let geographic = crs.map(CRS::is_geographic).unwrap_or(false);

    let mut keys = vec![1, 1, 0, 0];
    let model = if geographic {
        MODEL_TYPE_GEOGRAPHIC
    } else {
        MODEL_TYPE_PROJECTED
    };
    keys.extend_from_slice(&[GT_MODEL_TYPE_GEO_KEY, 0, 1, model]);
    keys.extend_from_slice(&[GT_RASTER_TYPE_GEO_KEY, 0, 1, RASTER_PIXEL_IS_AREA]);

    if let Some(code) = code {
        let key = if geographic {
            GEOGRAPHIC_TYPE_GEO_KEY
        } else {
            PROJECTED_CS_TYPE_GEO_KEY
        };
        keys.extend_from_slice(&[key, 0, 1, code]);
    }

    keys[3] = ((keys.len() - 4) / 4) as u16;
    keys
}

/// Write pixel scale, tiepoint and GeoKeyDirectory tags into an image directory
pub fn write_geo_tags<W: Write + Seek, K: TiffKind>(
    dir: &mut DirectoryEncoder<'_, W, K>,
    transform: &GeoTransform,
    crs: Option<&CRS>,
) -> Result<()> {
    if transform.row_rotation != 0.0 || transform.col_rotation != 0.0 {
        return Err(Error::InvalidGeoTiff(
            "rotated transforms cannot be written as scale + tiepoint".into(),
        ));
    }

    let scale = [transform.pixel_width, transform.pixel_height.abs(), 0.0];
    dir.write_tag(Tag::Unknown(MODEL_PIXEL_SCALE), scale.as_slice())?;

    let tiepoint = [0.0, 0.0, 0.0, transform.origin_x, transform.origin_y, 0.0];
    dir.write_tag(Tag::Unknown(MODEL_TIEPOINT), tiepoint.as_slice())?;

    let geokeys = build_geokey_directory(crs);
    dir.write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), geokeys.as_slice())?;

    if let Some(citation) = crs.and_then(CRS::citation) {
        let ascii = format!("{citation}|");
        dir.write_tag(Tag::Unknown(GEO_ASCII_PARAMS), ascii.as_str())?;
    }

    Ok(())
}
