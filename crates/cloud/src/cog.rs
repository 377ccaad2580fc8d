//! GeoTIFF / COG datasets backed by the `tiff` decoder.
//!
//! Locators starting with `http://` or `https://` are read through
//! [`RemoteFile`] (HTTP Range requests); anything else is a local path.
//! Only the strips or tiles overlapping a requested window are decoded.

use std::fs::File;
use std::io::{BufReader, Read, Seek};

use s2batch_core::io::{decoded_data_type, read_geo_meta, samples_per_pixel};
use s2batch_core::{DataType, GeoTransform, Raster, TypedRaster, CRS};
use tiff::decoder::{Decoder, DecodingResult};
use tracing::debug;

use crate::error::{CloudError, Result};
use crate::remote::{RemoteFile, RemoteFileOptions};
use crate::source::{RasterDataset, RasterSource};
use crate::window::PixelWindow;

/// Byte stream a dataset can decode from.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// [`RasterSource`] for local GeoTIFFs and remote COGs.
#[derive(Debug, Clone, Default)]
pub struct CogSource {
    options: RemoteFileOptions,
}

impl CogSource {
    pub fn new(options: RemoteFileOptions) -> Self {
        Self { options }
    }
}

fn is_remote(locator: &str) -> bool {
    locator.starts_with("http://") || locator.starts_with("https://")
}

fn unavailable(locator: &str, reason: impl ToString) -> CloudError {
    CloudError::SourceUnavailable {
        locator: locator.to_string(),
        reason: reason.to_string(),
    }
}

impl RasterSource for CogSource {
    fn open(&self, locator: &str) -> Result<Box<dyn RasterDataset>> {
        let reader: Box<dyn ReadSeek> = if is_remote(locator) {
            let remote = RemoteFile::open(locator, self.options.clone())
                .map_err(|e| unavailable(locator, e))?;
            Box::new(remote)
        } else {
            let file = File::open(locator).map_err(|e| unavailable(locator, e))?;
            Box::new(BufReader::new(file))
        };

        let dataset = CogDataset::from_reader(locator, reader)?;
        Ok(Box::new(dataset))
    }
}

/// One opened single-band GeoTIFF.
pub struct CogDataset {
    locator: String,
    decoder: Decoder<Box<dyn ReadSeek>>,
    width: usize,
    height: usize,
    transform: GeoTransform,
    crs: Option<CRS>,
}

impl std::fmt::Debug for CogDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CogDataset")
            .field("locator", &self.locator)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("crs", &self.crs)
            .finish()
    }
}

impl CogDataset {
    /// Parse the first image directory of `reader`.
    pub fn from_reader(locator: &str, reader: Box<dyn ReadSeek>) -> Result<Self> {
        let mut decoder = Decoder::new(reader).map_err(|e| read_error(locator, e))?;
        let (width, height) = decoder.dimensions().map_err(|e| read_error(locator, e))?;

        let samples = samples_per_pixel(decoder.colortype()?)?;
        if samples != 1 {
            return Err(CloudError::InvalidTiff {
                reason: format!("{locator}: expected 1 sample per pixel, found {samples}"),
            });
        }

        let meta = read_geo_meta(&mut decoder)?;
        let transform = meta.transform.ok_or_else(|| CloudError::InvalidTiff {
            reason: format!("{locator}: no georeferencing tags"),
        })?;

        debug!(locator, width, height, crs = ?meta.crs, "opened dataset");

        Ok(Self {
            locator: locator.to_string(),
            decoder,
            width: width as usize,
            height: height as usize,
            transform,
            crs: meta.crs,
        })
    }

    pub fn locator(&self) -> &str {
        &self.locator
    }
}

/// I/O failures while decoding mean the source went away; anything else
/// is a malformed file.
fn read_error(locator: &str, err: tiff::TiffError) -> CloudError {
    match err {
        tiff::TiffError::IoError(io) => unavailable(locator, io),
        other => CloudError::from(other),
    }
}

/// A decoded strip or tile and where it sits in the full image.
struct Chunk {
    col: usize,
    row: usize,
    width: usize,
    height: usize,
    data: DecodingResult,
}

impl RasterDataset for CogDataset {
    fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn read_window(&mut self, window: &PixelWindow) -> Result<TypedRaster> {
        if window.is_empty() {
            return Err(CloudError::EmptyWindow);
        }
        if window.col_end() > self.width || window.row_end() > self.height {
            return Err(s2batch_core::Error::IndexOutOfBounds {
                row: window.row_end(),
                col: window.col_end(),
                rows: self.height,
                cols: self.width,
            }
            .into());
        }

        let (chunk_w, chunk_h) = self.decoder.chunk_dimensions();
        let (chunk_w, chunk_h) = (chunk_w.max(1) as usize, chunk_h.max(1) as usize);
        let across = self.width.div_ceil(chunk_w);

        let mut chunks = Vec::new();
        for chunk_row in window.row_off / chunk_h..=(window.row_end() - 1) / chunk_h {
            for chunk_col in window.col_off / chunk_w..=(window.col_end() - 1) / chunk_w {
                let index = (chunk_row * across + chunk_col) as u32;
                let (data_w, data_h) = self.decoder.chunk_data_dimensions(index);
                let data = self
                    .decoder
                    .read_chunk(index)
                    .map_err(|e| read_error(&self.locator, e))?;
                chunks.push(Chunk {
                    col: chunk_col * chunk_w,
                    row: chunk_row * chunk_h,
                    width: data_w as usize,
                    height: data_h as usize,
                    data,
                });
            }
        }

        debug!(
            locator = %self.locator,
            chunks = chunks.len(),
            col_off = window.col_off,
            row_off = window.row_off,
            width = window.width,
            height = window.height,
            "read window"
        );
        assemble(chunks, window)
    }
}

/// Copy the part of `src` that falls inside `window` into `out`.
///
/// A chunk that decodes to fewer samples than its dimensions claim is an
/// error rather than a gap in the output.
fn blit<T: Copy>(out: &mut [T], window: &PixelWindow, chunk: &Chunk, src: &[T]) -> Result<()> {
    let row_start = chunk.row.max(window.row_off);
    let row_end = (chunk.row + chunk.height).min(window.row_end());
    let col_start = chunk.col.max(window.col_off);
    let col_end = (chunk.col + chunk.width).min(window.col_end());
    if col_start >= col_end {
        return Ok(());
    }
    let span = col_end - col_start;

    for row in row_start..row_end {
        let src_off = (row - chunk.row) * chunk.width + (col_start - chunk.col);
        let dst_off = (row - window.row_off) * window.width + (col_start - window.col_off);
        if src_off + span > src.len() {
            return Err(CloudError::InvalidTiff {
                reason: format!(
                    "chunk at ({}, {}) decoded {} samples, expected {}x{}",
                    chunk.col,
                    chunk.row,
                    src.len(),
                    chunk.width,
                    chunk.height
                ),
            });
        }
        out[dst_off..dst_off + span].copy_from_slice(&src[src_off..src_off + span]);
    }
    Ok(())
}

macro_rules! assemble_as {
    ($variant:ident, $ty:ty, $chunks:expr, $window:expr) => {{
        let mut out: Vec<$ty> = vec![<$ty>::default(); $window.width * $window.height];
        for chunk in &$chunks {
            match &chunk.data {
                DecodingResult::$variant(buf) => blit(&mut out, $window, chunk, buf)?,
                _ => {
                    return Err(CloudError::InvalidTiff {
                        reason: "chunks decoded with differing sample types".into(),
                    })
                }
            }
        }
        TypedRaster::from(Raster::from_vec(out, $window.height, $window.width)?)
    }};
}

fn assemble(chunks: Vec<Chunk>, window: &PixelWindow) -> Result<TypedRaster> {
    let first = chunks.first().ok_or(CloudError::EmptyWindow)?;
    let raster = match decoded_data_type(&first.data)? {
        DataType::U8 => assemble_as!(U8, u8, chunks, window),
        DataType::U16 => assemble_as!(U16, u16, chunks, window),
        DataType::I16 => assemble_as!(I16, i16, chunks, window),
        DataType::U32 => assemble_as!(U32, u32, chunks, window),
        DataType::I32 => assemble_as!(I32, i32, chunks, window),
        DataType::F32 => assemble_as!(F32, f32, chunks, window),
        DataType::F64 => assemble_as!(F64, f64, chunks, window),
    };
    Ok(raster)
}

#[cfg(test)]
mod tests {
    use super::*;
    use s2batch_core::io::write_geotiff;

    fn write_fixture(dir: &std::path::Path) -> String {
        let mut raster = Raster::<u16>::new(40, 30);
        for r in 0..40 {
            for c in 0..30 {
                raster.set(r, c, (r * 100 + c) as u16).unwrap();
            }
        }
        raster.set_transform(GeoTransform::new(500_000.0, 4_500_000.0, 10.0, -10.0));
        raster.set_crs(Some(CRS::from_epsg(32630)));

        let path = dir.join("band.tif");
        write_geotiff(&raster.into(), &path).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[test]
    fn open_reads_georeferencing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path());

        let ds = CogSource::default().open(&path).unwrap();
        assert_eq!((ds.width(), ds.height()), (30, 40));
        assert_eq!(ds.crs().and_then(CRS::epsg), Some(32630));
        assert_eq!(ds.transform().origin_x, 500_000.0);
        assert_eq!(ds.transform().pixel_height, -10.0);
    }

    #[test]
    fn read_window_returns_exact_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path());

        let mut ds = CogSource::default().open(&path).unwrap();
        let window = PixelWindow::new(5, 7, 4, 3);
        let typed = ds.read_window(&window).unwrap();

        assert_eq!(typed.data_type(), DataType::U16);
        assert_eq!(typed.shape(), (3, 4));
        let raster = typed.to_f64();
        assert_eq!(raster.get(0, 0).unwrap(), 705.0);
        assert_eq!(raster.get(2, 3).unwrap(), 908.0);
    }

    #[test]
    fn read_window_rejects_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path());

        let mut ds = CogSource::default().open(&path).unwrap();
        assert!(ds.read_window(&PixelWindow::new(25, 0, 10, 1)).is_err());
        assert!(matches!(
            ds.read_window(&PixelWindow::new(0, 0, 0, 5)),
            Err(CloudError::EmptyWindow)
        ));
    }

    #[test]
    fn missing_file_is_unavailable() {
        let result = CogSource::default().open("/nonexistent/s2batch/B04.tif");
        assert!(matches!(result, Err(CloudError::SourceUnavailable { .. })));
    }

    #[test]
    fn blit_copies_overlap_only() {
        let chunk = Chunk {
            col: 4,
            row: 0,
            width: 4,
            height: 2,
            data: DecodingResult::U8(Vec::new()),
        };
        let src: Vec<u8> = (0..8).collect();
        let window = PixelWindow::new(2, 1, 4, 1);
        let mut out = vec![0u8; 4];
        blit(&mut out, &window, &chunk, &src).unwrap();
        // window cols 2..6, chunk cols 4..8, row 1
        assert_eq!(out, vec![0, 0, 4, 5]);
    }

    #[test]
    fn truncated_chunk_is_invalid() {
        let chunk = Chunk {
            col: 0,
            row: 0,
            width: 4,
            height: 3,
            data: DecodingResult::U8(Vec::new()),
        };
        // two of three rows decoded
        let src: Vec<u8> = (0..8).collect();
        let window = PixelWindow::new(0, 0, 4, 3);
        let mut out = vec![0u8; 12];
        let err = blit(&mut out, &window, &chunk, &src).unwrap_err();
        assert!(matches!(err, CloudError::InvalidTiff { .. }));
    }
}
