//! Error types for remote raster access and catalog search.

use thiserror::Error;

/// Errors produced while reaching catalogs and rasters.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server does not support Range requests for {url}")]
    RangeNotSupported { url: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("raster source unavailable: {locator}: {reason}")]
    SourceUnavailable { locator: String, reason: String },

    #[error("invalid TIFF: {reason}")]
    InvalidTiff { reason: String },

    #[error("raster has no coordinate reference system")]
    MissingCrs,

    #[error("unsupported coordinate reference system: EPSG:{0}")]
    UnsupportedCrs(u32),

    #[error("bbox does not intersect raster extent")]
    EmptyWindow,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("core error: {0}")]
    Core(#[from] s2batch_core::Error),
}

impl From<tiff::TiffError> for CloudError {
    fn from(e: tiff::TiffError) -> Self {
        match e {
            tiff::TiffError::IoError(io) => CloudError::Io(io),
            other => CloudError::InvalidTiff {
                reason: other.to_string(),
            },
        }
    }
}

/// Result alias for cloud operations.
pub type Result<T> = std::result::Result<T, CloudError>;
