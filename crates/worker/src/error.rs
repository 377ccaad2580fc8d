//! Job error taxonomy

use s2batch_cloud::CloudError;
use thiserror::Error;

/// Why a job was rejected or aborted.
#[derive(Error, Debug)]
pub enum JobError {
    /// Rejected at submission; nothing was queued or written
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Catalog or raster unreachable, or a scene lacks a needed asset
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("bbox does not intersect the raster")]
    EmptyWindow,

    /// Shape mismatch beyond 2x reconciliation, unsupported raster layout
    #[error("computation failed: {0}")]
    Computation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("archive error: {0}")]
    Archive(String),
}

impl From<CloudError> for JobError {
    fn from(e: CloudError) -> Self {
        match e {
            CloudError::EmptyWindow => JobError::EmptyWindow,
            CloudError::Io(io) => JobError::Io(io),
            CloudError::Core(core) => JobError::from(core),
            e @ (CloudError::Http(_)
            | CloudError::RangeNotSupported { .. }
            | CloudError::Network(_)
            | CloudError::SourceUnavailable { .. }) => JobError::SourceUnavailable(e.to_string()),
            e @ (CloudError::InvalidTiff { .. }
            | CloudError::MissingCrs
            | CloudError::UnsupportedCrs(_)) => JobError::Computation(e.to_string()),
        }
    }
}

impl From<s2batch_core::Error> for JobError {
    fn from(e: s2batch_core::Error) -> Self {
        match e {
            s2batch_core::Error::Io(io) => JobError::Io(io),
            other => JobError::Computation(other.to_string()),
        }
    }
}

impl From<zip::result::ZipError> for JobError {
    fn from(e: zip::result::ZipError) -> Self {
        JobError::Archive(e.to_string())
    }
}

impl From<walkdir::Error> for JobError {
    fn from(e: walkdir::Error) -> Self {
        JobError::Archive(e.to_string())
    }
}

/// Result alias for job operations.
pub type Result<T> = std::result::Result<T, JobError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloud_errors_map_onto_taxonomy() {
        let unavailable = CloudError::SourceUnavailable {
            locator: "https://example.com/B04.tif".into(),
            reason: "connection refused".into(),
        };
        assert!(matches!(
            JobError::from(unavailable),
            JobError::SourceUnavailable(msg) if msg.contains("B04.tif")
        ));
        assert!(matches!(JobError::from(CloudError::EmptyWindow), JobError::EmptyWindow));
        assert!(matches!(JobError::from(CloudError::MissingCrs), JobError::Computation(_)));
    }

    #[test]
    fn core_size_mismatch_is_computation() {
        let err = s2batch_core::Error::SizeMismatch {
            er: 10,
            ec: 10,
            ar: 7,
            ac: 10,
        };
        assert!(matches!(JobError::from(err), JobError::Computation(_)));
    }
}
