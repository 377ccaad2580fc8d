//! Job submissions and validated job descriptors

use std::path::{Component, Path};

use chrono::{NaiveDate, Utc};
use s2batch_algorithms::{Band, Composite, SpectralIndex};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{JobError, Result};
use crate::pattern::FilenamePattern;

/// A job as submitted, before validation.
///
/// ```json
/// {
///   "bbox": [13.18260, 53.81978, 13.286973, 53.840044],
///   "start": "2024-03-05",
///   "end": "2024-03-23",
///   "max_cloud_cover": 20,
///   "bands": ["red", "nir"],
///   "indices": ["ndvi"],
///   "pattern": "out/yymmdd-name.tiff"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    /// `[min_x, min_y, max_x, max_y]` in EPSG:4326 (lon, lat)
    pub bbox: [f64; 4],
    /// `YYYY-MM-DD`
    pub start: String,
    /// `YYYY-MM-DD`
    pub end: String,
    /// Skip scenes with more than this percentage of obstructed pixels
    #[serde(default)]
    pub max_cloud_cover: Option<f64>,
    #[serde(default)]
    pub bands: Vec<String>,
    #[serde(default)]
    pub indices: Vec<String>,
    #[serde(default)]
    pub composites: Vec<String>,
    pub pattern: String,
}

/// A validated, immutable job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub id: String,
    pub bbox: [f64; 4],
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub max_cloud_cover: Option<f64>,
    pub bands: Vec<Band>,
    pub indices: Vec<SpectralIndex>,
    pub composites: Vec<Composite>,
    pub pattern: FilenamePattern,
}

fn invalid(msg: impl Into<String>) -> JobError {
    JobError::InvalidRequest(msg.into())
}

/// New job id: `job-YYYY-MM-DD-HH-MM-SS-xxxxxxxx` (UTC time plus random hex).
pub fn new_job_id() -> String {
    let stamp = Utc::now().format("job-%Y-%m-%d-%H-%M-%S");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{stamp}-{}", &suffix[..8])
}

impl JobRequest {
    /// Parse a JSON submission.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| invalid(format!("malformed job request: {e}")))
    }

    /// Check the request and assign it a fresh job id.
    pub fn validate(&self) -> Result<JobDescriptor> {
        self.validate_with_id(new_job_id())
    }

    pub fn validate_with_id(&self, id: String) -> Result<JobDescriptor> {
        let bbox = validate_bbox(self.bbox)?;
        let start = parse_date("start", &self.start)?;
        let end = parse_date("end", &self.end)?;
        if start >= end {
            return Err(invalid(format!(
                "start date {start} must be before end date {end}"
            )));
        }

        if let Some(pct) = self.max_cloud_cover {
            if !(0.0..=100.0).contains(&pct) {
                return Err(invalid(format!(
                    "max_cloud_cover must be between 0 and 100, got {pct}"
                )));
            }
        }

        let bands: Vec<Band> = parse_names(&self.bands)?;
        let indices: Vec<SpectralIndex> = parse_names(&self.indices)?;
        let composites: Vec<Composite> = parse_names(&self.composites)?;
        if bands.is_empty() && indices.is_empty() && composites.is_empty() {
            return Err(invalid("request names no bands, indices or composites"));
        }

        let pattern = FilenamePattern::new(&self.pattern)?;
        validate_relative(&self.pattern)?;

        Ok(JobDescriptor {
            id,
            bbox,
            start,
            end,
            max_cloud_cover: self.max_cloud_cover,
            bands,
            indices,
            composites,
            pattern,
        })
    }
}

fn validate_bbox(bbox: [f64; 4]) -> Result<[f64; 4]> {
    let [min_x, min_y, max_x, max_y] = bbox;
    if bbox.iter().any(|v| !v.is_finite()) {
        return Err(invalid("bbox contains a non-finite coordinate"));
    }
    if min_x >= max_x || min_y >= max_y {
        return Err(invalid(format!(
            "bbox must satisfy min_x < max_x and min_y < max_y, got {bbox:?}"
        )));
    }
    if min_x < -180.0 || max_x > 180.0 || min_y < -90.0 || max_y > 90.0 {
        return Err(invalid(format!("bbox {bbox:?} is outside lon/lat range")));
    }
    Ok(bbox)
}

/// Dates must be zero padded `YYYY-MM-DD`.
fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| invalid(format!("{field} date {value:?} is not YYYY-MM-DD")))?;
    if date.format("%Y-%m-%d").to_string() != value {
        return Err(invalid(format!("{field} date {value:?} is not zero padded")));
    }
    Ok(date)
}

/// Parse names in order, dropping repeats.
fn parse_names<T>(names: &[String]) -> Result<Vec<T>>
where
    T: std::str::FromStr<Err = s2batch_core::Error> + PartialEq,
{
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let parsed: T = name.parse().map_err(|e: s2batch_core::Error| invalid(e.to_string()))?;
        if !out.contains(&parsed) {
            out.push(parsed);
        }
    }
    Ok(out)
}

/// Outputs must stay inside the job directory.
fn validate_relative(pattern: &str) -> Result<()> {
    let escapes = Path::new(pattern)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(invalid(format!(
            "pattern {pattern:?} must be a relative path without '..'"
        )));
    }
    Ok(())
}

impl JobDescriptor {
    /// Text dump stored next to the outputs as `<id>/<id>.txt`
    pub fn dump(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| JobError::Io(std::io::Error::other(e)))
    }
}
