//! Output filename patterns
//!
//! A pattern is a relative path template such as `out/yymmdd-tile-name.tif`.
//! The tokens `name`, `yymmdd` and `tile` are replaced verbatim, in that
//! order.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{JobError, Result};

pub const NAME_TOKEN: &str = "name";
pub const DATE_TOKEN: &str = "yymmdd";
pub const TILE_TOKEN: &str = "tile";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilenamePattern(String);

impl FilenamePattern {
    /// Every output of a scene shares date and tile, so the pattern must
    /// carry `name` to keep them apart.
    pub fn new(pattern: &str) -> Result<Self> {
        if pattern.trim().is_empty() {
            return Err(JobError::InvalidRequest("pattern is empty".into()));
        }
        if !pattern.contains(NAME_TOKEN) {
            return Err(JobError::InvalidRequest(format!(
                "pattern {pattern:?} has no '{NAME_TOKEN}' token"
            )));
        }
        Ok(Self(pattern.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substitute the tokens for one output.
    pub fn render(&self, name: &str, date: NaiveDate, tile: &str) -> String {
        self.0
            .replace(NAME_TOKEN, name)
            .replace(DATE_TOKEN, &yymmdd(date))
            .replace(TILE_TOKEN, tile)
    }

    /// Output location under `job_dir`.
    pub fn output_path(&self, job_dir: &Path, name: &str, date: NaiveDate, tile: &str) -> PathBuf {
        job_dir.join(self.render(name, date, tile))
    }
}

impl fmt::Display for FilenamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Two-digit year, month and day: 2024-03-05 gives `240305`.
pub fn yymmdd(date: NaiveDate) -> String {
    date.format("%y%m%d").to_string()
}
