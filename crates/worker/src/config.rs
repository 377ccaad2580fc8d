//! Worker configuration

use std::path::PathBuf;

use s2batch_algorithms::OBSTRUCTION_CLASSES;
use serde::{Deserialize, Serialize};

/// Default STAC collection holding Sentinel-2 L2A COGs
pub const DEFAULT_COLLECTION: &str = "sentinel-2-l2a";

/// Settings shared by the queue, the catalog adapter and the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Directory holding one sub-directory per job
    pub output_root: PathBuf,
    /// `earth-search` or the root URL of a STAC API
    pub catalog: String,
    pub collection: String,
    /// Items requested per STAC search page
    pub page_size: u32,
    /// SCL classes counted as obstructed by the cloud filter
    pub obstruction_classes: Vec<u8>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("."),
            catalog: "earth-search".to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            page_size: 100,
            obstruction_classes: OBSTRUCTION_CLASSES.to_vec(),
        }
    }
}

impl WorkerConfig {
    pub fn with_output_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.output_root = root.into();
        self
    }

    /// Directory of one job's outputs
    pub fn job_dir(&self, job_id: &str) -> PathBuf {
        self.output_root.join(job_id)
    }

    /// Final location of a job's archive, `<root>/<id>/<id>.zip`
    pub fn archive_path(&self, job_id: &str) -> PathBuf {
        self.job_dir(job_id).join(format!("{job_id}.zip"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.collection, "sentinel-2-l2a");
        assert_eq!(config.obstruction_classes, vec![0, 1, 2, 3, 8, 9, 10]);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: WorkerConfig = serde_json::from_str(r#"{"output_root": "/data/jobs"}"#).unwrap();
        assert_eq!(config.output_root, PathBuf::from("/data/jobs"));
        assert_eq!(config.page_size, 100);
    }

    #[test]
    fn archive_lives_inside_job_dir() {
        let config = WorkerConfig::default().with_output_root("/srv/s2");
        assert_eq!(
            config.archive_path("job-1"),
            PathBuf::from("/srv/s2/job-1/job-1.zip")
        );
    }
}
