//! # s2batch worker
//!
//! Batch retrieval of Sentinel-2 subsets:
//!
//! - [`request`]: job submissions, validation and job ids
//! - [`queue`]: FIFO of validated jobs plus the progress record
//! - [`worker`]: the single worker turning a job into GeoTIFFs and a zip
//! - [`catalog`]: the scene search seam and its STAC implementation
//!
//! ```no_run
//! use std::sync::Arc;
//! use s2batch_cloud::CogSource;
//! use s2batch_worker::{JobQueue, JobRequest, StacSceneCatalog, Worker, WorkerConfig};
//!
//! # fn main() -> s2batch_worker::Result<()> {
//! let config = WorkerConfig::default().with_output_root("jobs");
//! let queue = Arc::new(JobQueue::new(config.clone()));
//! let catalog = Arc::new(StacSceneCatalog::new(&config)?);
//! let handle = Worker::new(queue.clone(), catalog, Arc::new(CogSource::default())).spawn()?;
//!
//! let request = JobRequest::from_json(
//!     r#"{"bbox": [13.18, 53.82, 13.28, 53.84], "start": "2024-03-05",
//!         "end": "2024-03-23", "indices": ["ndvi"], "pattern": "yymmdd-name.tif"}"#,
//! )?;
//! let job_id = queue.submit(&request)?;
//! queue.close();
//! handle.join().ok();
//! assert!(queue.job_status(&job_id).ready);
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod catalog;
pub mod config;
pub mod error;
pub mod pattern;
pub mod plan;
pub mod queue;
pub mod request;
pub mod worker;

pub use archive::archive_job;
pub use catalog::{Catalog, SceneQuery, SceneRecord, SceneSearch, StacSceneCatalog};
pub use config::WorkerConfig;
pub use error::{JobError, Result};
pub use pattern::FilenamePattern;
pub use plan::{files_per_scene, BandPlan};
pub use queue::{JobQueue, JobStatus};
pub use request::{new_job_id, JobDescriptor, JobRequest};
pub use worker::{Worker, WorkerState};
