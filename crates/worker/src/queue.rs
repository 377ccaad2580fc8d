//! In-process job queue and progress state
//!
//! A FIFO of validated jobs with a blocking dequeue for the worker, plus
//! the status record the worker publishes while it runs. The current job
//! id and percentage are separate cells: a reader can briefly observe a
//! new id with the previous job's percentage.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex, RwLock};
use serde::Serialize;
use tracing::info;

use crate::config::WorkerConfig;
use crate::error::{JobError, Result};
use crate::request::{JobDescriptor, JobRequest};

#[derive(Default)]
struct Pending {
    jobs: VecDeque<JobDescriptor>,
    closed: bool,
}

/// Written by the worker, read by anyone.
#[derive(Default)]
struct Progress {
    job_id: RwLock<Option<String>>,
    percentage: RwLock<Option<u8>>,
}

/// Status of one job as seen from the request side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatus {
    /// The job's archive exists on disk
    pub ready: bool,
    /// The worker is running this job now
    pub processing: bool,
    /// Progress through the job's scenes, while processing
    pub percentage: Option<u8>,
}

pub struct JobQueue {
    pending: Mutex<Pending>,
    available: Condvar,
    progress: Progress,
    config: WorkerConfig,
}

impl JobQueue {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            pending: Mutex::new(Pending::default()),
            available: Condvar::new(),
            progress: Progress::default(),
            config,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Append a validated job; returns its id.
    pub fn enqueue(&self, job: JobDescriptor) -> Result<String> {
        let mut pending = self.pending.lock();
        if pending.closed {
            return Err(JobError::InvalidRequest("queue is closed".into()));
        }
        let id = job.id.clone();
        pending.jobs.push_back(job);
        info!(job_id = %id, queued = pending.jobs.len(), "job enqueued");
        drop(pending);

        self.available.notify_one();
        Ok(id)
    }

    /// Validate a request and enqueue it. Invalid requests leave no trace.
    pub fn submit(&self, request: &JobRequest) -> Result<String> {
        let job = request.validate()?;
        self.enqueue(job)
    }

    /// Jobs waiting, not counting the one being processed.
    pub fn queue_length(&self) -> usize {
        self.pending.lock().jobs.len()
    }

    /// The waiting jobs, next first.
    pub fn peek_queue(&self) -> Vec<JobDescriptor> {
        self.pending.lock().jobs.iter().cloned().collect()
    }

    pub fn current_job_id(&self) -> Option<String> {
        self.progress.job_id.read().clone()
    }

    pub fn current_percentage(&self) -> Option<u8> {
        *self.progress.percentage.read()
    }

    /// Failed jobs report neither ready nor processing.
    pub fn job_status(&self, job_id: &str) -> JobStatus {
        let processing = self.current_job_id().as_deref() == Some(job_id);
        JobStatus {
            ready: self.config.archive_path(job_id).is_file(),
            processing,
            percentage: if processing {
                self.current_percentage()
            } else {
                None
            },
        }
    }

    /// Block until a job is available. `None` once the queue is closed and
    /// drained.
    pub fn dequeue(&self) -> Option<JobDescriptor> {
        let mut pending = self.pending.lock();
        loop {
            if let Some(job) = pending.jobs.pop_front() {
                return Some(job);
            }
            if pending.closed {
                return None;
            }
            self.available.wait(&mut pending);
        }
    }

    /// Stop accepting jobs. Waiting jobs are still handed out.
    pub fn close(&self) {
        self.pending.lock().closed = true;
        self.available.notify_all();
    }

    pub(crate) fn start_job(&self, job_id: &str) {
        *self.progress.job_id.write() = Some(job_id.to_string());
        *self.progress.percentage.write() = Some(0);
    }

    pub(crate) fn set_percentage(&self, percentage: u8) {
        *self.progress.percentage.write() = Some(percentage.min(100));
    }

    pub(crate) fn reset_progress(&self) {
        *self.progress.job_id.write() = None;
        *self.progress.percentage.write() = None;
    }
}
