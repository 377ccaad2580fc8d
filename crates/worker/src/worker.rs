//! The job worker
//!
//! One worker drains the queue, one job at a time:
//!
//! ```text
//! Idle → Initializing → PerSceneLoop → Finalizing → Idle
//! ```
//!
//! Initializing searches the catalog before anything touches the disk,
//! then creates `<root>/<id>/`, dumps the job as `<id>.txt` and plans the
//! bands. Each scene is cloud screened, its bands subset and saved, and
//! its indices and composites derived. Finalizing zips the job directory.
//!
//! Any error aborts the whole job. The partial directory is left in place,
//! progress is cleared and the worker moves on to the next job.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use s2batch_algorithms::{cloud_fraction, composite, compute_index, exceeds_cloud_cover, Band};
use s2batch_cloud::{extract_subset, save_subset, BBox, RasterSource};
use s2batch_core::io::{write_geotiff, write_geotiff_stack};
use s2batch_core::{Raster, TypedRaster};
use tracing::{debug, error, info, warn};

use crate::archive::archive_job;
use crate::catalog::{Catalog, SceneQuery, SceneRecord};
use crate::config::WorkerConfig;
use crate::error::Result;
use crate::plan::BandPlan;
use crate::queue::JobQueue;
use crate::request::JobDescriptor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    Initializing { job_id: String },
    PerSceneLoop { job_id: String, scene: usize, total: usize },
    Finalizing { job_id: String },
}

/// What happened to one scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SceneOutcome {
    Processed,
    Cloudy,
}

pub struct Worker {
    queue: Arc<JobQueue>,
    catalog: Arc<dyn Catalog>,
    source: Arc<dyn RasterSource>,
    config: WorkerConfig,
    state: WorkerState,
}

impl Worker {
    /// Outputs go under the queue's configured root, so status lookups and
    /// the worker agree on where archives live.
    pub fn new(
        queue: Arc<JobQueue>,
        catalog: Arc<dyn Catalog>,
        source: Arc<dyn RasterSource>,
    ) -> Self {
        let config = queue.config().clone();
        Self {
            queue,
            catalog,
            source,
            config,
            state: WorkerState::Idle,
        }
    }

    pub fn state(&self) -> &WorkerState {
        &self.state
    }

    /// Process jobs until the queue is closed and drained.
    pub fn run(mut self) {
        info!(output_root = %self.config.output_root.display(), "worker started");
        while let Some(job) = self.queue.dequeue() {
            // failures are logged by `process`
            let _ = self.process(job);
        }
        info!("queue closed, worker stopping");
    }

    /// Run the worker on its own thread.
    pub fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("s2batch-worker".into())
            .spawn(move || self.run())
    }

    /// Run one job to completion and return its archive path.
    pub fn process(&mut self, job: JobDescriptor) -> Result<PathBuf> {
        self.queue.start_job(&job.id);
        info!(job_id = %job.id, "processing job");

        let result = self.run_job(&job);
        match &result {
            Ok(archive) => info!(job_id = %job.id, archive = %archive.display(), "job finished"),
            Err(e) => error!(job_id = %job.id, error = %e, "job aborted"),
        }

        self.queue.reset_progress();
        self.transition(WorkerState::Idle);
        result
    }

    fn transition(&mut self, next: WorkerState) {
        debug!(from = ?self.state, to = ?next, "worker state");
        self.state = next;
    }

    fn run_job(&mut self, job: &JobDescriptor) -> Result<PathBuf> {
        self.transition(WorkerState::Initializing {
            job_id: job.id.clone(),
        });

        let search = self.catalog.search(&SceneQuery {
            bbox: job.bbox,
            start: job.start,
            end: job.end,
        })?;
        // Without a matched count the scenes are listed up front
        let (total, scenes): (usize, Box<dyn Iterator<Item = Result<SceneRecord>>>) =
            match search.matched {
                Some(matched) => (matched as usize, search.scenes),
                None => {
                    let all = search.scenes.collect::<Result<Vec<_>>>()?;
                    (all.len(), Box::new(all.into_iter().map(Ok)))
                }
            };

        let job_dir = self.config.job_dir(&job.id);
        fs::create_dir_all(&self.config.output_root)?;
        fs::create_dir(&job_dir)?;
        fs::write(job_dir.join(format!("{}.txt", job.id)), job.dump()?)?;

        let plan = BandPlan::for_job(job);
        info!(
            job_id = %job.id,
            scenes = total,
            bands = ?plan.bands,
            implicit = ?plan.implicit,
            "job initialized"
        );

        let bbox = BBox::from_array(job.bbox);
        let mut processed = 0;
        let mut skipped = 0;
        for (scene_no, scene) in scenes.enumerate() {
            let scene = scene?;
            self.transition(WorkerState::PerSceneLoop {
                job_id: job.id.clone(),
                scene: scene_no,
                total,
            });
            self.queue.set_percentage(percentage(scene_no, total));

            match self.process_scene(job, &plan, &job_dir, &bbox, &scene)? {
                SceneOutcome::Processed => processed += 1,
                SceneOutcome::Cloudy => skipped += 1,
            }
        }
        self.queue.set_percentage(100);
        info!(job_id = %job.id, processed, skipped, "scenes done");

        self.transition(WorkerState::Finalizing {
            job_id: job.id.clone(),
        });
        archive_job(&self.config.output_root, &job.id)
    }

    fn process_scene(
        &self,
        job: &JobDescriptor,
        plan: &BandPlan,
        job_dir: &Path,
        bbox: &BBox,
        scene: &SceneRecord,
    ) -> Result<SceneOutcome> {
        let source = self.source.as_ref();

        if let Some(max_cloud_cover) = job.max_cloud_cover {
            let scl = extract_subset(source, scene.asset(Band::Scl)?, bbox)?;
            let fraction = cloud_fraction(&scl.to_f64(), &self.config.obstruction_classes);
            if exceeds_cloud_cover(fraction, max_cloud_cover) {
                warn!(
                    job_id = %job.id,
                    scene = %scene.id,
                    cloud_cover = fraction * 100.0,
                    max_cloud_cover,
                    "scene too cloudy, skipping"
                );
                return Ok(SceneOutcome::Cloudy);
            }
        }

        info!(job_id = %job.id, scene = %scene.id, date = %scene.date, tile = %scene.tile, "processing scene");
        let output = |name: &str| job.pattern.output_path(job_dir, name, scene.date, &scene.tile);

        let mut rasters: HashMap<Band, Raster<f64>> = HashMap::with_capacity(plan.bands.len());
        for &band in &plan.bands {
            let subset = save_subset(source, scene.asset(band)?, bbox, &output(band.name()))?;
            rasters.insert(band, subset.to_f64());
        }

        for &index in &job.indices {
            let raster = compute_index(index, &rasters)?;
            let path = output(index.name());
            create_parent(&path)?;
            write_geotiff(&TypedRaster::from(raster), &path)?;
            info!(job_id = %job.id, index = %index, path = %path.display(), "index written");
        }

        for &kind in &job.composites {
            let stack = composite(kind, &rasters)?;
            let path = output(kind.name());
            create_parent(&path)?;
            write_geotiff_stack(&stack, &path)?;
            info!(job_id = %job.id, composite = %kind, path = %path.display(), "composite written");
        }

        for &band in &plan.implicit {
            let path = output(band.name());
            fs::remove_file(&path)?;
            debug!(path = %path.display(), "removed intermediate band");
        }

        Ok(SceneOutcome::Processed)
    }
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// `round(processed / total * 100)`, 0 for an empty job.
fn percentage(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (processed as f64 / total as f64 * 100.0).round();
    pct.min(100.0) as u8
}
