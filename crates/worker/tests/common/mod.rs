//! Shared fixtures: synthetic UTM 33N scenes on disk and a catalog over them.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use s2batch_cloud::CogSource;
use s2batch_core::io::write_geotiff;
use s2batch_core::{GeoTransform, Raster, RasterElement, TypedRaster, CRS};
use s2batch_worker::{
    Catalog, JobError, JobQueue, JobRequest, SceneQuery, SceneRecord, SceneSearch, Worker,
    WorkerConfig,
};

pub const EPSG: u32 = 32633;
pub const ORIGIN_X: f64 = 360_000.0;
pub const ORIGIN_Y: f64 = 5_890_000.0;
/// 20 km x 30 km
const EXTENT_X: f64 = 20_000.0;
const EXTENT_Y: f64 = 30_000.0;

/// Around 13.0-13.1 E, 53.0-53.1 N, inside the grids below
pub const BBOX: [f64; 4] = [13.0, 53.0, 13.1, 53.1];

/// Cell size standing in for the 10 m bands
pub const FINE: f64 = 100.0;
/// Cell size standing in for the 20 m bands
pub const COARSE: f64 = 200.0;

pub fn grid<T: RasterElement>(cell: f64, value: T) -> Raster<T> {
    let rows = (EXTENT_Y / cell) as usize;
    let cols = (EXTENT_X / cell) as usize;
    let mut raster = Raster::filled(rows, cols, value);
    raster.set_transform(GeoTransform::new(ORIGIN_X, ORIGIN_Y, cell, -cell));
    raster.set_crs(Some(CRS::from_epsg(EPSG)));
    raster
}

pub fn write_band(dir: &Path, file: &str, raster: TypedRaster) -> String {
    let path = dir.join(file);
    write_geotiff(&raster, &path).unwrap();
    path.to_string_lossy().into_owned()
}

/// Writes one scene's assets under `dir/<scene id>/` and returns its record.
///
/// Reflectances are constant: blue 500, green 800, red 1000, nir 3000,
/// rededge1 1500. `scl` fills the classification layer.
pub fn write_scene(dir: &Path, id: &str, date: (i32, u32, u32), scl: u8) -> SceneRecord {
    let scene_dir = dir.join(id);
    std::fs::create_dir_all(&scene_dir).unwrap();

    let mut assets = HashMap::new();
    for (name, cell, value) in [
        ("blue", FINE, 500u16),
        ("green", FINE, 800),
        ("red", FINE, 1000),
        ("nir", FINE, 3000),
        ("rededge1", COARSE, 1500),
    ] {
        let href = write_band(&scene_dir, &format!("{name}.tif"), grid(cell, value).into());
        assets.insert(name.to_string(), href);
    }
    let href = write_band(&scene_dir, "scl.tif", grid(COARSE, scl).into());
    assets.insert("scl".to_string(), href);

    SceneRecord {
        id: id.to_string(),
        date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        tile: "33UUV".to_string(),
        assets,
    }
}

/// Catalog returning fixed scenes, or failing every search.
pub struct FixedCatalog {
    pub scenes: Vec<SceneRecord>,
    pub unreachable: bool,
    /// Report no matched count, forcing the worker to list scenes first
    pub hide_matched: bool,
}

impl FixedCatalog {
    pub fn new(scenes: Vec<SceneRecord>) -> Self {
        Self {
            scenes,
            unreachable: false,
            hide_matched: false,
        }
    }

    pub fn unreachable() -> Self {
        Self {
            scenes: Vec::new(),
            unreachable: true,
            hide_matched: false,
        }
    }
}

impl Catalog for FixedCatalog {
    fn search(&self, _query: &SceneQuery) -> s2batch_worker::Result<SceneSearch> {
        if self.unreachable {
            return Err(JobError::SourceUnavailable("catalog is down".into()));
        }
        let mut search = SceneSearch::from_records(self.scenes.clone());
        if self.hide_matched {
            search.matched = None;
        }
        Ok(search)
    }
}

pub fn request(bands: &[&str], indices: &[&str], composites: &[&str]) -> JobRequest {
    let owned = |v: &[&str]| v.iter().map(|s| s.to_string()).collect();
    JobRequest {
        bbox: BBOX,
        start: "2024-03-01".into(),
        end: "2024-03-31".into(),
        max_cloud_cover: None,
        bands: owned(bands),
        indices: owned(indices),
        composites: owned(composites),
        pattern: "out/yymmdd-tile-name.tif".into(),
    }
}

/// Queue rooted at `root/jobs` and a worker reading local files.
pub fn worker(root: &Path, catalog: FixedCatalog) -> (Arc<JobQueue>, Worker) {
    let config = WorkerConfig::default().with_output_root(root.join("jobs"));
    let queue = Arc::new(JobQueue::new(config));
    let worker = Worker::new(queue.clone(), Arc::new(catalog), Arc::new(CogSource::default()));
    (queue, worker)
}
