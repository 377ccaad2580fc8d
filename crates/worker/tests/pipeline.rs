//! End-to-end jobs over synthetic scenes written to a scratch directory.

mod common;

use std::fs::File;

use approx::assert_relative_eq;
use s2batch_core::io::{read_geotiff, read_geotiff_stack};
use s2batch_core::CRS;
use s2batch_worker::{JobError, JobStatus, WorkerState};
use zip::ZipArchive;

use common::*;

fn archive_names(path: &std::path::Path) -> Vec<String> {
    let zip = ZipArchive::new(File::open(path).unwrap()).unwrap();
    let mut names: Vec<String> = zip.file_names().map(str::to_string).collect();
    names.sort();
    names
}

#[test]
fn explicit_bands_and_ndvi() {
    let dir = tempfile::tempdir().unwrap();
    let scenes = vec![
        write_scene(dir.path(), "S2A_0305", (2024, 3, 5), 4),
        write_scene(dir.path(), "S2B_0312", (2024, 3, 12), 4),
    ];
    let (queue, mut worker) = worker(dir.path(), FixedCatalog::new(scenes));

    let job = request(&["red", "nir"], &["ndvi"], &[]).validate().unwrap();
    let id = job.id.clone();
    let archive = worker.process(job).unwrap();

    let job_dir = dir.path().join("jobs").join(&id);
    assert_eq!(archive, job_dir.join(format!("{id}.zip")));
    assert!(job_dir.join(format!("{id}.txt")).is_file());

    for date in ["240305", "240312"] {
        let red = read_geotiff(job_dir.join(format!("out/{date}-33UUV-red.tif"))).unwrap();
        let nir = read_geotiff(job_dir.join(format!("out/{date}-33UUV-nir.tif"))).unwrap();
        let ndvi = read_geotiff(job_dir.join(format!("out/{date}-33UUV-ndvi.tif"))).unwrap();

        assert_eq!(red.shape(), nir.shape());
        assert_eq!(ndvi.shape(), red.shape());
        assert_eq!(ndvi.transform(), red.transform());
        assert_eq!(ndvi.crs().and_then(CRS::epsg), Some(EPSG));

        let values = ndvi.to_f64();
        let (rows, cols) = values.shape();
        assert!(rows > 0 && cols > 0);
        // (3000 - 1000) / (3000 + 1000)
        assert_relative_eq!(values.get(0, 0).unwrap(), 0.5);
        assert_relative_eq!(values.get(rows - 1, cols - 1).unwrap(), 0.5);
    }

    let txt = format!("{id}.txt");
    let mut expected = vec![txt.as_str(), "out/"];
    let tifs = [
        "out/240305-33UUV-ndvi.tif",
        "out/240305-33UUV-nir.tif",
        "out/240305-33UUV-red.tif",
        "out/240312-33UUV-ndvi.tif",
        "out/240312-33UUV-nir.tif",
        "out/240312-33UUV-red.tif",
    ];
    expected.extend(tifs);
    expected.sort();
    assert_eq!(archive_names(&archive), expected);

    assert_eq!(
        queue.job_status(&id),
        JobStatus { ready: true, processing: false, percentage: None }
    );
    assert_eq!(queue.current_job_id(), None);
    assert_eq!(queue.current_percentage(), None);
    assert_eq!(worker.state(), &WorkerState::Idle);
}

#[test]
fn implicit_bands_are_removed() {
    let dir = tempfile::tempdir().unwrap();
    let scenes = vec![write_scene(dir.path(), "S2A_0305", (2024, 3, 5), 4)];
    let (queue, mut worker) = worker(dir.path(), FixedCatalog::new(scenes));

    let job = request(&[], &["ndvi"], &[]).validate().unwrap();
    let id = job.id.clone();
    let archive = worker.process(job).unwrap();

    let out = dir.path().join("jobs").join(&id).join("out");
    assert!(out.join("240305-33UUV-ndvi.tif").is_file());
    assert!(!out.join("240305-33UUV-red.tif").exists());
    assert!(!out.join("240305-33UUV-nir.tif").exists());

    let names = archive_names(&archive);
    assert!(names.contains(&"out/240305-33UUV-ndvi.tif".to_string()));
    assert!(!names.iter().any(|n| n.ends_with("-red.tif") || n.ends_with("-nir.tif")));
    assert!(queue.job_status(&id).ready);
}

#[test]
fn unlisted_matched_count_still_processes_every_scene() {
    let dir = tempfile::tempdir().unwrap();
    let mut catalog = FixedCatalog::new(vec![
        write_scene(dir.path(), "a", (2024, 3, 5), 4),
        write_scene(dir.path(), "b", (2024, 3, 12), 4),
    ]);
    catalog.hide_matched = true;
    let (_queue, mut worker) = worker(dir.path(), catalog);

    let job = request(&["red"], &[], &[]).validate().unwrap();
    let id = job.id.clone();
    worker.process(job).unwrap();

    let out = dir.path().join("jobs").join(&id).join("out");
    assert!(out.join("240305-33UUV-red.tif").is_file());
    assert!(out.join("240312-33UUV-red.tif").is_file());
}

#[test]
fn cloudy_scene_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let scenes = vec![
        // 4 = vegetation, 9 = cloud high probability
        write_scene(dir.path(), "clear", (2024, 3, 5), 4),
        write_scene(dir.path(), "cloudy", (2024, 3, 12), 9),
    ];
    let (queue, mut worker) = worker(dir.path(), FixedCatalog::new(scenes));

    let mut req = request(&["red"], &["ndvi"], &[]);
    req.max_cloud_cover = Some(20.0);
    let job = req.validate().unwrap();
    let id = job.id.clone();
    worker.process(job).unwrap();

    let out = dir.path().join("jobs").join(&id).join("out");
    assert!(out.join("240305-33UUV-red.tif").is_file());
    assert!(out.join("240305-33UUV-ndvi.tif").is_file());
    assert!(!out.join("240312-33UUV-red.tif").exists());
    assert!(!out.join("240312-33UUV-ndvi.tif").exists());
    assert!(queue.job_status(&id).ready);
}

#[test]
fn fully_cloudy_scene_passes_at_100_percent() {
    let dir = tempfile::tempdir().unwrap();
    let scenes = vec![write_scene(dir.path(), "cloudy", (2024, 3, 12), 9)];
    let (_queue, mut worker) = worker(dir.path(), FixedCatalog::new(scenes));

    let mut req = request(&["red"], &[], &[]);
    req.max_cloud_cover = Some(100.0);
    let job = req.validate().unwrap();
    let id = job.id.clone();
    worker.process(job).unwrap();

    let out = dir.path().join("jobs").join(&id).join("out");
    assert!(out.join("240312-33UUV-red.tif").is_file());
}

#[test]
fn truecolor_composite() {
    let dir = tempfile::tempdir().unwrap();
    let scenes = vec![write_scene(dir.path(), "S2A_0305", (2024, 3, 5), 4)];
    let (_queue, mut worker) = worker(dir.path(), FixedCatalog::new(scenes));

    let job = request(&[], &[], &["truecolor"]).validate().unwrap();
    let id = job.id.clone();
    worker.process(job).unwrap();

    let out = dir.path().join("jobs").join(&id).join("out");
    let stack = read_geotiff_stack(out.join("240305-33UUV-truecolor.tif")).unwrap();
    assert_eq!(stack.band_count(), 3);
    assert_eq!(stack.crs().and_then(CRS::epsg), Some(EPSG));

    let (red, green, blue) = (
        stack.band(0).unwrap(),
        stack.band(1).unwrap(),
        stack.band(2).unwrap(),
    );
    assert_relative_eq!(red[[0, 0]], 1000.0);
    assert_relative_eq!(green[[0, 0]], 800.0);
    assert_relative_eq!(blue[[0, 0]], 500.0);

    for band in ["red", "green", "blue"] {
        assert!(!out.join(format!("240305-33UUV-{band}.tif")).exists());
    }
}

#[test]
fn mixed_resolution_index_uses_finest_grid() {
    let dir = tempfile::tempdir().unwrap();
    let scenes = vec![write_scene(dir.path(), "S2A_0305", (2024, 3, 5), 4)];
    let (_queue, mut worker) = worker(dir.path(), FixedCatalog::new(scenes));

    let job = request(&["nir", "rededge1"], &["ndre"], &[]).validate().unwrap();
    let id = job.id.clone();
    worker.process(job).unwrap();

    let out = dir.path().join("jobs").join(&id).join("out");
    let nir = read_geotiff(out.join("240305-33UUV-nir.tif")).unwrap();
    let rededge = read_geotiff(out.join("240305-33UUV-rededge1.tif")).unwrap();
    let ndre = read_geotiff(out.join("240305-33UUV-ndre.tif")).unwrap();

    let (nir_rows, nir_cols) = nir.shape();
    let (re_rows, re_cols) = rededge.shape();
    assert!(nir_rows.abs_diff(2 * re_rows) <= 1);
    assert!(nir_cols.abs_diff(2 * re_cols) <= 1);

    let (rows, cols) = ndre.shape();
    assert_eq!(rows, nir_rows.min(2 * re_rows));
    assert_eq!(cols, nir_cols.min(2 * re_cols));
    assert_eq!(ndre.transform(), nir.transform());
    // (3000 - 1500) / (3000 + 1500)
    assert_relative_eq!(ndre.to_f64().get(0, 0).unwrap(), 1.0 / 3.0, epsilon = 1e-12);
}

#[test]
fn catalog_failure_creates_no_directory() {
    let dir = tempfile::tempdir().unwrap();
    let (queue, mut worker) = worker(dir.path(), FixedCatalog::unreachable());

    let job = request(&["red"], &[], &[]).validate().unwrap();
    let id = job.id.clone();
    let err = worker.process(job).unwrap_err();

    assert!(matches!(err, JobError::SourceUnavailable(_)));
    assert!(!dir.path().join("jobs").join(&id).exists());
    assert_eq!(
        queue.job_status(&id),
        JobStatus { ready: false, processing: false, percentage: None }
    );
}

#[test]
fn bbox_outside_scene_aborts_job() {
    let dir = tempfile::tempdir().unwrap();
    let scenes = vec![write_scene(dir.path(), "S2A_0305", (2024, 3, 5), 4)];
    let (queue, mut worker) = worker(dir.path(), FixedCatalog::new(scenes));

    let mut req = request(&["red"], &[], &[]);
    req.bbox = [14.5, 50.0, 14.6, 50.1];
    let job = req.validate().unwrap();
    let id = job.id.clone();

    assert!(matches!(worker.process(job), Err(JobError::EmptyWindow)));
    // The partial directory stays, without an archive
    let job_dir = dir.path().join("jobs").join(&id);
    assert!(job_dir.join(format!("{id}.txt")).is_file());
    assert!(!queue.job_status(&id).ready);
}

#[test]
fn failed_job_does_not_stop_the_worker() {
    let dir = tempfile::tempdir().unwrap();
    let mut broken = write_scene(dir.path(), "broken", (2024, 3, 5), 4);
    broken.assets.remove("nir");
    let good = write_scene(dir.path(), "good", (2024, 3, 12), 4);

    let (queue, worker) = worker(dir.path(), FixedCatalog::new(vec![good, broken]));

    // The first job needs nir from every scene and fails on the second one
    let failing = queue.submit(&request(&["nir"], &[], &[])).unwrap();
    let passing = queue.submit(&request(&["red"], &[], &[])).unwrap();
    let waiting: Vec<String> = queue.peek_queue().into_iter().map(|j| j.id).collect();
    assert_eq!(waiting, vec![failing.clone(), passing.clone()]);
    queue.close();

    worker.spawn().unwrap().join().unwrap();

    assert!(!queue.job_status(&failing).ready);
    assert!(queue.job_status(&passing).ready);
    assert_eq!(queue.queue_length(), 0);
    assert_eq!(queue.current_job_id(), None);

    // Output of the scene processed before the failure is kept
    let partial = dir.path().join("jobs").join(&failing).join("out");
    assert!(partial.join("240312-33UUV-nir.tif").is_file());
}
