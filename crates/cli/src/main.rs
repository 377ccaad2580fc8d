//! s2batch CLI - batch Sentinel-2 subsets, indices and composites

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use s2batch_algorithms::{Band, Composite, SpectralIndex};
use s2batch_cloud::{save_subset, BBox, CogSource};
use s2batch_core::io::{inspect_geotiff, read_geotiff, read_geotiff_stack};
use s2batch_worker::{
    files_per_scene, Catalog, JobQueue, JobRequest, SceneQuery, StacSceneCatalog, Worker,
    WorkerConfig,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "s2batch")]
#[command(author, version, about = "Batch Sentinel-2 subsets, spectral indices and composites", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding one sub-directory per job
    #[arg(long, global = true, env = "S2BATCH_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// STAC catalog: "earth-search" or a STAC API root URL
    #[arg(long, global = true, env = "S2BATCH_CATALOG", default_value = "earth-search")]
    catalog: String,

    /// STAC collection to search
    #[arg(long, global = true, env = "S2BATCH_COLLECTION", default_value = "sentinel-2-l2a")]
    collection: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Queue job requests (JSON files) and process them in order
    Run {
        /// Job request files
        #[arg(required = true)]
        requests: Vec<PathBuf>,
    },
    /// Count matching scenes and the files a request would produce
    Check {
        /// Job request file
        request: PathBuf,
    },
    /// Report whether a job's archive is ready
    Status {
        /// Job id, e.g. job-2024-03-05-10-17-46-1a2b3c4d
        job_id: String,
    },
    /// Cut one band to a WGS84 bbox and save it as GeoTIFF
    Subset {
        /// Path or URL of a single-band GeoTIFF / COG
        input: String,
        /// Output file
        output: PathBuf,
        /// min_lon,min_lat,max_lon,max_lat
        #[arg(short, long, allow_hyphen_values = true)]
        bbox: String,
    },
    /// Show information about a GeoTIFF file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// List band, index and composite names accepted in requests
    Bands,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(100);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb
}

fn read_request(path: &Path) -> Result<JobRequest> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read request {}", path.display()))?;
    JobRequest::from_json(&json).with_context(|| format!("Invalid request {}", path.display()))
}

fn parse_bbox(s: &str) -> Result<BBox> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("bbox values must be numbers")?;
    match values.as_slice() {
        &[min_x, min_y, max_x, max_y] if min_x < max_x && min_y < max_y => {
            Ok(BBox::new(min_x, min_y, max_x, max_y))
        }
        [_, _, _, _] => anyhow::bail!("bbox must satisfy min < max, got {}", s),
        _ => anyhow::bail!("bbox needs 4 values (min_lon,min_lat,max_lon,max_lat), got: {}", s),
    }
}

fn done(name: &str, path: &Path, elapsed: Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Commands ───────────────────────────────────────────────────────────

fn run(config: WorkerConfig, requests: &[PathBuf]) -> Result<()> {
    let catalog = StacSceneCatalog::new(&config).context("Failed to create catalog client")?;
    let queue = Arc::new(JobQueue::new(config));

    let mut jobs = Vec::with_capacity(requests.len());
    for path in requests {
        let request = read_request(path)?;
        let job_id = queue
            .submit(&request)
            .with_context(|| format!("Rejected request {}", path.display()))?;
        println!("{} -> {}", path.display(), job_id);
        jobs.push(job_id);
    }
    queue.close();

    let start = Instant::now();
    let handle = Worker::new(queue.clone(), Arc::new(catalog), Arc::new(CogSource::default()))
        .spawn()
        .context("Failed to start worker")?;

    let pb = progress_bar();
    while !handle.is_finished() {
        match queue.current_job_id() {
            Some(id) => {
                pb.set_position(queue.current_percentage().unwrap_or(0) as u64);
                pb.set_message(format!("{} ({} queued)", id, queue.queue_length()));
            }
            None => pb.set_message("waiting"),
        }
        pb.tick();
        std::thread::sleep(Duration::from_millis(200));
    }
    pb.finish_and_clear();
    if handle.join().is_err() {
        anyhow::bail!("worker thread panicked");
    }

    let mut failed = 0;
    for job_id in &jobs {
        let archive = queue.config().archive_path(job_id);
        if queue.job_status(job_id).ready {
            println!("{}: ready at {}", job_id, archive.display());
        } else {
            println!("{}: failed (see log)", job_id);
            failed += 1;
        }
    }
    println!("  Processing time: {:.2?}", start.elapsed());

    if failed > 0 {
        anyhow::bail!("{} of {} jobs failed", failed, jobs.len());
    }
    Ok(())
}

fn check(config: &WorkerConfig, path: &Path) -> Result<()> {
    let job = read_request(path)?.validate().context("Invalid request")?;
    let catalog = StacSceneCatalog::new(config).context("Failed to create catalog client")?;

    let pb = spinner("Searching catalog...");
    let search = catalog
        .search(&SceneQuery {
            bbox: job.bbox,
            start: job.start,
            end: job.end,
        })
        .context("Catalog search failed")?;
    let matched = match search.matched {
        Some(n) => n,
        None => search.scenes.count() as u64,
    };
    pb.finish_and_clear();

    let per_scene = files_per_scene(&job) as u64;
    println!("Matched scenes: {}", matched);
    println!(
        "Requested {} bands, {} indices and {} composites: {} files per scene",
        job.bands.len(),
        job.indices.len(),
        job.composites.len(),
        per_scene
    );
    println!("Files in total: {}", matched * per_scene);
    Ok(())
}

fn info_cmd(input: &Path) -> Result<()> {
    let pb = spinner("Reading raster...");
    let meta = inspect_geotiff(input).context("Failed to read raster")?;

    println!("File: {}", input.display());
    println!(
        "Dimensions: {} x {} ({} cells), {} band(s) of {}",
        meta.width,
        meta.height,
        meta.width * meta.height,
        meta.bands,
        meta.data_type
    );
    if let Some(gt) = meta.transform {
        let bounds = gt.bounds(meta.width, meta.height);
        println!("Cell size: {}", gt.cell_size());
        println!(
            "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
            bounds.0, bounds.1, bounds.2, bounds.3
        );
    }
    if let Some(crs) = &meta.crs {
        println!("CRS: {}", crs);
    }

    println!("\nStatistics:");
    if meta.bands == 1 {
        let raster = read_geotiff(input).context("Failed to read raster")?.to_f64();
        pb.finish_and_clear();
        let stats = raster.statistics();
        if let (Some(min), Some(max), Some(mean)) = (stats.min, stats.max, stats.mean) {
            println!("  Min: {:.4}", min);
            println!("  Max: {:.4}", max);
            println!("  Mean: {:.4}", mean);
        }
        println!(
            "  Valid cells: {} ({:.1}%)",
            stats.valid_count,
            100.0 * stats.valid_count as f64 / raster.len().max(1) as f64
        );
    } else {
        let stack = read_geotiff_stack(input).context("Failed to read raster")?;
        pb.finish_and_clear();
        for b in 0..stack.band_count() {
            if let Some(band) = stack.band(b) {
                let mean = band.mean().unwrap_or(f64::NAN);
                println!("  Band {}: mean {:.4}", b + 1, mean);
            }
        }
    }
    Ok(())
}

fn bands_cmd() {
    println!("Bands:");
    for band in Band::SPECTRAL.iter().copied().chain([Band::Scl]) {
        println!(
            "  {:<10} {:<4} {:>3} m",
            band.name(),
            band.designation(),
            band.resolution()
        );
    }
    println!("\nIndices:");
    for index in SpectralIndex::ALL {
        let inputs: Vec<&str> = index.bands().iter().map(|b| b.name()).collect();
        println!("  {:<10} {}", index.name(), inputs.join(", "));
    }
    println!("\nComposites:");
    for kind in Composite::ALL {
        let inputs: Vec<&str> = kind.bands().iter().map(|b| b.name()).collect();
        println!("  {:<10} {}", kind.name(), inputs.join(", "));
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    let config = WorkerConfig {
        output_root: cli.output_dir,
        catalog: cli.catalog,
        collection: cli.collection,
        ..WorkerConfig::default()
    };

    match cli.command {
        Commands::Run { requests } => run(config, &requests)?,

        Commands::Check { request } => check(&config, &request)?,

        Commands::Status { job_id } => {
            let queue = JobQueue::new(config);
            let status = queue.job_status(&job_id);
            println!("{}", serde_json::to_string(&status)?);
        }

        Commands::Subset {
            input,
            output,
            bbox,
        } => {
            let bbox = parse_bbox(&bbox)?;
            let start = Instant::now();
            let pb = spinner("Extracting subset...");
            let subset = save_subset(&CogSource::default(), &input, &bbox, &output)
                .context("Failed to extract subset")?;
            pb.finish_and_clear();
            let (rows, cols) = subset.shape();
            info!("Subset: {} x {} {}", cols, rows, subset.data_type());
            done("Subset", &output, start.elapsed());
        }

        Commands::Info { input } => info_cmd(&input)?,

        Commands::Bands => bands_cmd(),
    }

    Ok(())
}
