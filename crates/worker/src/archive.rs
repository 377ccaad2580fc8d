//! Job archive
//!
//! The job directory is zipped next to itself as `<root>/<id>.zip` and the
//! archive is then moved into the directory as `<root>/<id>/<id>.zip`.
//! Entry names are relative to the job directory and use `/` separators.

use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use tracing::info;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{JobError, Result};

pub fn archive_job(output_root: &Path, job_id: &str) -> Result<PathBuf> {
    let job_dir = output_root.join(job_id);
    let staging = output_root.join(format!("{job_id}.zip"));
    let entries = zip_dir(&job_dir, &staging)?;

    let archive = job_dir.join(format!("{job_id}.zip"));
    fs::rename(&staging, &archive)?;
    info!(job_id, path = %archive.display(), entries, "job archived");
    Ok(archive)
}

/// Write every file and directory under `dir` into a new zip at `dest`.
fn zip_dir(dir: &Path, dest: &Path) -> Result<usize> {
    let mut zip = ZipWriter::new(BufWriter::new(File::create(dest)?));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = 0;
    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let name = entry_name(dir, entry.path())?;
        if entry.file_type().is_dir() {
            zip.add_directory(name, options)?;
        } else {
            zip.start_file(name, options)?;
            io::copy(&mut File::open(entry.path())?, &mut zip)?;
        }
        entries += 1;
    }

    zip.finish()?;
    Ok(entries)
}

fn entry_name(root: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|e| JobError::Archive(format!("{}: {e}", path.display())))?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    Ok(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    #[test]
    fn archive_moves_into_job_dir() {
        let root = tempfile::tempdir().unwrap();
        let job_dir = root.path().join("job-1");
        fs::create_dir_all(job_dir.join("out")).unwrap();
        fs::write(job_dir.join("job-1.txt"), "{}").unwrap();
        fs::write(job_dir.join("out").join("240305-red.tif"), b"II*\0").unwrap();

        let archive = archive_job(root.path(), "job-1").unwrap();
        assert_eq!(archive, job_dir.join("job-1.zip"));
        assert!(!root.path().join("job-1.zip").exists());

        let mut zip = ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let mut names: Vec<String> = zip.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["job-1.txt", "out/", "out/240305-red.tif"]);

        let mut contents = Vec::new();
        zip.by_name("out/240305-red.tif")
            .unwrap()
            .read_to_end(&mut contents)
            .unwrap();
        assert_eq!(contents, b"II*\0");
    }

    #[test]
    fn missing_job_dir_fails() {
        let root = tempfile::tempdir().unwrap();
        assert!(archive_job(root.path(), "nope").is_err());
    }
}
