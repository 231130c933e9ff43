//! Directory-backed job store
//!
//! One `<name>.json` file per record, written atomically (write-then-rename).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use presubmit_types::Job;

use super::{next_version, JobStore, StoreError};

/// Job store keeping each record as a JSON file in a directory
#[derive(Debug)]
pub struct FileJobStore {
    dir: PathBuf,
    /// Serializes read-compare-write within this process
    write_lock: Mutex<()>,
}

impl FileJobStore {
    /// Open a store rooted at `dir`, creating the directory if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Directory holding the records
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Insert a new record, returning it with its first version
    pub fn create_job(&self, mut job: Job) -> Result<Job, StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());
        let path = self.path_for(&job.metadata.name)?;
        if path.exists() {
            return Err(StoreError::AlreadyExists(job.metadata.name));
        }
        job.metadata.resource_version = 1;
        write_atomic(&path, &job)?;
        Ok(job)
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, StoreError> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", name)))
    }

    fn read(&self, name: &str) -> Result<Job, StoreError> {
        let path = self.path_for(name)?;
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&json)?)
    }
}

fn write_atomic(path: &Path, job: &Job) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(job)?;
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, json)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

impl JobStore for FileJobStore {
    fn get_job(&self, name: &str) -> Result<Job, StoreError> {
        self.read(name)
    }

    fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        names.iter().map(|name| self.read(name)).collect()
    }

    fn replace_job(&self, name: &str, job: Job) -> Result<Job, StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());
        let stored = self.read(name)?;
        let updated = next_version(name, &stored, job)?;
        write_atomic(&self.path_for(name)?, &updated)?;
        Ok(updated)
    }
}
