//! Job record persistence
//!
//! The lifecycle engines only ever replace records they were handed. A
//! replace succeeds only if the stored record still carries the
//! `resource_version` the caller read; otherwise the store reports a
//! conflict and the caller sees the error unchanged.

mod file;
mod memory;

pub use file::FileJobStore;
pub use memory::MemoryJobStore;

use std::io;
use std::sync::Arc;

use presubmit_types::Job;

/// Errors for job store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Job {0} not found")]
    NotFound(String),

    #[error("Job {0} already exists")]
    AlreadyExists(String),

    #[error("Conflict replacing job {name}: expected version {expected}, stored version {actual}")]
    Conflict {
        name: String,
        expected: u64,
        actual: u64,
    },

    #[error("Invalid job name {0:?}")]
    InvalidName(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Persistence collaborator for job records
pub trait JobStore {
    /// Fetch a single record
    fn get_job(&self, name: &str) -> Result<Job, StoreError>;

    /// All records, ordered by name
    fn list_jobs(&self) -> Result<Vec<Job>, StoreError>;

    /// Replace the record with the given name, returning what was stored.
    fn replace_job(&self, name: &str, job: Job) -> Result<Job, StoreError>;

    /// Records attached to one pull request
    fn jobs_for_pull(&self, org: &str, repo: &str, number: u64) -> Result<Vec<Job>, StoreError> {
        Ok(self
            .list_jobs()?
            .into_iter()
            .filter(|job| {
                job.spec.refs.as_ref().is_some_and(|refs| {
                    refs.org == org
                        && refs.repo == repo
                        && refs.pulls.first().is_some_and(|pull| pull.number == number)
                })
            })
            .collect())
    }
}

impl<T: JobStore + ?Sized> JobStore for &T {
    fn get_job(&self, name: &str) -> Result<Job, StoreError> {
        (**self).get_job(name)
    }

    fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        (**self).list_jobs()
    }

    fn replace_job(&self, name: &str, job: Job) -> Result<Job, StoreError> {
        (**self).replace_job(name, job)
    }
}

impl<T: JobStore + ?Sized> JobStore for Arc<T> {
    fn get_job(&self, name: &str) -> Result<Job, StoreError> {
        (**self).get_job(name)
    }

    fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        (**self).list_jobs()
    }

    fn replace_job(&self, name: &str, job: Job) -> Result<Job, StoreError> {
        (**self).replace_job(name, job)
    }
}

/// Check a replace against the stored version and bump it.
pub(crate) fn next_version(name: &str, stored: &Job, mut incoming: Job) -> Result<Job, StoreError> {
    if incoming.metadata.resource_version != stored.metadata.resource_version {
        return Err(StoreError::Conflict {
            name: name.to_string(),
            expected: incoming.metadata.resource_version,
            actual: stored.metadata.resource_version,
        });
    }
    incoming.metadata.name = name.to_string();
    incoming.metadata.resource_version = stored.metadata.resource_version + 1;
    Ok(incoming)
}
