//! In-memory job store
//!
//! Holds records in a mutex-guarded map. Replace failures can be injected
//! per job name to exercise partial-outage paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use presubmit_types::Job;

use super::{next_version, JobStore, StoreError};

#[derive(Debug, Default)]
struct MemoryState {
    jobs: BTreeMap<String, Job>,
    /// Injected replace failures by job name
    failures: HashMap<String, String>,
    replace_calls: usize,
}

/// Job store backed by a map
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    state: Mutex<MemoryState>,
}

impl MemoryJobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with records
    pub fn with_jobs(jobs: impl IntoIterator<Item = Job>) -> Result<Self, StoreError> {
        let store = Self::new();
        for job in jobs {
            store.create_job(job)?;
        }
        Ok(store)
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panic while holding the lock leaves the map consistent; keep going.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Insert a new record, returning it with its first version
    pub fn create_job(&self, mut job: Job) -> Result<Job, StoreError> {
        let mut state = self.lock();
        let name = job.metadata.name.clone();
        if state.jobs.contains_key(&name) {
            return Err(StoreError::AlreadyExists(name));
        }
        job.metadata.resource_version = 1;
        state.jobs.insert(name, job.clone());
        Ok(job)
    }

    /// Make every replace of `name` fail with `message`
    pub fn inject_replace_failure(&self, name: impl Into<String>, message: impl Into<String>) {
        self.lock().failures.insert(name.into(), message.into());
    }

    /// Clear all injected failures
    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Number of replace calls made so far, including failed ones
    pub fn replace_calls(&self) -> usize {
        self.lock().replace_calls
    }

    /// Bump a record's version as if another writer had updated it
    pub fn touch(&self, name: &str) -> Result<Job, StoreError> {
        let mut state = self.lock();
        let job = state
            .jobs
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        job.metadata.resource_version += 1;
        Ok(job.clone())
    }
}

impl JobStore for MemoryJobStore {
    fn get_job(&self, name: &str) -> Result<Job, StoreError> {
        self.lock()
            .jobs
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    fn list_jobs(&self) -> Result<Vec<Job>, StoreError> {
        Ok(self.lock().jobs.values().cloned().collect())
    }

    fn replace_job(&self, name: &str, job: Job) -> Result<Job, StoreError> {
        let mut state = self.lock();
        state.replace_calls += 1;

        if let Some(message) = state.failures.get(name) {
            return Err(StoreError::Unavailable(message.clone()));
        }

        let stored = state
            .jobs
            .get(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        let updated = next_version(name, stored, job)?;
        state.jobs.insert(name.to_string(), updated.clone());
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use presubmit_types::JobState;

    fn job(name: &str) -> Job {
        Job::presubmit(name, "unit", "org", "repo", 1, Utc::now())
    }

    #[test]
    fn test_create_assigns_first_version() {
        let store = MemoryJobStore::new();
        let created = store.create_job(job("a")).unwrap();
        assert_eq!(created.metadata.resource_version, 1);
        assert!(matches!(
            store.create_job(job("a")),
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn test_replace_bumps_version() {
        let store = MemoryJobStore::with_jobs([job("a")]).unwrap();
        let mut current = store.get_job("a").unwrap();
        current.status.state = JobState::Success;

        let stored = store.replace_job("a", current).unwrap();
        assert_eq!(stored.metadata.resource_version, 2);
        assert_eq!(store.get_job("a").unwrap().status.state, JobState::Success);
    }

    #[test]
    fn test_replace_stale_version_conflicts() {
        let store = MemoryJobStore::with_jobs([job("a")]).unwrap();
        let stale = store.get_job("a").unwrap();
        store.touch("a").unwrap();

        let err = store.replace_job("a", stale).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Conflict { expected: 1, actual: 2, .. }
        ));
    }

    #[test]
    fn test_replace_missing_job() {
        let store = MemoryJobStore::new();
        assert!(matches!(
            store.replace_job("ghost", job("ghost")),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_injected_failure() {
        let store = MemoryJobStore::with_jobs([job("a")]).unwrap();
        store.inject_replace_failure("a", "etcd timeout");
        let current = store.get_job("a").unwrap();

        let err = store.replace_job("a", current.clone()).unwrap_err();
        assert!(err.to_string().contains("etcd timeout"));
        assert_eq!(store.replace_calls(), 1);

        store.clear_failures();
        assert!(store.replace_job("a", current).is_ok());
    }

    #[test]
    fn test_jobs_for_pull() {
        let other = Job::presubmit("b", "unit", "org", "repo", 2, Utc::now());
        let store = MemoryJobStore::with_jobs([job("a"), other]).unwrap();
        let jobs = store.jobs_for_pull("org", "repo", 1).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name(), "a");
    }
}
