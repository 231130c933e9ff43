//! Termination of superseded presubmit runs
//!
//! When a change is updated, new presubmit runs are started while the old
//! ones may still be executing. The aborter scans the known jobs for a change
//! and, for every group of runs of the same job on the same pull request,
//! keeps the most recently started one and aborts the rest.
//!
//! Aborting a run is best-effort on resources and strict on state: a cleanup
//! failure is logged and the run is still marked aborted, while a store
//! failure stops the scan and is returned to the caller.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use presubmit_types::{Job, JobIdentifier, JobType};
use tracing::{debug, info, info_span, warn, Span};

use crate::config::AbortSettings;
use crate::store::{JobStore, StoreError};

/// Failure to release the resources backing a job
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct CleanupError {
    pub message: String,
}

impl CleanupError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// What a termination pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminationReport {
    /// Indices of aborted jobs, in the order they were aborted
    pub aborted: Vec<usize>,
    /// Number of aborted jobs whose cleanup failed
    pub cleanup_failures: usize,
}

impl TerminationReport {
    pub fn aborted_count(&self) -> usize {
        self.aborted.len()
    }
}

/// Aborts presubmit runs that have a newer run of the same job
pub struct JobAborter<S> {
    store: S,
    settings: AbortSettings,
    span: Span,
}

impl<S: JobStore> JobAborter<S> {
    /// Create an aborter logging under `span`
    pub fn new(store: S, span: Span) -> Self {
        Self {
            store,
            settings: AbortSettings::default(),
            span,
        }
    }

    /// Create an aborter with explicit settings
    pub fn with_settings(store: S, settings: AbortSettings, span: Span) -> Self {
        Self {
            store,
            settings,
            span,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Abort every presubmit in `jobs` that has a newer run of the same job.
    ///
    /// Jobs are scanned in order. Completed jobs and non-presubmits are
    /// ignored. Among runs sharing an identity the one with the latest start
    /// time is kept; on equal start times the later entry wins. Each aborted
    /// slot is replaced with the record returned by the store.
    ///
    /// Stops at the first store failure, leaving later jobs untouched.
    pub fn terminate_older_presubmit_jobs<F>(
        &self,
        jobs: &mut [Job],
        mut cleanup: F,
    ) -> Result<TerminationReport, StoreError>
    where
        F: FnMut(&Job) -> Result<(), CleanupError>,
    {
        let _enter = self.span.enter();
        let mut report = TerminationReport::default();

        if !self.settings.enabled {
            debug!(jobs = jobs.len(), "Termination of superseded jobs is disabled");
            return Ok(report);
        }

        let mut retained: HashMap<JobIdentifier, usize> = HashMap::new();

        for index in 0..jobs.len() {
            let job = &jobs[index];
            if job.complete() || job.spec.job_type != JobType::Presubmit {
                continue;
            }

            let Some(id) = job.identifier() else {
                debug!(name = %job.metadata.name, job = %job.spec.job, "Presubmit has no pull request, not deduplicated");
                continue;
            };

            let cancel_index = match retained.entry(id) {
                Entry::Vacant(slot) => {
                    slot.insert(index);
                    continue;
                }
                Entry::Occupied(mut slot) => {
                    let previous = *slot.get();
                    if job.status.start_time < jobs[previous].status.start_time {
                        index
                    } else {
                        slot.insert(index);
                        previous
                    }
                }
            };

            let stored = self.abort_job(&jobs[cancel_index], &mut cleanup, &mut report)?;
            jobs[cancel_index] = stored;
            report.aborted.push(cancel_index);
        }

        Ok(report)
    }

    /// Load the jobs of one pull request from the store and terminate the
    /// superseded ones. Returns the jobs as they stand after the pass.
    pub fn terminate_for_pull<F>(
        &self,
        org: &str,
        repo: &str,
        number: u64,
        cleanup: F,
    ) -> Result<(Vec<Job>, TerminationReport), StoreError>
    where
        F: FnMut(&Job) -> Result<(), CleanupError>,
    {
        let mut jobs = self.store.jobs_for_pull(org, repo, number)?;
        let report = self.terminate_older_presubmit_jobs(&mut jobs, cleanup)?;
        Ok((jobs, report))
    }

    fn abort_job<F>(
        &self,
        job: &Job,
        cleanup: &mut F,
        report: &mut TerminationReport,
    ) -> Result<Job, StoreError>
    where
        F: FnMut(&Job) -> Result<(), CleanupError>,
    {
        let refs = job.spec.refs.as_ref();
        let span = info_span!(
            "abort",
            name = %job.metadata.name,
            job = %job.spec.job,
            job_type = %job.spec.job_type,
            org = refs.map(|r| r.org.as_str()).unwrap_or_default(),
            repo = refs.map(|r| r.repo.as_str()).unwrap_or_default(),
            pr = job.pull_number().unwrap_or_default(),
        );
        let _enter = span.enter();

        if let Err(error) = cleanup(job) {
            warn!(error = %error, "Cannot cleanup underlying resources");
            report.cleanup_failures += 1;
        }

        let mut to_cancel = job.clone();
        let from = to_cancel.abort();
        info!(from = %from, to = %to_cancel.status.state, "Transitioning states");

        self.store.replace_job(&job.metadata.name, to_cancel)
    }
}
