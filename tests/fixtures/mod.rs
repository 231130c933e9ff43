//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use presubmit_lifecycle::Job;

/// Path to the sample presubmit definitions
pub fn presubmits_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/presubmits.toml")
}

/// A fixed instant offset by `secs`
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

/// A pending presubmit on org/repo
pub fn presubmit(name: &str, job: &str, pull: u64, start: i64) -> Job {
    Job::presubmit(name, job, "org", "repo", pull, at(start))
}
