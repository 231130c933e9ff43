//! Job records
//!
//! A job record is one verification run attached to a change. Records are
//! owned by the persistence collaborator; `metadata.resource_version` is the
//! optimistic-concurrency token it checks on replace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of job. Only presubmits are actionable by the lifecycle engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    /// Runs against a proposed change before merge
    Presubmit,
    /// Runs after a change is merged
    Postsubmit,
    /// Runs on a schedule
    Periodic,
    /// Runs against a batch of changes
    Batch,
}

/// Lifecycle state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Created, not yet scheduled
    Triggered,
    /// Scheduled and running
    Pending,
    /// Finished successfully
    Success,
    /// Finished with test failures
    Failure,
    /// Stopped before finishing
    Aborted,
    /// Could not be run
    Error,
}

impl JobState {
    /// Returns true if no further transitions are expected
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Triggered | JobState::Pending)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Triggered => write!(f, "triggered"),
            Self::Pending => write!(f, "pending"),
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Aborted => write!(f, "aborted"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Presubmit => write!(f, "presubmit"),
            Self::Postsubmit => write!(f, "postsubmit"),
            Self::Periodic => write!(f, "periodic"),
            Self::Batch => write!(f, "batch"),
        }
    }
}

/// Storage metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Unique record name used by the store
    pub name: String,

    /// Version token bumped on every successful replace
    #[serde(default)]
    pub resource_version: u64,
}

/// A pull request the job was triggered for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pull {
    pub number: u64,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub sha: String,
}

/// Source references checked out by a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refs {
    pub org: String,
    pub repo: String,
    #[serde(default)]
    pub base_ref: String,
    #[serde(default)]
    pub base_sha: String,
    #[serde(default)]
    pub pulls: Vec<Pull>,
}

/// What the job runs and against which change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Job name from the presubmit definition
    pub job: String,

    #[serde(rename = "type")]
    pub job_type: JobType,

    /// Status context the job reports to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refs: Option<Refs>,
}

/// Observed progress of a job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobStatus {
    pub start_time: DateTime<Utc>,

    /// Set once the job has finished; never cleared
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<DateTime<Utc>>,

    pub state: JobState,

    #[serde(default)]
    pub description: String,
}

/// One verification run attached to a change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    pub metadata: ObjectMeta,
    pub spec: JobSpec,
    pub status: JobStatus,
}

impl Job {
    /// Create a pending presubmit for a single pull request
    pub fn presubmit(
        name: impl Into<String>,
        job: impl Into<String>,
        org: impl Into<String>,
        repo: impl Into<String>,
        pull: u64,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            metadata: ObjectMeta {
                name: name.into(),
                resource_version: 0,
            },
            spec: JobSpec {
                job: job.into(),
                job_type: JobType::Presubmit,
                context: None,
                refs: Some(Refs {
                    org: org.into(),
                    repo: repo.into(),
                    base_ref: String::new(),
                    base_sha: String::new(),
                    pulls: vec![Pull {
                        number: pull,
                        author: String::new(),
                        sha: String::new(),
                    }],
                }),
            },
            status: JobStatus {
                start_time,
                completion_time: None,
                state: JobState::Pending,
                description: String::new(),
            },
        }
    }

    /// Record name used by the store
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Whether the job has finished
    pub fn complete(&self) -> bool {
        self.status.completion_time.is_some()
    }

    /// Mark the job finished. An existing completion time is kept.
    pub fn set_complete(&mut self) {
        if self.status.completion_time.is_none() {
            self.status.completion_time = Some(Utc::now());
        }
    }

    /// Complete the job in the aborted state, returning the state it left
    pub fn abort(&mut self) -> JobState {
        self.set_complete();
        let previous = self.status.state;
        self.status.state = JobState::Aborted;
        previous
    }

    /// First pull request number, if the job targets one
    pub fn pull_number(&self) -> Option<u64> {
        self.spec
            .refs
            .as_ref()
            .and_then(|refs| refs.pulls.first())
            .map(|pull| pull.number)
    }

    /// Identity key for duplicate detection.
    ///
    /// Returns None when the job has no pull request to key on.
    pub fn identifier(&self) -> Option<JobIdentifier> {
        let refs = self.spec.refs.as_ref()?;
        let pull = refs.pulls.first()?;
        Some(JobIdentifier {
            job: self.spec.job.clone(),
            organization: refs.org.clone(),
            repository: refs.repo.clone(),
            pull_request: pull.number,
        })
    }
}

/// The same logical check on the same change
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobIdentifier {
    pub job: String,
    pub organization: String,
    pub repository: String,
    pub pull_request: u64,
}

impl fmt::Display for JobIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{}#{}",
            self.job, self.organization, self.repository, self.pull_request
        )
    }
}
