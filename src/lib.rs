//! Presubmit Lifecycle - supersession and skip handling for presubmit jobs
//!
//! This crate keeps the presubmit results of a change under review in line
//! with the latest intent: superseded runs of the same job are aborted, and
//! `/skip` comments resolve failing or pending optional checks.

pub mod abort;
pub mod config;
pub mod host;
pub mod mock;
pub mod skip;
pub mod store;

pub use abort::{CleanupError, JobAborter, TerminationReport};
pub use config::{AbortSettings, EffectiveConfig, LifecycleConfig, LifecycleConfigError, SkipSettings};
pub use host::{HostClient, HostError};
pub use skip::{contexts_to_skip, is_skip_request, SkipError, SkipOutcome, SkipResolver};
pub use store::{FileJobStore, JobStore, MemoryJobStore, StoreError};

pub use presubmit_trigger::{ConfigError, Presubmit, PresubmitConfig, PresubmitSpec};
pub use presubmit_types::{
    CommentAction, CommentEvent, IssueState, Job, JobIdentifier, JobState, JobType, PullRequest, Repo,
    Status, StatusState,
};
