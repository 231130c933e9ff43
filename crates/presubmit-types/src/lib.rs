//! Presubmit Lifecycle Types
//!
//! Defines the records exchanged between the lifecycle engines and their
//! collaborators: job records, status contexts, pull requests and review
//! comment events.

pub mod event;
pub mod job;
pub mod status;

pub use event::{CommentAction, CommentEvent, IssueState, PullRequest, Repo};
pub use job::{Job, JobIdentifier, JobSpec, JobState, JobStatus, JobType, ObjectMeta, Pull, Refs};
pub use status::{Status, StatusState};
