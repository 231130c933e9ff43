//! Code-review host client
//!
//! The narrow surface of the review host the lifecycle needs: pull request
//! lookup, commit statuses, PR comments and the trust check for commands.
//! Status writes are upserts keyed by (commit, context); the last write wins.

use std::sync::Arc;

use presubmit_types::{PullRequest, Status};

/// Errors returned by the review host
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Host API error {code}: {message}")]
    Api { code: String, message: String },

    #[error("Host unavailable: {0}")]
    Unavailable(String),
}

/// Review host operations used by the lifecycle
pub trait HostClient {
    fn get_pull_request(&self, org: &str, repo: &str, number: u64) -> Result<PullRequest, HostError>;

    /// Current status of every context on a commit
    fn list_statuses(&self, org: &str, repo: &str, sha: &str) -> Result<Vec<Status>, HostError>;

    /// Create or overwrite the status for `status.context` on a commit
    fn create_status(&self, org: &str, repo: &str, sha: &str, status: &Status) -> Result<(), HostError>;

    fn create_comment(&self, org: &str, repo: &str, number: u64, body: &str) -> Result<(), HostError>;

    /// Whether `user` may issue commands on the repository
    fn is_trusted(&self, org: &str, repo: &str, user: &str) -> Result<bool, HostError>;
}

impl<T: HostClient + ?Sized> HostClient for &T {
    fn get_pull_request(&self, org: &str, repo: &str, number: u64) -> Result<PullRequest, HostError> {
        (**self).get_pull_request(org, repo, number)
    }

    fn list_statuses(&self, org: &str, repo: &str, sha: &str) -> Result<Vec<Status>, HostError> {
        (**self).list_statuses(org, repo, sha)
    }

    fn create_status(&self, org: &str, repo: &str, sha: &str, status: &Status) -> Result<(), HostError> {
        (**self).create_status(org, repo, sha, status)
    }

    fn create_comment(&self, org: &str, repo: &str, number: u64, body: &str) -> Result<(), HostError> {
        (**self).create_comment(org, repo, number, body)
    }

    fn is_trusted(&self, org: &str, repo: &str, user: &str) -> Result<bool, HostError> {
        (**self).is_trusted(org, repo, user)
    }
}

impl<T: HostClient + ?Sized> HostClient for Arc<T> {
    fn get_pull_request(&self, org: &str, repo: &str, number: u64) -> Result<PullRequest, HostError> {
        (**self).get_pull_request(org, repo, number)
    }

    fn list_statuses(&self, org: &str, repo: &str, sha: &str) -> Result<Vec<Status>, HostError> {
        (**self).list_statuses(org, repo, sha)
    }

    fn create_status(&self, org: &str, repo: &str, sha: &str, status: &Status) -> Result<(), HostError> {
        (**self).create_status(org, repo, sha, status)
    }

    fn create_comment(&self, org: &str, repo: &str, number: u64, body: &str) -> Result<(), HostError> {
        (**self).create_comment(org, repo, number, body)
    }

    fn is_trusted(&self, org: &str, repo: &str, user: &str) -> Result<bool, HostError> {
        (**self).is_trusted(org, repo, user)
    }
}
