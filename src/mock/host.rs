//! In-memory review host

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use presubmit_types::{IssueState, PullRequest, Status};

use crate::host::{HostClient, HostError};

use super::failure::{FailureConfig, FailureInjector, HostOperation};

/// A status write recorded by the fake host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusWrite {
    pub sha: String,
    pub status: Status,
}

/// A comment recorded by the fake host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedComment {
    pub org: String,
    pub repo: String,
    pub number: u64,
    pub body: String,
}

#[derive(Debug, Default)]
struct FakeHostState {
    pull_requests: HashMap<(String, String, u64), PullRequest>,
    /// Current statuses per commit, in first-posted order
    statuses: HashMap<String, Vec<Status>>,
    writes: Vec<StatusWrite>,
    comments: Vec<PostedComment>,
    trusted: HashSet<String>,
    failures: FailureInjector,
}

/// Review host backed by maps, with failure injection
#[derive(Debug, Default)]
pub struct FakeHost {
    state: Mutex<FakeHostState>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeHostState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register an open pull request with the given head commit
    pub fn add_pull_request(&self, org: &str, repo: &str, number: u64, head_sha: &str) {
        self.lock().pull_requests.insert(
            (org.to_string(), repo.to_string(), number),
            PullRequest {
                number,
                head_sha: head_sha.to_string(),
                base_ref: "main".to_string(),
                state: IssueState::Open,
            },
        );
    }

    /// Seed statuses on a commit without recording them as writes
    pub fn seed_statuses(&self, sha: &str, statuses: impl IntoIterator<Item = Status>) {
        let mut state = self.lock();
        let current = state.statuses.entry(sha.to_string()).or_default();
        for status in statuses {
            upsert(current, status);
        }
    }

    pub fn trust(&self, user: &str) {
        self.lock().trusted.insert(user.to_string());
    }

    /// Fail every call of `op`
    pub fn fail(&self, op: HostOperation, config: FailureConfig) {
        self.lock().failures.inject(op, config);
    }

    /// Fail status writes for one context
    pub fn fail_status_write(&self, context: &str, config: FailureConfig) {
        self.lock()
            .failures
            .inject_for(HostOperation::CreateStatus, context, config);
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    /// Current statuses on a commit
    pub fn statuses(&self, sha: &str) -> Vec<Status> {
        self.lock().statuses.get(sha).cloned().unwrap_or_default()
    }

    /// Successful status writes, in order
    pub fn status_writes(&self) -> Vec<StatusWrite> {
        self.lock().writes.clone()
    }

    /// Posted comments, in order
    pub fn comments(&self) -> Vec<PostedComment> {
        self.lock().comments.clone()
    }
}

fn upsert(statuses: &mut Vec<Status>, status: Status) {
    match statuses.iter_mut().find(|s| s.context == status.context) {
        Some(existing) => *existing = status,
        None => statuses.push(status),
    }
}

impl HostClient for FakeHost {
    fn get_pull_request(&self, org: &str, repo: &str, number: u64) -> Result<PullRequest, HostError> {
        let mut state = self.lock();
        if let Some(err) = state.failures.check(HostOperation::GetPullRequest, None) {
            return Err(err);
        }
        state
            .pull_requests
            .get(&(org.to_string(), repo.to_string(), number))
            .cloned()
            .ok_or_else(|| HostError::NotFound(format!("pull request {}/{}#{}", org, repo, number)))
    }

    fn list_statuses(&self, _org: &str, _repo: &str, sha: &str) -> Result<Vec<Status>, HostError> {
        let mut state = self.lock();
        if let Some(err) = state.failures.check(HostOperation::ListStatuses, None) {
            return Err(err);
        }
        Ok(state.statuses.get(sha).cloned().unwrap_or_default())
    }

    fn create_status(&self, _org: &str, _repo: &str, sha: &str, status: &Status) -> Result<(), HostError> {
        let mut state = self.lock();
        if let Some(err) = state
            .failures
            .check(HostOperation::CreateStatus, Some(&status.context))
        {
            return Err(err);
        }
        upsert(state.statuses.entry(sha.to_string()).or_default(), status.clone());
        state.writes.push(StatusWrite {
            sha: sha.to_string(),
            status: status.clone(),
        });
        Ok(())
    }

    fn create_comment(&self, org: &str, repo: &str, number: u64, body: &str) -> Result<(), HostError> {
        let mut state = self.lock();
        if let Some(err) = state.failures.check(HostOperation::CreateComment, None) {
            return Err(err);
        }
        state.comments.push(PostedComment {
            org: org.to_string(),
            repo: repo.to_string(),
            number,
            body: body.to_string(),
        });
        Ok(())
    }

    fn is_trusted(&self, _org: &str, _repo: &str, user: &str) -> Result<bool, HostError> {
        let mut state = self.lock();
        if let Some(err) = state.failures.check(HostOperation::IsTrusted, None) {
            return Err(err);
        }
        Ok(state.trusted.contains(user))
    }
}
