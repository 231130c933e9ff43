//! Code-review events and pull requests.

use serde::{Deserialize, Serialize};

/// Repository a comment was made on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repo {
    pub owner: String,
    pub name: String,
}

impl Repo {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Open/closed state of the issue or pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Open,
    Closed,
}

/// What happened to the comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentAction {
    Created,
    Edited,
    Deleted,
}

/// A comment on an issue or pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentEvent {
    pub is_pr: bool,
    pub issue_state: IssueState,
    pub action: CommentAction,
    pub body: String,
    pub number: u64,
    pub repo: Repo,

    /// Login of the comment author
    #[serde(default)]
    pub user: String,

    /// Head commit of the pull request, when the ingester already resolved it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_sha: Option<String>,
}

impl CommentEvent {
    /// A freshly created comment on an open pull request.
    pub fn pr_comment(repo: Repo, number: u64, body: impl Into<String>) -> Self {
        Self {
            is_pr: true,
            issue_state: IssueState::Open,
            action: CommentAction::Created,
            body: body.into(),
            number,
            repo,
            user: String::new(),
            head_sha: None,
        }
    }
}

/// Pull request as reported by the review host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub head_sha: String,
    #[serde(default)]
    pub base_ref: String,
    pub state: IssueState,
}
