//! Status contexts posted against a commit.

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a status context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Success,
    Failure,
    Pending,
    Error,
}

impl fmt::Display for StatusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Pending => write!(f, "pending"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A named check result on a commit.
///
/// The host keeps at most one status per (commit, context); a new post for
/// the same context overwrites the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub context: String,
    pub state: StatusState,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_url: Option<String>,
}

impl Status {
    /// Create a status without description or link.
    pub fn new(context: impl Into<String>, state: StatusState) -> Self {
        Self {
            context: context.into(),
            state,
            description: String::new(),
            target_url: None,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
