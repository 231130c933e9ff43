//! Failure injection for the fake host
//!
//! Failures are configured per operation, optionally narrowed to one target
//! (the status context for `CreateStatus`).

use std::collections::HashMap;

use crate::host::HostError;

/// Host operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOperation {
    GetPullRequest,
    ListStatuses,
    CreateStatus,
    CreateComment,
    IsTrusted,
}

/// Failure configuration for an operation
#[derive(Debug, Clone)]
pub struct FailureConfig {
    /// Error code reported by the host
    pub error_code: String,
    /// Error message reported by the host
    pub error_message: String,
    /// Number of times to fail before succeeding (None = always fail)
    pub fail_count: Option<u32>,
}

impl FailureConfig {
    /// Create a config that returns an API error
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: code.into(),
            error_message: message.into(),
            fail_count: None,
        }
    }

    /// Set the number of times to fail before succeeding
    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }

    fn to_error(&self) -> HostError {
        HostError::Api {
            code: self.error_code.clone(),
            message: self.error_message.clone(),
        }
    }
}

type FailureKey = (HostOperation, Option<String>);

/// Failure injector for the fake host
#[derive(Debug, Default)]
pub struct FailureInjector {
    configs: HashMap<FailureKey, FailureConfig>,
    call_counts: HashMap<FailureKey, u32>,
}

impl FailureInjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every call of `op`
    pub fn inject(&mut self, op: HostOperation, config: FailureConfig) {
        self.insert((op, None), config);
    }

    /// Fail calls of `op` aimed at `target` only
    pub fn inject_for(&mut self, op: HostOperation, target: impl Into<String>, config: FailureConfig) {
        self.insert((op, Some(target.into())), config);
    }

    fn insert(&mut self, key: FailureKey, config: FailureConfig) {
        self.call_counts.insert(key.clone(), 0);
        self.configs.insert(key, config);
    }

    /// Clear all failure injections
    pub fn clear(&mut self) {
        self.configs.clear();
        self.call_counts.clear();
    }

    /// Returns the error to report for this call, if any.
    ///
    /// A target-specific failure takes precedence over an operation-wide one.
    pub fn check(&mut self, op: HostOperation, target: Option<&str>) -> Option<HostError> {
        let specific = target.map(|t| (op, Some(t.to_string())));
        let key = match specific {
            Some(key) if self.configs.contains_key(&key) => key,
            _ => (op, None),
        };

        let config = self.configs.get(&key)?;
        let count = self.call_counts.entry(key).or_insert(0);
        *count += 1;

        match config.fail_count {
            Some(limit) if *count > limit => None,
            _ => Some(config.to_error()),
        }
    }
}
