//! Presubmit definitions.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::{default_rerun_command_for, default_trigger_for};

/// A presubmit as written in configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresubmitSpec {
    /// Job name
    pub name: String,

    /// Reported status context (defaults to the job name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Optional jobs do not block merge and may be skipped
    #[serde(default)]
    pub optional: bool,

    /// Run on every change without being asked
    #[serde(default)]
    pub always_run: bool,

    /// Trigger pattern over comment bodies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,

    /// Command that re-runs the job; must match `trigger`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rerun_command: Option<String>,
}

/// A presubmit with defaults applied and its trigger compiled.
#[derive(Debug, Clone)]
pub struct Presubmit {
    name: String,
    context: String,
    optional: bool,
    always_run: bool,
    rerun_command: String,
    trigger: Regex,
}

impl Presubmit {
    /// Apply defaults, compile the trigger and check it against the rerun command.
    pub fn compile(spec: &PresubmitSpec) -> Result<Self, ConfigError> {
        if spec.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "presubmit name must not be empty".to_string(),
            ));
        }

        let (pattern, rerun_command) = match (&spec.trigger, &spec.rerun_command) {
            (None, None) => (
                default_trigger_for(&spec.name),
                default_rerun_command_for(&spec.name),
            ),
            (Some(trigger), Some(rerun)) => (trigger.clone(), rerun.clone()),
            (Some(_), None) => {
                return Err(ConfigError::ValidationError(format!(
                    "presubmit {}: trigger set without rerun_command",
                    spec.name
                )))
            }
            (None, Some(_)) => {
                return Err(ConfigError::ValidationError(format!(
                    "presubmit {}: rerun_command set without trigger",
                    spec.name
                )))
            }
        };

        let trigger = Regex::new(&pattern).map_err(|e| ConfigError::InvalidTrigger {
            name: spec.name.clone(),
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;

        if !trigger.is_match(&rerun_command) {
            return Err(ConfigError::ValidationError(format!(
                "presubmit {}: rerun_command {:?} does not match trigger {:?}",
                spec.name, rerun_command, pattern
            )));
        }

        Ok(Self {
            name: spec.name.clone(),
            context: spec.context.clone().unwrap_or_else(|| spec.name.clone()),
            optional: spec.optional,
            always_run: spec.always_run,
            rerun_command,
            trigger,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Status context this job reports to
    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn always_run(&self) -> bool {
        self.always_run
    }

    pub fn rerun_command(&self) -> &str {
        &self.rerun_command
    }

    /// Source of the compiled trigger pattern
    pub fn trigger_pattern(&self) -> &str {
        self.trigger.as_str()
    }

    /// Returns true if the comment body asks for this job to run.
    pub fn trigger_matches(&self, body: &str) -> bool {
        self.trigger.is_match(body)
    }
}

/// Compile a list of presubmit specs, failing on the first bad one.
pub fn compile_presubmits(specs: &[PresubmitSpec]) -> Result<Vec<Presubmit>, ConfigError> {
    specs.iter().map(Presubmit::compile).collect()
}
