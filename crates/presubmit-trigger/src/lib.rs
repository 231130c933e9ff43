//! Presubmit definitions and review command recognition.
//!
//! Presubmit definitions are loaded from TOML, defaulted, validated and have
//! their trigger patterns compiled exactly once. A definition that fails to
//! compile is a configuration error surfaced before any event is handled.

mod config;
mod presubmit;

pub use config::{ConfigError, PresubmitConfig};
pub use presubmit::{compile_presubmits, Presubmit, PresubmitSpec};

use regex_lite::Regex;
use std::sync::OnceLock;

/// Pattern recognising a `/skip` command on its own line.
pub const SKIP_COMMAND_PATTERN: &str = r"(?mi)^/skip\s*$";

/// Description posted on contexts resolved by a skip command.
pub const SKIPPED_DESCRIPTION: &str = "Skipped";

/// Default trigger for a job: `/test <name>` anywhere in a line of `/test` targets.
pub fn default_trigger_for(name: &str) -> String {
    format!(r"(?m)^/test (?:.*? )?{}(?: .*?)?$", regex_lite::escape(name))
}

/// Default command a reviewer types to re-run a job.
pub fn default_rerun_command_for(name: &str) -> String {
    format!("/test {}", name)
}

/// Returns true if the comment body contains a skip command.
pub fn is_skip_command(body: &str) -> bool {
    static SKIP_RE: OnceLock<Regex> = OnceLock::new();
    SKIP_RE
        .get_or_init(|| Regex::new(SKIP_COMMAND_PATTERN).expect("skip command pattern is valid"))
        .is_match(body)
}
