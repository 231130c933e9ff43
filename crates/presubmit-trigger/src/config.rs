//! Presubmit configuration (`presubmits.toml`)
//!
//! Presubmits are grouped by repository:
//!
//! ```toml
//! [[presubmits."org/repo"]]
//! name = "unit"
//!
//! [[presubmits."org/repo"]]
//! name = "e2e"
//! optional = true
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::Path;

use crate::presubmit::{compile_presubmits, Presubmit, PresubmitSpec};

/// Error types for config operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid trigger for presubmit {name} ({pattern}): {message}")]
    InvalidTrigger {
        name: String,
        pattern: String,
        message: String,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawPresubmitConfig {
    #[serde(default)]
    presubmits: BTreeMap<String, Vec<PresubmitSpec>>,
}

/// Compiled presubmits for every configured repository
#[derive(Debug, Clone, Default)]
pub struct PresubmitConfig {
    presubmits: BTreeMap<String, Vec<Presubmit>>,
}

impl PresubmitConfig {
    /// Load and compile config from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_str(&contents)
    }

    /// Parse and compile config from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        let raw: RawPresubmitConfig = toml::from_str(s)?;
        Self::from_specs(raw.presubmits)
    }

    /// Compile already-parsed specs keyed by `org/repo`
    pub fn from_specs(specs: BTreeMap<String, Vec<PresubmitSpec>>) -> Result<Self, ConfigError> {
        let mut presubmits = BTreeMap::new();
        for (repo, repo_specs) in specs {
            Self::validate_repo(&repo, &repo_specs)?;
            presubmits.insert(repo, compile_presubmits(&repo_specs)?);
        }
        Ok(Self { presubmits })
    }

    /// Presubmits configured for a repository; empty if none
    pub fn for_repo(&self, org: &str, repo: &str) -> &[Presubmit] {
        self.presubmits
            .get(&format!("{}/{}", org, repo))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Configured repositories as `org/repo`
    pub fn repos(&self) -> impl Iterator<Item = &str> {
        self.presubmits.keys().map(String::as_str)
    }

    fn validate_repo(repo: &str, specs: &[PresubmitSpec]) -> Result<(), ConfigError> {
        match repo.split_once('/') {
            Some((org, name)) if !org.is_empty() && !name.is_empty() && !name.contains('/') => {}
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "Repository key must be 'org/repo', got {:?}",
                    repo
                )))
            }
        }

        let mut names = HashSet::new();
        let mut contexts = HashSet::new();
        for spec in specs {
            if !names.insert(spec.name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate presubmit {} in {}",
                    spec.name, repo
                )));
            }
            let context = spec.context.as_deref().unwrap_or(&spec.name);
            if !contexts.insert(context) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate context {} in {}",
                    context, repo
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[[presubmits."org/repo"]]
name = "unit"

[[presubmits."org/repo"]]
name = "e2e"
context = "ci/e2e"
optional = true
trigger = '(?m)^/test (?:.*? )?e2e(?: .*?)?$'
rerun_command = "/test e2e"

[[presubmits."org/other"]]
name = "lint"
always_run = true
"#;

    #[test]
    fn test_parse_sample() {
        let config = PresubmitConfig::from_str(SAMPLE).unwrap();
        let presubmits = config.for_repo("org", "repo");
        assert_eq!(presubmits.len(), 2);
        assert_eq!(presubmits[0].context(), "unit");
        assert!(!presubmits[0].is_optional());
        assert_eq!(presubmits[1].context(), "ci/e2e");
        assert!(presubmits[1].is_optional());
        assert!(config.for_repo("org", "other")[0].always_run());
    }

    #[test]
    fn test_unknown_repo_is_empty() {
        let config = PresubmitConfig::from_str(SAMPLE).unwrap();
        assert!(config.for_repo("someone", "else").is_empty());
        assert_eq!(config.repos().count(), 2);
    }

    #[test]
    fn test_empty_config() {
        let config = PresubmitConfig::from_str("").unwrap();
        assert_eq!(config.repos().count(), 0);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let toml = r#"
[[presubmits."org/repo"]]
name = "unit"

[[presubmits."org/repo"]]
name = "unit"
context = "other"
"#;
        let err = PresubmitConfig::from_str(toml).unwrap_err();
        assert!(err.to_string().contains("Duplicate presubmit"));
    }

    #[test]
    fn test_duplicate_contexts_rejected() {
        let toml = r#"
[[presubmits."org/repo"]]
name = "unit"
context = "ci"

[[presubmits."org/repo"]]
name = "e2e"
context = "ci"
"#;
        let err = PresubmitConfig::from_str(toml).unwrap_err();
        assert!(err.to_string().contains("Duplicate context"));
    }

    #[test]
    fn test_bad_repo_key_rejected() {
        let toml = r#"
[[presubmits."just-a-name"]]
name = "unit"
"#;
        assert!(matches!(
            PresubmitConfig::from_str(toml),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_bad_trigger_is_config_error() {
        let toml = r#"
[[presubmits."org/repo"]]
name = "unit"
trigger = "(?m)^/test (unit"
rerun_command = "/test unit"
"#;
        assert!(matches!(
            PresubmitConfig::from_str(toml),
            Err(ConfigError::InvalidTrigger { .. })
        ));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            PresubmitConfig::from_str("presubmits = 3"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = PresubmitConfig::from_file(file.path()).unwrap();
        assert_eq!(config.for_repo("org", "repo").len(), 2);
    }

    #[test]
    fn test_missing_file() {
        let result = PresubmitConfig::from_file(Path::new("/nonexistent/presubmits.toml"));
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }
}
