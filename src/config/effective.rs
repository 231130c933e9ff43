//! Effective configuration with provenance
//!
//! Records the merged settings together with every file that contributed to
//! them and the SHA-256 of its raw bytes.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::Path;

use presubmit_trigger::PresubmitConfig;

use super::defaults::LifecycleConfig;
use super::merge::merge_layers;

/// Origin of a configuration source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    Builtin,
    Host,
    Repo,
}

/// A contributing config source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 of the raw file bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// Merged configuration and where it came from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub config: Value,
    pub sources: Vec<ConfigSource>,
}

/// Errors loading lifecycle configuration
#[derive(Debug, thiserror::Error)]
pub enum LifecycleConfigError {
    #[error("Failed to read {path}: {source}")]
    Io { path: String, source: io::Error },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid lifecycle settings: {0}")]
    Invalid(#[from] serde_json::Error),

    #[error("Invalid presubmit config: {0}")]
    Presubmits(#[from] presubmit_trigger::ConfigError),
}

impl EffectiveConfig {
    /// Merge built-in defaults, then the host file, then the repo file.
    ///
    /// Missing files are skipped. A relative `presubmits` path is resolved
    /// against the directory of the file that set it.
    pub fn build(
        host_config_path: Option<&Path>,
        repo_config_path: Option<&Path>,
    ) -> Result<Self, LifecycleConfigError> {
        let mut layers = vec![LifecycleConfig::default().to_value()];
        let mut sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }];

        for (origin, path) in [
            (ConfigOrigin::Host, host_config_path),
            (ConfigOrigin::Repo, repo_config_path),
        ] {
            let Some(path) = path.filter(|p| p.exists()) else {
                continue;
            };
            let (value, digest) = Self::load_toml_file(path)?;
            layers.push(value);
            sources.push(ConfigSource {
                origin,
                path: Some(path.to_string_lossy().to_string()),
                digest: Some(digest),
            });
        }

        Ok(Self {
            config: merge_layers(layers),
            sources,
        })
    }

    /// Typed settings
    pub fn settings(&self) -> Result<LifecycleConfig, LifecycleConfigError> {
        Ok(serde_json::from_value(self.config.clone())?)
    }

    /// Load and compile the configured presubmits; empty when none is configured
    pub fn load_presubmits(&self) -> Result<PresubmitConfig, LifecycleConfigError> {
        match self.settings()?.presubmits {
            Some(path) => Ok(PresubmitConfig::from_file(&path)?),
            None => Ok(PresubmitConfig::default()),
        }
    }

    fn load_toml_file(path: &Path) -> Result<(Value, String), LifecycleConfigError> {
        let display = path.to_string_lossy().to_string();
        let bytes = fs::read(path).map_err(|source| LifecycleConfigError::Io {
            path: display.clone(),
            source,
        })?;

        let digest = hex::encode(Sha256::digest(&bytes));

        let contents = String::from_utf8(bytes).map_err(|e| LifecycleConfigError::Parse {
            path: display.clone(),
            message: format!("Invalid UTF-8: {}", e),
        })?;
        let toml_value: toml::Value =
            toml::from_str(&contents).map_err(|e| LifecycleConfigError::Parse {
                path: display.clone(),
                message: e.to_string(),
            })?;

        let mut value = serde_json::to_value(toml_value)?;
        if let (Some(Value::String(presubmits)), Some(dir)) =
            (value.get("presubmits").cloned(), path.parent())
        {
            if Path::new(&presubmits).is_relative() {
                value["presubmits"] = Value::String(dir.join(presubmits).to_string_lossy().to_string());
            }
        }

        Ok((value, digest))
    }

    /// Get a config value by dot-separated path
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.config, |current, part| current.get(part))
    }

    pub fn get_bool(&self, path: &str) -> Option<bool> {
        self.get(path).and_then(Value::as_bool)
    }
}
