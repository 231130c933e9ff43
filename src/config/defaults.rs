//! Built-in lifecycle settings (layer 1)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Termination engine settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AbortSettings {
    /// Abort superseded presubmits (default: true)
    pub enabled: bool,
}

impl Default for AbortSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Skip resolver settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SkipSettings {
    /// Only act on `/skip` from trusted users (default: false)
    pub require_trusted_user: bool,

    /// Explain host failures in a PR comment (default: true)
    pub comment_on_failure: bool,
}

impl Default for SkipSettings {
    fn default() -> Self {
        Self {
            require_trusted_user: false,
            comment_on_failure: true,
        }
    }
}

/// Typed lifecycle configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LifecycleConfig {
    pub abort: AbortSettings,
    pub skip: SkipSettings,

    /// Path to the presubmit definitions (presubmits.toml)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presubmits: Option<PathBuf>,
}

impl LifecycleConfig {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "abort": {
                "enabled": self.abort.enabled,
            },
            "skip": {
                "require_trusted_user": self.skip.require_trusted_user,
                "comment_on_failure": self.skip.comment_on_failure,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LifecycleConfig::default();
        assert!(config.abort.enabled);
        assert!(!config.skip.require_trusted_user);
        assert!(config.skip.comment_on_failure);
        assert!(config.presubmits.is_none());
    }

    #[test]
    fn test_to_value_round_trips() {
        let value = LifecycleConfig::default().to_value();
        assert_eq!(value["abort"]["enabled"], true);
        let parsed: LifecycleConfig = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, LifecycleConfig::default());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let value = serde_json::json!({"skip": {"requre_trusted_user": true}});
        assert!(serde_json::from_value::<LifecycleConfig>(value).is_err());
    }
}
