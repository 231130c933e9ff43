//! Lifecycle configuration
//!
//! Three layers, later ones winning:
//! 1. Built-in defaults
//! 2. Host config (operator-wide settings)
//! 3. Repo config

mod defaults;
mod effective;
mod merge;

pub use defaults::{AbortSettings, LifecycleConfig, SkipSettings};
pub use effective::{ConfigOrigin, ConfigSource, EffectiveConfig, LifecycleConfigError};
pub use merge::{deep_merge, merge_layers};
