//! Configuration loading
//!
//! Hierarchical configuration using figment:
//! - Programmatic defaults
//! - Project YAML files under `.taskmend/`
//! - `TASKMEND_*` environment overrides
//! - Validation into typed `ConfigError`s

pub mod loader;

pub use loader::{ConfigError, ConfigLoader, CONFIG_DIR, ENV_PREFIX};
