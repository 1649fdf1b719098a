//! Configuration parsing and management.

use playpen_runtime::RuntimeLimits;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

/// Which posted messages the bridge accepts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginPolicy {
    /// Accept messages from any run, including superseded ones
    #[default]
    Any,
    /// Accept only messages posted by the most recent run
    CurrentRun,
}

/// Playground configuration, as read from `playpen.yml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaygroundConfig {
    /// Empty the log before each run instead of accumulating
    #[serde(default)]
    pub clear_on_run: bool,

    /// Stop a superseded run's pending timers when a new run starts
    #[serde(default)]
    pub cancel_superseded: bool,

    #[serde(default)]
    pub origin_policy: OriginPolicy,

    #[serde(default)]
    pub limits: RuntimeLimits,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            clear_on_run: false,
            cancel_superseded: false,
            origin_policy: OriginPolicy::Any,
            limits: RuntimeLimits::default(),
        }
    }
}

impl PlaygroundConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&contents)
    }

    /// Parse configuration from YAML text
    ///
    /// An empty document yields the defaults.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }
}
