//! Limits and error types shared by the sandbox and its host.
//!
//! These types describe what the isolated context is allowed to consume and
//! how failures surface on the host side.

use serde::{Deserialize, Serialize};

/// Resource limits for one load of the isolated context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeLimits {
    /// Largest script block that will be evaluated (default: 1MB)
    pub max_script_bytes: usize,
    /// Loop iterations allowed per evaluation before the engine throws
    pub loop_iteration_limit: u64,
    /// Maximum call depth inside the engine
    pub recursion_limit: usize,
    /// Deepest bracket nesting a script block may contain (default: 128)
    ///
    /// The engine's parser recurses once per level; deeper blocks are
    /// rejected before they reach it.
    pub max_nesting_depth: usize,
    /// Timer callbacks fired after load before the run stops (default: 1000)
    pub max_timer_callbacks: usize,
    /// Timers scheduled further out than this are discarded (default: 60 seconds)
    pub max_timer_delay_ms: u64,
}

impl Default for RuntimeLimits {
    fn default() -> Self {
        Self {
            max_script_bytes: 1024 * 1024,   // 1MB
            loop_iteration_limit: 10_000_000,
            recursion_limit: 512,
            max_nesting_depth: 128,
            max_timer_callbacks: 1000,
            max_timer_delay_ms: 60_000,      // 60 seconds
        }
    }
}

/// Error types for sandbox operations
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("A message listener is already mounted")]
    ListenerAlreadyMounted,

    #[error("Failed to spawn execution thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Script block too large: {size} > {limit} bytes")]
    ScriptTooLarge { size: usize, limit: usize },

    #[error("Script block nested too deeply: {depth} > {limit} levels")]
    NestingTooDeep { depth: usize, limit: usize },

    #[error("Engine error: {0}")]
    Engine(String),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;
