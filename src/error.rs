// ABOUTME: Defines all error types for the tether library using thiserror.
// ABOUTME: Each component has its own error enum, unified under TetherError.

use std::time::Duration;

/// Top-level error type for the tether library.
#[derive(Debug, thiserror::Error)]
pub enum TetherError {
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Executor error: {0}")]
    Executor(#[from] ExecutorError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors from cache configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("Invalid capacity {0}: must be at least 1")]
    InvalidCapacity(usize),
}

/// Errors from resource pool operations.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("Failed to construct pooled instance: {0}")]
    Construction(#[source] anyhow::Error),

    #[error("Invalid format pattern '{0}'")]
    InvalidPattern(String),

    #[error("Failed to parse '{input}': {source}")]
    Parse {
        input: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Ambiguous or nonexistent local time '{0}'")]
    LocalTime(String),

    #[error("Invalid pool configuration: {0}")]
    InvalidConfig(String),
}

/// Errors surfaced by the timeout executor. Exactly one outcome per submission.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("Task timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Task interrupted by caller")]
    Interrupted,

    #[error("Task failed: {0}")]
    TaskFailure(#[source] anyhow::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl ExecutorError {
    /// True for the timeout outcome.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExecutorError::TimedOut(_))
    }

    /// True when the caller cancelled the wait.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, ExecutorError::Interrupted)
    }
}

/// Errors from configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
