// ABOUTME: Configuration schema for the cache, pool, and executor.
// ABOUTME: All fields have defaults so partial TOML documents are accepted.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TetherConfig {
    pub cache: CacheConfig,
    pub pool: PoolConfig,
    pub executor: ExecutorConfig,
}

impl TetherConfig {
    /// Semantic checks that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()?;
        self.pool.validate()?;
        self.executor.validate()
    }
}

/// Bounded LRU cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of entries. Must be at least 1.
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid(
                "cache.capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resource pool settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Instances constructed up front.
    pub warm_instances: usize,

    /// Idle instances kept on release; surplus ones are dropped.
    /// `None` keeps everything.
    pub max_idle: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            warm_instances: 1,
            max_idle: None,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(max_idle) = self.max_idle {
            if max_idle == 0 {
                return Err(ConfigError::Invalid(
                    "pool.max_idle must be at least 1 when set".to_string(),
                ));
            }
            if self.warm_instances > max_idle {
                return Err(ConfigError::Invalid(format!(
                    "pool.warm_instances ({}) must not exceed pool.max_idle ({})",
                    self.warm_instances, max_idle
                )));
            }
        }
        Ok(())
    }
}

/// Timeout executor settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Deadline used by `run_default`, in milliseconds.
    pub default_deadline_ms: u64,

    /// Upper bound on tasks running at once. `None` means unbounded.
    pub max_concurrent: Option<usize>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_deadline_ms: 30_000,
            max_concurrent: None,
        }
    }
}

impl ExecutorConfig {
    pub fn default_deadline(&self) -> Duration {
        Duration::from_millis(self.default_deadline_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_deadline_ms == 0 {
            return Err(ConfigError::Invalid(
                "executor.default_deadline_ms must be greater than 0".to_string(),
            ));
        }
        if self.max_concurrent == Some(0) {
            return Err(ConfigError::Invalid(
                "executor.max_concurrent must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}
