// ABOUTME: Configuration module - TOML loading and validation.
// ABOUTME: Parsing and semantic checks are separate steps.

mod schema;

pub use schema::{CacheConfig, ExecutorConfig, PoolConfig, TetherConfig};

use std::path::Path;

use crate::error::ConfigError;

/// Parse and validate configuration from a TOML string.
pub fn from_toml_str(content: &str) -> Result<TetherConfig, ConfigError> {
    let config: TetherConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load(path: &Path) -> Result<TetherConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config = from_toml_str(&content)?;
    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}
