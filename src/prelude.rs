// ABOUTME: Prelude module - convenient imports for common use cases.
// ABOUTME: Use `use tether::prelude::*;` to get started quickly.

pub use crate::cache::{CacheStats, LruCache};
pub use crate::config::{CacheConfig, ExecutorConfig, PoolConfig, TetherConfig};
pub use crate::error::{CacheError, ConfigError, ExecutorError, PoolError, TetherError};
pub use crate::executor::{
    ExecutorStats, InvocationError, TaskHandle, TaskStatus, TimeoutExecutor, unwrap_cause,
};
pub use crate::pool::{DateFormat, DateFormatPool, PoolGuard, ResourcePool};
pub use tokio_util::sync::CancellationToken;
