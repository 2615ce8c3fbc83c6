// ABOUTME: Pool module - reuse of expensive, not-thread-safe helper objects.
// ABOUTME: Contains the generic resource pool and a pooled date formatter.

mod date_format;
mod resource_pool;

pub use date_format::{DateFormat, DateFormatPool};
pub use resource_pool::{PoolGuard, ResourcePool};
