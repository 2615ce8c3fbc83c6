// ABOUTME: Executor module - deadline-bounded task execution.
// ABOUTME: Cooperative cancellation, status tracking, and failure unwrapping.

mod status;
mod timeout_executor;
mod unwrap;

pub use status::TaskStatus;
pub use timeout_executor::{ExecutorStats, TaskHandle, TimeoutExecutor};
pub use unwrap::{InvocationError, unwrap_cause};
