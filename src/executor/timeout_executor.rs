// ABOUTME: Runs tasks against a deadline with cooperative cancellation.
// ABOUTME: A supervisor per submission races the worker, the deadline, and caller cancellation.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::status::{StatusCell, TaskStatus};
use super::unwrap::{InvocationError, unwrap_cause};
use crate::config::ExecutorConfig;
use crate::error::ExecutorError;

/// Stand-in expiry for deadlines too large to add to the clock.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Outcome counters since the executor was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorStats {
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub interrupted: u64,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    interrupted: AtomicU64,
}

impl Counters {
    fn record(&self, status: TaskStatus) {
        let counter = match status {
            TaskStatus::Completed => &self.completed,
            TaskStatus::Failed => &self.failed,
            TaskStatus::TimedOut => &self.timed_out,
            TaskStatus::Interrupted => &self.interrupted,
            TaskStatus::Pending | TaskStatus::Running => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> ExecutorStats {
        ExecutorStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            interrupted: self.interrupted.load(Ordering::Relaxed),
        }
    }
}

/// Runs units of work with a deadline.
///
/// Each submission gets its own worker task and a [`CancellationToken`]. If
/// the deadline passes first, the token is cancelled and the caller receives
/// [`ExecutorError::TimedOut`] right away. The executor never waits for the
/// worker to notice.
///
/// # Cancellation is cooperative
///
/// A task that never checks its token keeps running after the caller has
/// been told it timed out, and keeps holding whatever it holds: its tokio
/// worker time, a blocking-pool thread for [`run_blocking`](Self::run_blocking),
/// and a concurrency slot when `max_concurrent` is set. Its result is
/// discarded. Tasks that can run long should poll `token.is_cancelled()` or
/// select on `token.cancelled()`.
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Clone)]
pub struct TimeoutExecutor {
    default_deadline: Duration,
    permits: Option<Arc<Semaphore>>,
    counters: Arc<Counters>,
}

impl Default for TimeoutExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeoutExecutor {
    /// Create an executor with default settings and no concurrency limit.
    pub fn new() -> Self {
        Self {
            default_deadline: ExecutorConfig::default().default_deadline(),
            permits: None,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Create an executor from configuration.
    pub fn with_config(config: &ExecutorConfig) -> Result<Self, ExecutorError> {
        config
            .validate()
            .map_err(|e| ExecutorError::InvalidArgument(e.to_string()))?;

        Ok(Self {
            default_deadline: config.default_deadline(),
            permits: config
                .max_concurrent
                .map(|limit| Arc::new(Semaphore::new(limit))),
            counters: Arc::new(Counters::default()),
        })
    }

    pub fn default_deadline(&self) -> Duration {
        self.default_deadline
    }

    pub fn stats(&self) -> ExecutorStats {
        self.counters.snapshot()
    }

    /// Run `task` and wait for its result, at most until `deadline` elapses.
    ///
    /// The task receives a token that is cancelled on timeout. Errors it
    /// returns come back as [`ExecutorError::TaskFailure`] with invocation
    /// wrappers removed.
    ///
    /// `task` must not block its thread. The deadline is enforced by another
    /// task on the same runtime, and a current-thread runtime cannot poll it
    /// while the body blocks. Synchronous work goes through
    /// [`run_blocking`](Self::run_blocking).
    pub async fn run<F, Fut, T>(&self, deadline: Duration, task: F) -> Result<T, ExecutorError>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        self.run_with_cancel(deadline, task, std::future::pending::<()>())
            .await
    }

    /// Like [`run`](Self::run), using the configured default deadline.
    pub async fn run_default<F, Fut, T>(&self, task: F) -> Result<T, ExecutorError>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        self.run(self.default_deadline, task).await
    }

    /// Run `task` with a deadline, giving up early if `cancel` completes.
    ///
    /// Caller cancellation is passed on to the task's token and reported as
    /// [`ExecutorError::Interrupted`]. Dropping the returned future counts as
    /// caller cancellation too.
    pub async fn run_with_cancel<F, Fut, T, C>(
        &self,
        deadline: Duration,
        task: F,
        cancel: C,
    ) -> Result<T, ExecutorError>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Send + 'static,
        C: Future<Output = ()>,
    {
        let handle = self.spawn(deadline, task);
        let guard = handle.token.clone().drop_guard();
        let result = handle.join_with_cancel(cancel).await;
        guard.disarm();
        result
    }

    /// Run a synchronous closure on the blocking pool with a deadline.
    ///
    /// The deadline holds even if `task` never looks at its token; the
    /// thread is then left running until `task` returns on its own.
    pub async fn run_blocking<F, T>(&self, deadline: Duration, task: F) -> Result<T, ExecutorError>
    where
        F: FnOnce(CancellationToken) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let handle = self.spawn_blocking(deadline, task);
        let guard = handle.token.clone().drop_guard();
        let result = handle.join().await;
        guard.disarm();
        result
    }

    /// Submit `task` without waiting. The deadline starts now.
    pub fn spawn<F, Fut, T>(&self, deadline: Duration, task: F) -> TaskHandle<T>
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let token = CancellationToken::new();
        let status = Arc::new(StatusCell::new());

        let worker = {
            // A child token: the task sees every cancellation, but cancelling
            // it from inside the task does not read as a caller interrupt.
            let token = token.child_token();
            let status = status.clone();
            let permits = self.permits.clone();
            tokio::spawn(async move {
                let _permit = admit(permits, &token, &status).await?;
                task(token).await
            })
        };

        self.supervise(deadline, token, status, worker)
    }

    /// Submit a synchronous closure to the blocking pool without waiting.
    pub fn spawn_blocking<F, T>(&self, deadline: Duration, task: F) -> TaskHandle<T>
    where
        F: FnOnce(CancellationToken) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let token = CancellationToken::new();
        let status = Arc::new(StatusCell::new());

        let worker = {
            let token = token.child_token();
            let status = status.clone();
            let permits = self.permits.clone();
            tokio::spawn(async move {
                let _permit = admit(permits, &token, &status).await?;
                match tokio::task::spawn_blocking(move || task(token)).await {
                    Ok(result) => result,
                    Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                    Err(e) => Err(InvocationError::new(e).into()),
                }
            })
        };

        self.supervise(deadline, token, status, worker)
    }

    fn supervise<T>(
        &self,
        deadline: Duration,
        token: CancellationToken,
        status: Arc<StatusCell>,
        mut worker: JoinHandle<anyhow::Result<T>>,
    ) -> TaskHandle<T>
    where
        T: Send + 'static,
    {
        let submitted_at = Instant::now();
        let expires_at = submitted_at
            .checked_add(deadline)
            .unwrap_or_else(|| submitted_at + FAR_FUTURE);
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(?deadline, "task submitted");

        let outcome = {
            let token = token.clone();
            let status = status.clone();
            let counters = self.counters.clone();
            tokio::spawn(async move {
                let result = tokio::select! {
                    biased;
                    () = token.cancelled() => Err(ExecutorError::Interrupted),
                    joined = &mut worker => match joined {
                        Ok(Ok(value)) => Ok(value),
                        Ok(Err(err)) => Err(ExecutorError::TaskFailure(unwrap_cause(err))),
                        Err(e) if e.is_panic() => {
                            let message = panic_message(e.into_panic());
                            tracing::warn!(%message, "task panicked");
                            Err(ExecutorError::TaskFailure(anyhow::anyhow!(
                                "task panicked: {}",
                                message
                            )))
                        }
                        Err(_) => Err(ExecutorError::Interrupted),
                    },
                    () = tokio::time::sleep_until(expires_at) => Err(ExecutorError::TimedOut(deadline)),
                };

                // Signal the worker on every exit path; harmless once it has finished.
                token.cancel();

                let terminal = match &result {
                    Ok(_) => TaskStatus::Completed,
                    Err(ExecutorError::TimedOut(_)) => TaskStatus::TimedOut,
                    Err(ExecutorError::Interrupted) => TaskStatus::Interrupted,
                    Err(_) => TaskStatus::Failed,
                };
                if status.finish(terminal) {
                    counters.record(terminal);
                }

                match terminal {
                    TaskStatus::TimedOut => {
                        tracing::warn!(?deadline, "task timed out; cancellation requested")
                    }
                    _ => tracing::debug!(
                        status = %terminal,
                        elapsed = ?submitted_at.elapsed(),
                        "task finished"
                    ),
                }

                result
            })
        };

        TaskHandle {
            token,
            status,
            submitted_at,
            outcome,
        }
    }
}

/// Wait for a concurrency slot, then mark the task running.
async fn admit(
    permits: Option<Arc<Semaphore>>,
    token: &CancellationToken,
    status: &StatusCell,
) -> anyhow::Result<Option<OwnedSemaphorePermit>> {
    let permit = match permits {
        Some(semaphore) => tokio::select! {
            permit = semaphore.acquire_owned() => Some(permit?),
            () = token.cancelled() => anyhow::bail!("cancelled before start"),
        },
        None => None,
    };
    status.start();
    Ok(permit)
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Handle to a submitted task.
///
/// Dropping the handle does not cancel the task; call [`cancel`](Self::cancel).
#[derive(Debug)]
pub struct TaskHandle<T> {
    token: CancellationToken,
    status: Arc<StatusCell>,
    submitted_at: Instant,
    outcome: JoinHandle<Result<T, ExecutorError>>,
}

impl<T> TaskHandle<T> {
    pub fn status(&self) -> TaskStatus {
        self.status.get()
    }

    pub fn is_complete(&self) -> bool {
        self.status().is_terminal()
    }

    /// Time since submission.
    pub fn elapsed(&self) -> Duration {
        self.submitted_at.elapsed()
    }

    /// Cancel on the caller's behalf. The task ends up `Interrupted` unless it
    /// already reached a terminal state. Returns true if it was still live.
    pub fn cancel(&self) -> bool {
        let live = !self.is_complete();
        self.token.cancel();
        live
    }

    /// Wait for the outcome. Bounded by the deadline.
    pub async fn join(self) -> Result<T, ExecutorError> {
        flatten(self.outcome.await)
    }

    /// Wait for the outcome, cancelling the task if `cancel` completes first.
    pub async fn join_with_cancel<C>(self, cancel: C) -> Result<T, ExecutorError>
    where
        C: Future<Output = ()>,
    {
        tokio::pin!(cancel);
        let mut outcome = self.outcome;

        tokio::select! {
            biased;
            joined = &mut outcome => flatten(joined),
            () = &mut cancel => {
                self.token.cancel();
                flatten(outcome.await)
            }
        }
    }
}

fn flatten<T>(
    joined: Result<Result<T, ExecutorError>, tokio::task::JoinError>,
) -> Result<T, ExecutorError> {
    match joined {
        Ok(result) => result,
        // The supervisor only stops early when the runtime is shutting down.
        Err(_) => Err(ExecutorError::Interrupted),
    }
}
