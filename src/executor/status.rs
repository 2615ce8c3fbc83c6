// ABOUTME: Lifecycle states for a submitted task and the atomic cell holding them.
// ABOUTME: Terminal transitions use compare-exchange so exactly one terminal state wins.

use std::sync::atomic::{AtomicU8, Ordering};

/// Where a submitted task is in its lifecycle.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TaskStatus {
    /// Submitted, waiting for a worker slot.
    Pending = 0,
    /// The task body is executing.
    Running = 1,
    /// Finished with a value before the deadline.
    Completed = 2,
    /// Finished with an error (or panicked) before the deadline.
    Failed = 3,
    /// The deadline passed first. The task was asked to stop.
    TimedOut = 4,
    /// The caller cancelled the wait.
    Interrupted = 5,
}

impl TaskStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => TaskStatus::Pending,
            1 => TaskStatus::Running,
            2 => TaskStatus::Completed,
            3 => TaskStatus::Failed,
            4 => TaskStatus::TimedOut,
            5 => TaskStatus::Interrupted,
            _ => TaskStatus::Failed,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskStatus::Pending | TaskStatus::Running)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::TimedOut => write!(f, "timed out"),
            TaskStatus::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// Shared status cell for one submission.
#[derive(Debug)]
pub(crate) struct StatusCell(AtomicU8);

impl StatusCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(TaskStatus::Pending as u8))
    }

    pub(crate) fn get(&self) -> TaskStatus {
        TaskStatus::from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Pending -> Running. No-op once the task is past pending.
    pub(crate) fn start(&self) -> bool {
        self.0
            .compare_exchange(
                TaskStatus::Pending as u8,
                TaskStatus::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Move to a terminal state. Returns false if another terminal state got there first.
    pub(crate) fn finish(&self, terminal: TaskStatus) -> bool {
        debug_assert!(terminal.is_terminal());
        let mut current = self.0.load(Ordering::SeqCst);
        loop {
            if TaskStatus::from_u8(current).is_terminal() {
                return false;
            }
            match self.0.compare_exchange(
                current,
                terminal as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(TaskStatus::Pending.to_string(), "pending");
        assert_eq!(TaskStatus::Running.to_string(), "running");
        assert_eq!(TaskStatus::Completed.to_string(), "completed");
        assert_eq!(TaskStatus::Failed.to_string(), "failed");
        assert_eq!(TaskStatus::TimedOut.to_string(), "timed out");
        assert_eq!(TaskStatus::Interrupted.to_string(), "interrupted");
    }

    #[test]
    fn test_status_from_u8() {
        assert_eq!(TaskStatus::from_u8(0), TaskStatus::Pending);
        assert_eq!(TaskStatus::from_u8(4), TaskStatus::TimedOut);
        assert_eq!(TaskStatus::from_u8(5), TaskStatus::Interrupted);
        // Unknown value defaults to Failed
        assert_eq!(TaskStatus::from_u8(200), TaskStatus::Failed);
    }

    #[test]
    fn test_start_then_finish() {
        let cell = StatusCell::new();
        assert_eq!(cell.get(), TaskStatus::Pending);
        assert!(cell.start());
        assert_eq!(cell.get(), TaskStatus::Running);
        assert!(!cell.start());
        assert!(cell.finish(TaskStatus::Completed));
        assert_eq!(cell.get(), TaskStatus::Completed);
    }

    #[test]
    fn test_only_first_terminal_state_wins() {
        let cell = StatusCell::new();
        assert!(cell.finish(TaskStatus::TimedOut));
        assert!(!cell.finish(TaskStatus::Completed));
        assert!(!cell.start());
        assert_eq!(cell.get(), TaskStatus::TimedOut);
    }

    #[test]
    fn test_finish_from_pending() {
        let cell = StatusCell::new();
        assert!(cell.finish(TaskStatus::Interrupted));
        assert!(cell.get().is_terminal());
    }
}
