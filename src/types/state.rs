//! The task state machine.

use core::fmt;

/// Lifecycle state of a submitted task.
///
/// Tasks move `Pending → Ready → Running → Complete`. A task whose
/// program-order predecessor failed is moved to `Aborted` instead of being
/// run against a missing write; `Complete` and `Aborted` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Submitted; dependence preconditions or wait barriers unresolved.
    Pending,
    /// All preconditions satisfied; queued for a worker.
    Ready,
    /// Executing on a worker. Never preempted by the runtime.
    Running,
    /// Finished executing (successfully or with a body failure).
    Complete,
    /// Skipped because a required predecessor failed.
    Aborted,
}

impl TaskState {
    /// Returns true for `Complete` and `Aborted`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Aborted)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Ready => write!(f, "ready"),
            Self::Running => write!(f, "running"),
            Self::Complete => write!(f, "complete"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(TaskState::Complete.is_terminal());
        assert!(TaskState::Aborted.is_terminal());
        assert!(!TaskState::Pending.is_terminal());
        assert!(!TaskState::Ready.is_terminal());
        assert!(!TaskState::Running.is_terminal());
    }
}
