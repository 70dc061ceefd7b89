//! Worker placement policy.
//!
//! Placement is a strategy object injected into the scheduler, so the
//! choice of "next worker for a ready task" is swappable without touching
//! dependence logic. The policy is advisory: idle workers still steal from
//! their siblings, so a bad policy costs locality, never progress.

use crate::types::TaskId;

/// Picks the worker queue for each newly ready task.
pub trait Placement: Send {
    /// Returns the target worker index, in `0..workers`.
    fn select_worker(&mut self, task: TaskId, workers: usize) -> usize;
}

/// Default placement: cycle through the workers.
#[derive(Debug, Default)]
pub struct RoundRobin {
    next: usize,
}

impl RoundRobin {
    /// Creates a round-robin policy starting at worker 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Placement for RoundRobin {
    fn select_worker(&mut self, _task: TaskId, workers: usize) -> usize {
        let worker = self.next % workers;
        self.next = self.next.wrapping_add(1);
        worker
    }
}
