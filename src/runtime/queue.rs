//! Per-worker ready queues.
//!
//! A thread-safe unbounded queue of tasks admitted to `Ready`. Each worker
//! owns one queue; idle workers steal from their siblings.

use crate::types::TaskId;
use crossbeam_queue::SegQueue;

/// A ready-task queue.
#[derive(Debug, Default)]
pub(crate) struct ReadyQueue {
    inner: SegQueue<TaskId>,
}

impl ReadyQueue {
    /// Creates a new empty queue.
    pub(crate) fn new() -> Self {
        Self {
            inner: SegQueue::new(),
        }
    }

    /// Pushes a ready task.
    pub(crate) fn push(&self, task: TaskId) {
        self.inner.push(task);
    }

    /// Pops a ready task.
    pub(crate) fn pop(&self) -> Option<TaskId> {
        self.inner.pop()
    }

    /// Returns the number of queued tasks.
    #[allow(dead_code)]
    pub(crate) fn len(&self) -> usize {
        self.inner.len()
    }
}
