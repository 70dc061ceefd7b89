//! Scheduler-internal shared state.
//!
//! Everything mutable lives here, behind the runtime's single state mutex:
//! the region catalog, the task records forming the dependence graph, the
//! barrier states, and the per-field mutual-exclusion lock table.
//! Submission and completion are the only two events that mutate the
//! graph, and both run inside that critical section.

use crate::analysis::{FieldLockKey, LockMode};
use crate::barrier::{BarrierState, PhaseBarrier};
use crate::error::{TaskError, TaskFailure};
use crate::launch::{RegionRequirement, TaskBody};
use crate::region::Catalog;
use crate::types::{RegionId, TaskId, TaskState};
use crate::util::Arena;
use smallvec::SmallVec;
use std::collections::BTreeMap;

/// A type-erased task body stored in the runtime until admission.
pub(crate) struct StoredBody {
    body: TaskBody,
}

impl StoredBody {
    pub(crate) fn new(body: TaskBody) -> Self {
        Self { body }
    }

    /// Consumes the body and runs it to completion.
    pub(crate) fn run(self) -> Result<(), TaskFailure> {
        (self.body)()
    }
}

impl std::fmt::Debug for StoredBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredBody").finish_non_exhaustive()
    }
}

/// Scheduler record for one submitted task.
#[derive(Debug)]
pub(crate) struct TaskRecord {
    pub(crate) name: Option<String>,
    pub(crate) state: TaskState,
    pub(crate) body: Option<StoredBody>,
    /// Kept for conflict analysis against later submissions while the task
    /// is in flight.
    pub(crate) requirements: Vec<RegionRequirement>,
    /// Unresolved preconditions: program-order predecessors still in
    /// flight plus wait-barrier generations not yet triggered.
    pub(crate) blocking: usize,
    /// Tasks holding a program-order edge on this one.
    pub(crate) dependents: Vec<TaskId>,
    /// Atomic lock set, sorted ascending by key.
    pub(crate) locks: SmallVec<[(FieldLockKey, LockMode); 4]>,
    pub(crate) arrival_barriers: Vec<PhaseBarrier>,
    /// Distinct regions this task pins while in flight.
    pub(crate) pinned_regions: SmallVec<[RegionId; 2]>,
    /// Terminal outcome. Retained until runtime drop so late `wait_for`
    /// calls always observe it.
    pub(crate) result: Option<Result<(), TaskError>>,
}

/// One per-field mutual-exclusion lock.
///
/// Reader/writer semantics: atomic read-only requirements share the lock,
/// atomic writers hold it alone. The entry is removed once free.
#[derive(Debug, Default)]
pub(crate) struct FieldLock {
    writer: Option<TaskId>,
    readers: usize,
}

/// All mutable scheduler state, guarded by the runtime's state mutex.
#[derive(Debug)]
pub(crate) struct RuntimeState {
    pub(crate) catalog: Catalog,
    pub(crate) tasks: Arena<TaskRecord>,
    pub(crate) barriers: Arena<BarrierState>,
    pub(crate) locks: BTreeMap<FieldLockKey, FieldLock>,
    /// Ready tasks parked on a contended atomic lock; requeued whenever a
    /// lock is released.
    pub(crate) parked: Vec<TaskId>,
    /// Tasks not yet in a terminal state.
    pub(crate) live: usize,
    pub(crate) shutdown: bool,
}

impl RuntimeState {
    pub(crate) fn new() -> Self {
        Self {
            catalog: Catalog::new(),
            tasks: Arena::new(),
            barriers: Arena::new(),
            locks: BTreeMap::new(),
            parked: Vec::new(),
            live: 0,
            shutdown: false,
        }
    }

    /// Returns true if the whole lock set can be acquired right now.
    pub(crate) fn locks_available(&self, locks: &[(FieldLockKey, LockMode)]) -> bool {
        locks.iter().all(|&(key, mode)| {
            self.locks.get(&key).is_none_or(|lock| match mode {
                LockMode::Shared => lock.writer.is_none(),
                LockMode::Exclusive => lock.writer.is_none() && lock.readers == 0,
            })
        })
    }

    /// Acquires the whole lock set for `task`, in ascending key order.
    ///
    /// Must only be called after `locks_available` returned true within
    /// the same critical section; acquisition is all-or-nothing, never
    /// piecemeal with intervening suspension.
    pub(crate) fn acquire_locks(&mut self, task: TaskId, locks: &[(FieldLockKey, LockMode)]) {
        for &(key, mode) in locks {
            let lock = self.locks.entry(key).or_default();
            match mode {
                LockMode::Shared => {
                    debug_assert!(lock.writer.is_none());
                    lock.readers += 1;
                }
                LockMode::Exclusive => {
                    debug_assert!(lock.writer.is_none() && lock.readers == 0);
                    lock.writer = Some(task);
                }
            }
        }
    }

    /// Releases `task`'s lock set. Returns true if anything was released.
    pub(crate) fn release_locks(&mut self, task: TaskId, locks: &[(FieldLockKey, LockMode)]) -> bool {
        for &(key, mode) in locks {
            let lock = self
                .locks
                .get_mut(&key)
                .expect("released a lock that was never acquired");
            match mode {
                LockMode::Shared => {
                    debug_assert!(lock.readers > 0);
                    lock.readers -= 1;
                }
                LockMode::Exclusive => {
                    debug_assert_eq!(lock.writer, Some(task));
                    lock.writer = None;
                }
            }
            if lock.writer.is_none() && lock.readers == 0 {
                self.locks.remove(&key);
            }
        }
        !locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::ArenaIndex;

    fn task(index: u32) -> TaskId {
        TaskId::from_arena(ArenaIndex::new(index, 0))
    }

    fn key(region: u32, field: u32) -> FieldLockKey {
        (
            RegionId::from_arena(ArenaIndex::new(region, 0)),
            crate::types::FieldId(field),
        )
    }

    #[test]
    fn exclusive_lock_blocks_everyone() {
        let mut state = RuntimeState::new();
        let locks = [(key(0, 0), LockMode::Exclusive)];
        assert!(state.locks_available(&locks));
        state.acquire_locks(task(1), &locks);

        assert!(!state.locks_available(&[(key(0, 0), LockMode::Exclusive)]));
        assert!(!state.locks_available(&[(key(0, 0), LockMode::Shared)]));
        // A different field is independent.
        assert!(state.locks_available(&[(key(0, 1), LockMode::Exclusive)]));

        assert!(state.release_locks(task(1), &locks));
        assert!(state.locks_available(&locks));
        assert!(state.locks.is_empty());
    }

    #[test]
    fn shared_locks_stack() {
        let mut state = RuntimeState::new();
        let shared = [(key(0, 0), LockMode::Shared)];
        state.acquire_locks(task(1), &shared);
        state.acquire_locks(task(2), &shared);

        assert!(state.locks_available(&shared));
        assert!(!state.locks_available(&[(key(0, 0), LockMode::Exclusive)]));

        state.release_locks(task(1), &shared);
        assert!(!state.locks_available(&[(key(0, 0), LockMode::Exclusive)]));
        state.release_locks(task(2), &shared);
        assert!(state.locks_available(&[(key(0, 0), LockMode::Exclusive)]));
    }

    #[test]
    fn multi_lock_set_is_all_or_nothing() {
        let mut state = RuntimeState::new();
        state.acquire_locks(task(1), &[(key(0, 1), LockMode::Exclusive)]);

        // A set spanning a free field and a held field is unavailable as a
        // whole.
        let set = [
            (key(0, 0), LockMode::Exclusive),
            (key(0, 1), LockMode::Shared),
        ];
        assert!(!state.locks_available(&set));
    }
}
