//! Generation-counted phase barriers.
//!
//! A phase barrier is a reusable rendezvous for a fixed number of
//! participants per generation. Tasks capture a *specific generation* at
//! launch time; [`PhaseBarrier::advance`] produces a handle for the next
//! generation without touching the current one. Decoupling the captured
//! handle from the barrier's live generation is what lets a
//! producer/consumer pair alternate roles across iterations (the odd/even
//! discipline) under `Simultaneous` coherence, where the barriers are the
//! only ordering.

use crate::types::{BarrierId, TaskId};
use core::fmt;
use std::collections::BTreeMap;

/// Handle to a phase barrier at a captured generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhaseBarrier {
    pub(crate) id: BarrierId,
    pub(crate) generation: u64,
}

impl PhaseBarrier {
    /// Returns the barrier identifier.
    #[must_use]
    pub fn id(&self) -> BarrierId {
        self.id
    }

    /// Returns the captured generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns a handle bound to the next generation.
    ///
    /// Pure on the handle: outstanding waiters and arrivals on the current
    /// generation are unaffected.
    #[must_use]
    pub fn advance(self) -> Self {
        Self {
            id: self.id,
            generation: self.generation + 1,
        }
    }
}

impl fmt::Display for PhaseBarrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.generation)
    }
}

/// Per-generation bookkeeping.
#[derive(Debug, Default)]
struct GenerationState {
    /// Arrivals promised: declared launch arrivals plus manual arrivals.
    /// Checked against the participant count for overuse at reservation
    /// time, so over-arrival surfaces synchronously.
    reserved: usize,
    /// Arrivals performed. The generation triggers when this reaches the
    /// participant count.
    committed: usize,
    triggered: bool,
    /// Tasks whose readiness is suspended on this generation.
    waiters: Vec<TaskId>,
}

/// Scheduler-side state of one barrier.
#[derive(Debug)]
pub(crate) struct BarrierState {
    participants: usize,
    generations: BTreeMap<u64, GenerationState>,
}

impl BarrierState {
    pub(crate) fn new(participants: usize) -> Self {
        assert!(participants > 0, "a phase barrier needs at least one participant");
        Self {
            participants,
            generations: BTreeMap::new(),
        }
    }

    pub(crate) fn participants(&self) -> usize {
        self.participants
    }

    pub(crate) fn is_triggered(&self, generation: u64) -> bool {
        self.generations
            .get(&generation)
            .is_some_and(|state| state.triggered)
    }

    /// Reserves one arrival on `generation`. Returns false when the
    /// generation already has a full complement of arrivals.
    #[must_use]
    pub(crate) fn reserve(&mut self, generation: u64) -> bool {
        let state = self.generations.entry(generation).or_default();
        if state.reserved >= self.participants {
            return false;
        }
        state.reserved += 1;
        true
    }

    /// Releases an unused reservation (submission rolled back).
    pub(crate) fn unreserve(&mut self, generation: u64) {
        if let Some(state) = self.generations.get_mut(&generation) {
            debug_assert!(state.reserved > state.committed);
            state.reserved -= 1;
        }
    }

    /// Registers a task whose readiness waits on `generation`.
    pub(crate) fn register_waiter(&mut self, generation: u64, task: TaskId) {
        let state = self.generations.entry(generation).or_default();
        debug_assert!(!state.triggered);
        state.waiters.push(task);
    }

    /// Commits one reserved arrival on `generation`.
    ///
    /// Returns the tasks released if this arrival triggered the
    /// generation. A generation triggers exactly once and never regresses.
    pub(crate) fn commit(&mut self, generation: u64) -> Option<Vec<TaskId>> {
        let state = self
            .generations
            .get_mut(&generation)
            .expect("arrival committed without a reservation");
        debug_assert!(state.committed < state.reserved);
        state.committed += 1;
        if state.committed == self.participants && !state.triggered {
            state.triggered = true;
            return Some(std::mem::take(&mut state.waiters));
        }
        None
    }

    /// Returns true if any generation still has registered waiters or
    /// outstanding reservations. Such a barrier cannot be destroyed.
    pub(crate) fn in_use(&self) -> bool {
        self.generations.values().any(|state| {
            (!state.triggered && !state.waiters.is_empty()) || state.reserved > state.committed
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::ArenaIndex;

    fn task(index: u32) -> TaskId {
        TaskId::from_arena(ArenaIndex::new(index, 0))
    }

    #[test]
    fn triggers_exactly_at_participant_count() {
        let mut barrier = BarrierState::new(3);
        barrier.register_waiter(0, task(9));
        for _ in 0..3 {
            assert!(barrier.reserve(0));
        }
        assert_eq!(barrier.commit(0), None);
        assert_eq!(barrier.commit(0), None);
        assert!(!barrier.is_triggered(0));
        assert_eq!(barrier.commit(0), Some(vec![task(9)]));
        assert!(barrier.is_triggered(0));
    }

    #[test]
    fn over_reservation_is_rejected() {
        let mut barrier = BarrierState::new(1);
        assert!(barrier.reserve(0));
        assert!(!barrier.reserve(0));
        // The next generation is independent.
        assert!(barrier.reserve(1));
    }

    #[test]
    fn generations_are_independent() {
        let mut barrier = BarrierState::new(1);
        barrier.register_waiter(1, task(4));
        assert!(barrier.reserve(0));
        assert_eq!(barrier.commit(0), Some(vec![]));
        assert!(barrier.is_triggered(0));
        assert!(!barrier.is_triggered(1));

        assert!(barrier.reserve(1));
        assert_eq!(barrier.commit(1), Some(vec![task(4)]));
        assert!(barrier.is_triggered(1));
    }

    #[test]
    fn unreserve_rolls_back() {
        let mut barrier = BarrierState::new(1);
        assert!(barrier.reserve(0));
        assert!(barrier.in_use());
        barrier.unreserve(0);
        assert!(!barrier.in_use());
        assert!(barrier.reserve(0));
    }

    #[test]
    fn advance_is_pure_on_the_handle() {
        let handle = PhaseBarrier {
            id: BarrierId::from_arena(ArenaIndex::new(0, 0)),
            generation: 3,
        };
        let next = handle.advance();
        assert_eq!(handle.generation(), 3);
        assert_eq!(next.generation(), 4);
        assert_eq!(handle.id(), next.id());
    }
}
