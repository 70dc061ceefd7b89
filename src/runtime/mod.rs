//! Scheduler, executor, and the public runtime surface.
//!
//! The [`Runtime`] is the sole arbiter of when a `Pending` task becomes
//! `Ready`. Submission and completion — the only two events that mutate the
//! dependence graph — are serialized through one state mutex, so every
//! admission decision is atomic with respect to concurrent submissions and
//! completions. Once `Running`, a task is never preempted: it runs to
//! completion or failure on its worker.

mod placement;
mod queue;
mod state;
mod worker;

pub use placement::{Placement, RoundRobin};

use crate::analysis::analyze;
use crate::barrier::{BarrierState, PhaseBarrier};
use crate::error::{Resource, RuntimeError, TaskError, TaskFailure};
use crate::launch::{TaskHandle, TaskLauncher};
use crate::region::{FieldSpace, IndexSpace, LogicalRegion};
use crate::types::{BarrierId, FieldId, RegionId, TaskId, TaskState};
use parking_lot::{Condvar, Mutex};
use queue::ReadyQueue;
use smallvec::SmallVec;
use state::{RuntimeState, StoredBody, TaskRecord};
use std::sync::Arc;
use std::thread::JoinHandle;

pub(crate) struct Inner {
    pub(crate) state: Mutex<RuntimeState>,
    /// Wakes workers: new ready task, or shutdown with quiescence reached.
    pub(crate) worker_cv: Condvar,
    /// Wakes `wait_for` callers and the drop path: a task reached a
    /// terminal state.
    pub(crate) client_cv: Condvar,
    pub(crate) queues: Vec<ReadyQueue>,
    pub(crate) placement: Mutex<Box<dyn Placement>>,
}

impl Inner {
    /// Pops a ready task: own queue first, then steal from siblings.
    pub(crate) fn pop_task(&self, index: usize) -> Option<TaskId> {
        if let Some(task) = self.queues[index].pop() {
            return Some(task);
        }
        let count = self.queues.len();
        for offset in 1..count {
            if let Some(task) = self.queues[(index + offset) % count].pop() {
                return Some(task);
            }
        }
        None
    }

    /// Marks a task ready and hands it to the placement policy.
    pub(crate) fn schedule_ready(&self, state: &mut RuntimeState, task: TaskId) {
        if let Some(record) = state.tasks.get_mut(task.arena_index()) {
            record.state = TaskState::Ready;
        }
        let worker = self.placement.lock().select_worker(task, self.queues.len());
        self.queues[worker].push(task);
        tracing::trace!(task = %task, worker, "task ready");
        self.worker_cv.notify_all();
    }

    /// Resolves one precondition (predecessor completion or barrier
    /// trigger) of a pending task.
    pub(crate) fn resolve_one(&self, state: &mut RuntimeState, task: TaskId) {
        let Some(record) = state.tasks.get_mut(task.arena_index()) else {
            return;
        };
        if record.state != TaskState::Pending {
            return;
        }
        debug_assert!(record.blocking > 0, "resolved a precondition twice");
        record.blocking -= 1;
        if record.blocking == 0 {
            self.schedule_ready(state, task);
        }
    }

    /// Attempts to move a ready task to `Running`.
    ///
    /// Acquires the task's whole atomic lock set all-or-nothing inside the
    /// caller's critical section; on contention the task parks until a
    /// lock releases.
    pub(crate) fn try_start(
        &self,
        state: &mut RuntimeState,
        task: TaskId,
    ) -> Option<StoredBody> {
        let record = state.tasks.get(task.arena_index())?;
        if record.state != TaskState::Ready {
            return None;
        }
        let locks = record.locks.clone();
        if !state.locks_available(&locks) {
            tracing::trace!(task = %task, "task parked on contended atomic locks");
            state.parked.push(task);
            return None;
        }
        state.acquire_locks(task, &locks);
        let record = state
            .tasks
            .get_mut(task.arena_index())
            .expect("record checked above");
        record.state = TaskState::Running;
        tracing::trace!(task = %task, "task running");
        Some(record.body.take().expect("task admitted twice"))
    }

    /// Records a task's terminal state and propagates the consequences:
    /// lock release, dependent resolution or abort, barrier arrivals,
    /// region unpinning.
    pub(crate) fn complete_task(
        &self,
        state: &mut RuntimeState,
        task: TaskId,
        result: Result<(), TaskFailure>,
    ) {
        let failed = result.is_err();
        let (locks, dependents, arrivals, pinned) = {
            let record = state
                .tasks
                .get_mut(task.arena_index())
                .expect("completed unknown task");
            debug_assert_eq!(record.state, TaskState::Running);
            record.state = TaskState::Complete;
            record.result = Some(result.map_err(TaskError::Execution));
            (
                std::mem::take(&mut record.locks),
                std::mem::take(&mut record.dependents),
                std::mem::take(&mut record.arrival_barriers),
                std::mem::take(&mut record.pinned_regions),
            )
        };

        if state.release_locks(task, &locks) && !state.parked.is_empty() {
            for parked in std::mem::take(&mut state.parked) {
                self.schedule_ready(state, parked);
            }
        }

        if failed {
            tracing::debug!(task = %task, "task failed");
            self.abort_dependents(state, &dependents);
        } else {
            tracing::debug!(task = %task, "task complete");
            for dependent in dependents {
                self.resolve_one(state, dependent);
            }
        }

        self.commit_arrivals(state, &arrivals);
        for region in pinned {
            state.catalog.unpin_region(region);
        }
        state.live -= 1;
        self.client_cv.notify_all();
        if state.shutdown && state.live == 0 {
            self.worker_cv.notify_all();
        }
    }

    /// Aborts every transitive program-order dependent of a failed task.
    ///
    /// Dependents of an unfinished task can only be `Pending`, so no
    /// running work is ever torn down here.
    fn abort_dependents(&self, state: &mut RuntimeState, dependents: &[TaskId]) {
        let mut stack: Vec<TaskId> = dependents.to_vec();
        while let Some(task) = stack.pop() {
            let Some(record) = state.tasks.get_mut(task.arena_index()) else {
                continue;
            };
            if record.state.is_terminal() {
                continue;
            }
            debug_assert_eq!(record.state, TaskState::Pending);
            record.state = TaskState::Aborted;
            record.result = Some(Err(TaskError::Aborted));
            record.body = None;
            let next = std::mem::take(&mut record.dependents);
            let arrivals = std::mem::take(&mut record.arrival_barriers);
            let pinned = std::mem::take(&mut record.pinned_regions);
            tracing::debug!(task = %task, "task aborted: predecessor failed");
            stack.extend(next);
            // An aborted task still arrives on its declared barriers.
            self.commit_arrivals(state, &arrivals);
            for region in pinned {
                state.catalog.unpin_region(region);
            }
            state.live -= 1;
        }
        self.client_cv.notify_all();
    }

    /// Commits declared arrivals and releases any waiters of generations
    /// that trigger.
    fn commit_arrivals(&self, state: &mut RuntimeState, barriers: &[PhaseBarrier]) {
        for barrier in barriers {
            let released = state
                .barriers
                .get_mut(barrier.id().arena_index())
                .and_then(|record| record.commit(barrier.generation()));
            if let Some(waiters) = released {
                tracing::trace!(barrier = %barrier, "barrier generation triggered");
                for task in waiters {
                    self.resolve_one(state, task);
                }
            }
        }
    }
}

/// Configures and builds a [`Runtime`].
pub struct RuntimeBuilder {
    workers: usize,
    placement: Box<dyn Placement>,
}

impl RuntimeBuilder {
    /// Creates a builder with defaults: one worker per available core and
    /// round-robin placement.
    #[must_use]
    pub fn new() -> Self {
        Self {
            workers: std::thread::available_parallelism().map_or(4, std::num::NonZeroUsize::get),
            placement: Box::new(RoundRobin::new()),
        }
    }

    /// Sets the worker thread count. Must be at least 1.
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        assert!(workers > 0, "a runtime needs at least one worker");
        self.workers = workers;
        self
    }

    /// Injects a placement policy.
    #[must_use]
    pub fn placement(mut self, placement: impl Placement + 'static) -> Self {
        self.placement = Box::new(placement);
        self
    }

    /// Builds the runtime and starts its workers.
    #[must_use]
    pub fn build(self) -> Runtime {
        let inner = Arc::new(Inner {
            state: Mutex::new(RuntimeState::new()),
            worker_cv: Condvar::new(),
            client_cv: Condvar::new(),
            queues: (0..self.workers).map(|_| ReadyQueue::new()).collect(),
            placement: Mutex::new(self.placement),
        });
        let workers = (0..self.workers)
            .map(|index| {
                let inner = Arc::clone(&inner);
                std::thread::Builder::new()
                    .name(format!("regent-worker-{index}"))
                    .spawn(move || worker::run(&inner, index))
                    .expect("failed to spawn worker thread")
            })
            .collect();
        Runtime { inner, workers }
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuntimeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeBuilder")
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}

/// The task-parallel runtime: region catalog, dependence analyzer,
/// phase barriers, and scheduler in one handle.
///
/// Dropping the runtime waits for every submitted task to reach a terminal
/// state, then joins the workers.
pub struct Runtime {
    inner: Arc<Inner>,
    workers: Vec<JoinHandle<()>>,
}

impl Runtime {
    /// Creates a runtime with default configuration.
    #[must_use]
    pub fn new() -> Self {
        RuntimeBuilder::new().build()
    }

    /// Returns a configuration builder.
    #[must_use]
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    // ── Region catalog ──────────────────────────────────────────────

    /// Creates an index space with the given number of points.
    pub fn create_index_space(&self, extent: u64) -> IndexSpace {
        self.inner.state.lock().catalog.create_index_space(extent)
    }

    /// Destroys an index space with no live regions over it.
    pub fn destroy_index_space(&self, space: IndexSpace) -> Result<(), RuntimeError> {
        self.inner.state.lock().catalog.destroy_index_space(space)
    }

    /// Creates an empty field space.
    pub fn create_field_space(&self) -> FieldSpace {
        self.inner.state.lock().catalog.create_field_space()
    }

    /// Allocates a field of `size_bytes` on a field space not yet consumed
    /// by a region.
    pub fn allocate_field(
        &self,
        space: FieldSpace,
        size_bytes: usize,
    ) -> Result<FieldId, RuntimeError> {
        self.inner
            .state
            .lock()
            .catalog
            .allocate_field(space, size_bytes)
    }

    /// Destroys a field space with no live regions over it.
    pub fn destroy_field_space(&self, space: FieldSpace) -> Result<(), RuntimeError> {
        self.inner.state.lock().catalog.destroy_field_space(space)
    }

    /// Creates a logical region over an index space and a field space.
    pub fn create_region(
        &self,
        index_space: IndexSpace,
        field_space: FieldSpace,
    ) -> Result<LogicalRegion, RuntimeError> {
        self.inner
            .state
            .lock()
            .catalog
            .create_region(index_space, field_space)
    }

    /// Destroys a region no in-flight task references.
    ///
    /// On failure the region is left fully intact.
    pub fn destroy_region(&self, region: LogicalRegion) -> Result<(), RuntimeError> {
        self.inner.state.lock().catalog.destroy_region(region)
    }

    // ── Phase barriers ──────────────────────────────────────────────

    /// Creates a phase barrier with the given participant count, at
    /// generation 0 with zero arrivals.
    pub fn create_phase_barrier(&self, participants: usize) -> PhaseBarrier {
        let mut state = self.inner.state.lock();
        let id = BarrierId::from_arena(state.barriers.insert(BarrierState::new(participants)));
        PhaseBarrier { id, generation: 0 }
    }

    /// Arrives once on the handle's captured generation.
    pub fn arrive(&self, barrier: PhaseBarrier) -> Result<(), RuntimeError> {
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        let waiters = {
            let Some(record) = state.barriers.get_mut(barrier.id().arena_index()) else {
                return Err(RuntimeError::StaleReference(Resource::Barrier(barrier.id())));
            };
            if !record.reserve(barrier.generation()) {
                return Err(RuntimeError::BarrierOveruse {
                    barrier: barrier.id(),
                    generation: barrier.generation(),
                    participants: record.participants(),
                });
            }
            record.commit(barrier.generation())
        };
        if let Some(waiters) = waiters {
            tracing::trace!(barrier = %barrier, "barrier generation triggered");
            for task in waiters {
                self.inner.resolve_one(state, task);
            }
        }
        Ok(())
    }

    /// Destroys a barrier with no registered waiters or outstanding
    /// arrivals on any generation.
    pub fn destroy_phase_barrier(&self, barrier: PhaseBarrier) -> Result<(), RuntimeError> {
        let mut state = self.inner.state.lock();
        let Some(record) = state.barriers.get(barrier.id().arena_index()) else {
            return Err(RuntimeError::StaleReference(Resource::Barrier(barrier.id())));
        };
        if record.in_use() {
            return Err(RuntimeError::UseAfterFree(Resource::Barrier(barrier.id())));
        }
        state.barriers.remove(barrier.id().arena_index());
        Ok(())
    }

    // ── Task submission ─────────────────────────────────────────────

    /// Submits a task launch.
    ///
    /// Returns without blocking on execution. Structural validation and
    /// dependence analysis happen here, inside the scheduler's critical
    /// section; any structural error is reported synchronously and the
    /// launch never enters the dependence graph.
    pub fn submit(&self, launcher: TaskLauncher) -> Result<TaskHandle, RuntimeError> {
        let TaskLauncher {
            name,
            body,
            requirements,
            wait_barriers,
            arrival_barriers,
        } = launcher;

        let mut guard = self.inner.state.lock();
        let state = &mut *guard;

        for requirement in &requirements {
            if requirement.fields.is_empty() {
                return Err(RuntimeError::InvalidRequirement("empty field set"));
            }
            if requirement.parent.id() != requirement.region.id() {
                return Err(RuntimeError::InvalidRequirement(
                    "parent must equal the region in a flat region tree",
                ));
            }
            if !state.catalog.region_live(requirement.region.id()) {
                return Err(RuntimeError::StaleReference(Resource::Region(
                    requirement.region.id(),
                )));
            }
            for &field in &requirement.fields {
                if !state.catalog.region_has_field(requirement.region.id(), field) {
                    return Err(RuntimeError::InvalidRequirement(
                        "field not allocated in the region's field space",
                    ));
                }
            }
        }

        for barrier in &wait_barriers {
            if state.barriers.get(barrier.id().arena_index()).is_none() {
                return Err(RuntimeError::StaleReference(Resource::Barrier(barrier.id())));
            }
        }

        // Reserve declared arrivals all-or-nothing, so over-arrival
        // surfaces here rather than when the task finishes.
        for (index, barrier) in arrival_barriers.iter().enumerate() {
            let reserved = state
                .barriers
                .get_mut(barrier.id().arena_index())
                .map(|record| (record.reserve(barrier.generation()), record.participants()));
            let error = match reserved {
                Some((true, _)) => continue,
                Some((false, participants)) => RuntimeError::BarrierOveruse {
                    barrier: barrier.id(),
                    generation: barrier.generation(),
                    participants,
                },
                None => RuntimeError::StaleReference(Resource::Barrier(barrier.id())),
            };
            for rolled_back in &arrival_barriers[..index] {
                if let Some(record) = state.barriers.get_mut(rolled_back.id().arena_index()) {
                    record.unreserve(rolled_back.generation());
                }
            }
            return Err(error);
        }

        let analysis = analyze(
            &requirements,
            state
                .tasks
                .iter()
                .filter(|(_, record)| !record.state.is_terminal())
                .map(|(index, record)| (TaskId::from_arena(index), record.requirements.as_slice())),
        );

        let pending_waits: Vec<PhaseBarrier> = wait_barriers
            .iter()
            .copied()
            .filter(|barrier| {
                !state
                    .barriers
                    .get(barrier.id().arena_index())
                    .expect("wait barrier validated above")
                    .is_triggered(barrier.generation())
            })
            .collect();

        let mut pinned: SmallVec<[RegionId; 2]> = requirements
            .iter()
            .map(|requirement| requirement.region.id())
            .collect();
        pinned.sort_unstable();
        pinned.dedup();

        let blocking = analysis.predecessors.len() + pending_waits.len();
        let id = TaskId::from_arena(state.tasks.insert(TaskRecord {
            name,
            state: TaskState::Pending,
            body: Some(StoredBody::new(body)),
            requirements,
            blocking,
            dependents: Vec::new(),
            locks: analysis.atomic_locks,
            arrival_barriers,
            pinned_regions: pinned.clone(),
            result: None,
        }));

        for &predecessor in &analysis.predecessors {
            state
                .tasks
                .get_mut(predecessor.arena_index())
                .expect("predecessor vanished inside the critical section")
                .dependents
                .push(id);
        }
        for barrier in &pending_waits {
            state
                .barriers
                .get_mut(barrier.id().arena_index())
                .expect("wait barrier validated above")
                .register_waiter(barrier.generation(), id);
        }
        for &region in &pinned {
            state.catalog.pin_region(region);
        }
        state.live += 1;

        tracing::debug!(
            task = %id,
            predecessors = analysis.predecessors.len(),
            waits = pending_waits.len(),
            "task submitted"
        );

        if blocking == 0 {
            self.inner.schedule_ready(state, id);
        }
        Ok(TaskHandle { id })
    }

    /// Blocks the caller until the task reaches `Complete` or `Aborted`.
    pub fn wait_for(&self, handle: TaskHandle) -> Result<(), TaskError> {
        let mut state = self.inner.state.lock();
        loop {
            let record = state
                .tasks
                .get(handle.id.arena_index())
                .expect("unknown task handle");
            if let Some(result) = &record.result {
                return result.clone();
            }
            self.inner.client_cv.wait(&mut state);
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("workers", &self.workers.len())
            .finish_non_exhaustive()
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        {
            let mut state = self.inner.state.lock();
            state.shutdown = true;
            while state.live > 0 {
                self.inner.client_cv.wait(&mut state);
            }
            self.inner.worker_cv.notify_all();
        }
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}
