//! Task launch descriptors.
//!
//! A [`TaskLauncher`] carries a body closure, the [`RegionRequirement`]s
//! describing the task's intended accesses, and the phase barriers the task
//! waits on before starting or arrives on after finishing. A launcher is
//! consumed by [`Runtime::submit`](crate::Runtime::submit); requirements
//! are immutable once the launch is issued.

use crate::barrier::PhaseBarrier;
use crate::error::TaskFailure;
use crate::region::LogicalRegion;
use crate::types::{FieldId, TaskId};
use smallvec::SmallVec;

/// Read/write intent declared for a region requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Privilege {
    /// Read existing contents; never write.
    ReadOnly,
    /// Read and write existing contents.
    ReadWrite,
    /// Write without reading; prior contents may be discarded.
    WriteDiscard,
}

impl Privilege {
    /// Returns true if this privilege may mutate the data.
    #[must_use]
    pub const fn is_write(self) -> bool {
        matches!(self, Self::ReadWrite | Self::WriteDiscard)
    }
}

/// Contract governing how a task's access may interleave with others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Coherence {
    /// Strict program-order serialization against conflicting accesses.
    Exclusive,
    /// Mutual exclusion against conflicting accesses, in any order.
    Atomic,
    /// No automatic ordering at all; the caller's barriers are the only
    /// handshake.
    Simultaneous,
}

/// One task's declared relationship to a region and a subset of its fields.
#[derive(Debug, Clone)]
pub struct RegionRequirement {
    /// The region being requested.
    pub region: LogicalRegion,
    /// The requested fields. Must be non-empty at submission.
    pub fields: SmallVec<[FieldId; 4]>,
    /// Read/write intent.
    pub privilege: Privilege,
    /// Interleaving contract.
    pub coherence: Coherence,
    /// Parent region for privilege checking. The region tree is flat in
    /// this core, so this must equal `region`.
    pub parent: LogicalRegion,
}

impl RegionRequirement {
    /// Creates a requirement with an empty field set.
    #[must_use]
    pub fn new(
        region: LogicalRegion,
        privilege: Privilege,
        coherence: Coherence,
        parent: LogicalRegion,
    ) -> Self {
        Self {
            region,
            fields: SmallVec::new(),
            privilege,
            coherence,
            parent,
        }
    }

    /// Adds a field to the requirement.
    pub fn add_field(&mut self, field: FieldId) -> &mut Self {
        self.fields.push(field);
        self
    }
}

/// The body of a task: run once, report success or failure.
pub type TaskBody = Box<dyn FnOnce() -> Result<(), TaskFailure> + Send + 'static>;

/// A unit of work to submit to the runtime.
pub struct TaskLauncher {
    pub(crate) name: Option<String>,
    pub(crate) body: TaskBody,
    pub(crate) requirements: Vec<RegionRequirement>,
    pub(crate) wait_barriers: Vec<PhaseBarrier>,
    pub(crate) arrival_barriers: Vec<PhaseBarrier>,
}

impl TaskLauncher {
    /// Creates a launcher around a task body.
    pub fn new<F>(body: F) -> Self
    where
        F: FnOnce() -> Result<(), TaskFailure> + Send + 'static,
    {
        Self {
            name: None,
            body: Box::new(body),
            requirements: Vec::new(),
            wait_barriers: Vec::new(),
            arrival_barriers: Vec::new(),
        }
    }

    /// Attaches a debug name, used in log events.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Declares a region requirement.
    pub fn add_region_requirement(&mut self, requirement: RegionRequirement) -> &mut Self {
        self.requirements.push(requirement);
        self
    }

    /// Declares a barrier generation the task waits on before starting.
    ///
    /// The handle's generation is captured now, at launch-construction
    /// time, not whatever generation is current when the task runs.
    pub fn add_wait_barrier(&mut self, barrier: PhaseBarrier) -> &mut Self {
        self.wait_barriers.push(barrier);
        self
    }

    /// Declares a barrier generation the task arrives on after finishing.
    pub fn add_arrival_barrier(&mut self, barrier: PhaseBarrier) -> &mut Self {
        self.arrival_barriers.push(barrier);
        self
    }
}

impl std::fmt::Debug for TaskLauncher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskLauncher")
            .field("name", &self.name)
            .field("requirements", &self.requirements)
            .field("wait_barriers", &self.wait_barriers)
            .field("arrival_barriers", &self.arrival_barriers)
            .finish_non_exhaustive()
    }
}

/// Handle to a submitted task, used with
/// [`Runtime::wait_for`](crate::Runtime::wait_for).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle {
    pub(crate) id: TaskId,
}

impl TaskHandle {
    /// Returns the task identifier.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.id
    }
}
