//! Regent: region-based dependence analysis and coherence enforcement for
//! task-parallel execution.
//!
//! # Overview
//!
//! Regent accepts independently launched units of work ("tasks"), each
//! declaring which logical regions and fields it will read or write and
//! under which coherence contract, and computes at launch time the minimal
//! correct ordering between tasks so that results match sequential program
//! order unless the caller explicitly relaxes that guarantee.
//!
//! # Core Guarantees
//!
//! - **Program order under `Exclusive`**: conflicting tasks run strictly
//!   after their predecessors complete
//! - **Mutual exclusion under `Atomic`**: conflicting tasks never overlap,
//!   but may be reordered for concurrency
//! - **No implicit ordering under `Simultaneous`**: phase barriers are the
//!   only handshake, by design
//! - **No silent conflicts**: an undetected conflict is a correctness bug,
//!   not a recoverable condition
//! - **No orphan outcomes**: every submitted task reaches `Complete` or
//!   `Aborted`, observable through [`Runtime::wait_for`]
//!
//! # Module Structure
//!
//! - [`types`]: Core identifier types and the task state machine
//! - [`region`]: Logical region catalog (index spaces, field spaces, regions)
//! - [`launch`]: Region requirements and task launch descriptors
//! - [`barrier`]: Generation-counted phase barriers
//! - [`analysis`]: The coherence conflict predicate and launch analysis
//! - [`runtime`]: Scheduler, executor, and the public runtime surface
//! - [`error`](mod@error): Error types
//! - [`util`]: Internal utilities (generation-counted arena)

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]

pub mod analysis;
pub mod barrier;
pub mod error;
pub mod launch;
pub mod region;
pub mod runtime;
pub mod types;
pub mod util;

pub use barrier::PhaseBarrier;
pub use error::{Resource, RuntimeError, TaskError, TaskFailure};
pub use launch::{Coherence, Privilege, RegionRequirement, TaskHandle, TaskLauncher};
pub use region::{FieldSpace, IndexSpace, LogicalRegion};
pub use runtime::{Placement, RoundRobin, Runtime, RuntimeBuilder};
pub use types::{BarrierId, FieldId, FieldSpaceId, IndexSpaceId, RegionId, TaskId, TaskState};
