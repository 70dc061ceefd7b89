//! Error types.
//!
//! Structural errors ([`RuntimeError`]) are raised synchronously at the
//! call that caused them and never enter the dependence graph. Execution
//! errors ([`TaskError`]) are reported only through
//! [`Runtime::wait_for`](crate::Runtime::wait_for); they never propagate
//! across concurrently running unrelated tasks.

use crate::types::{BarrierId, FieldSpaceId, IndexSpaceId, RegionId};
use core::fmt;
use thiserror::Error;

/// A runtime resource named in an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// A logical region.
    Region(RegionId),
    /// An index space.
    IndexSpace(IndexSpaceId),
    /// A field space.
    FieldSpace(FieldSpaceId),
    /// A phase barrier.
    Barrier(BarrierId),
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Region(id) => write!(f, "region {id}"),
            Self::IndexSpace(id) => write!(f, "index space {id}"),
            Self::FieldSpace(id) => write!(f, "field space {id}"),
            Self::Barrier(id) => write!(f, "barrier {id}"),
        }
    }
}

/// Structural errors raised synchronously by catalog, barrier, and
/// submission calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// Field allocation on a field space already consumed by a region.
    #[error("field space {0} was already consumed by a region; late field allocation is unsupported")]
    Allocation(FieldSpaceId),

    /// Destruction of a resource that is still referenced.
    #[error("{0} is still referenced and cannot be destroyed")]
    UseAfterFree(Resource),

    /// A reference to a destroyed or unknown resource.
    #[error("{0} was destroyed or never existed")]
    StaleReference(Resource),

    /// A malformed region requirement.
    #[error("invalid region requirement: {0}")]
    InvalidRequirement(&'static str),

    /// More arrivals than participants on one barrier generation.
    #[error("barrier {barrier} generation {generation} already has {participants} arrivals")]
    BarrierOveruse {
        /// The overused barrier.
        barrier: BarrierId,
        /// The generation that was already fully arrived.
        generation: u64,
        /// The barrier's participant count.
        participants: usize,
    },
}

/// The payload of a failed task body.
///
/// Carries the message of the body's returned error, or the downcast
/// payload of a panic caught inside the body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TaskFailure {
    message: String,
}

impl TaskFailure {
    /// Creates a failure from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for TaskFailure {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for TaskFailure {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Terminal failure of a task, reported through `wait_for`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// The task body returned an error or panicked.
    #[error("task body failed: {0}")]
    Execution(TaskFailure),

    /// A program-order predecessor failed, so this task was never run.
    #[error("task aborted: a required predecessor failed")]
    Aborted,
}
