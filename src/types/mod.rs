//! Core types for the regent runtime.
//!
//! - [`id`]: Identifier types (`RegionId`, `TaskId`, `BarrierId`, ...)
//! - [`state`]: The task state machine

pub mod id;
pub mod state;

pub use id::{BarrierId, FieldId, FieldSpaceId, IndexSpaceId, RegionId, TaskId};
pub use state::TaskState;
